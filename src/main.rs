mod builtins;
mod env;
mod error;
mod eval;
mod parser;
mod reader;
mod value;

use std::env as std_env;
use std::process::ExitCode;
use std::rc::Rc;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use builtins::populate_globals;
use env::Environment;
use eval::eval;
use parser::parse;
use reader::read_root;
use value::Value;

const BANNER: &str = "Lispy Version 0.1.0\nPress Ctrl+C, Ctrl+D, 'exit', or ':q' to Exit\n";

fn main() -> ExitCode {
    let args: Vec<String> = std_env::args().skip(1).collect();
    let root = Environment::new_root();
    populate_globals(&root);

    if args.is_empty() {
        run_repl(&root);
        ExitCode::SUCCESS
    } else {
        run_files(&root, &args)
    }
}

fn run_files(root: &Rc<std::cell::RefCell<Environment>>, paths: &[String]) -> ExitCode {
    for path in paths {
        let result = builtins_load(root, path);
        if root.borrow().exit_requested() {
            return ExitCode::SUCCESS;
        }
        if let Value::Error(msg) = &result {
            eprintln!("{}", Value::Error(msg.clone()));
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

/// Thin wrapper so the CLI's file-argument handling shares the exact
/// behavior of the `load` built-in (§6: "each is treated as a source
/// filename passed to the `load` built-in").
fn builtins_load(root: &Rc<std::cell::RefCell<Environment>>, path: &str) -> Value {
    let call = Value::SExpr(vec![Value::Symbol("load".to_string()), Value::Str(path.to_string())]);
    eval(root, call)
}

fn run_repl(root: &Rc<std::cell::RefCell<Environment>>) {
    print!("{}", BANNER);

    let mut rl = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Could not start line editor: {}", e);
            return;
        }
    };

    loop {
        match rl.readline("lispy> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                if trimmed == ":q" || trimmed == "exit" {
                    break;
                }

                match parse(trimmed) {
                    // §4.1 literally: a line's root node becomes one SExpr
                    // of its children, evaluated once — not one independent
                    // top-level value per child (that per-child treatment
                    // is `load`'s job, not the REPL's; see reader.rs).
                    Ok(tree) => {
                        let result = eval(root, read_root(&tree));
                        if root.borrow().exit_requested() {
                            break;
                        }
                        println!("{}", result);
                    }
                    Err(e) => eprintln!("Parse Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("Interrupted (Ctrl+C)");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("Exiting (Ctrl+D)");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
}
