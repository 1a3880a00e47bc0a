//! The evaluator (§4.2) and caller (§4.3).

use std::cell::RefCell;
use std::rc::Rc;

use crate::env::Environment;
use crate::value::{Function, Value, VARIADIC_MARKER};

/// `eval(env, v)` — §4.2.
pub fn eval(env: &Rc<RefCell<Environment>>, v: Value) -> Value {
    match v {
        Value::Symbol(name) => env
            .borrow()
            .get(&name)
            .unwrap_or_else(|| Value::Error(format!("Unbound symbol '{}'", name))),
        Value::SExpr(children) => eval_sexpr(env, children),
        other => other,
    }
}

/// `eval_sexpr(env, v)` — §4.2.
fn eval_sexpr(env: &Rc<RefCell<Environment>>, children: Vec<Value>) -> Value {
    let mut evaluated = Vec::with_capacity(children.len());
    for child in children {
        let result = eval(env, child);
        if result.is_error() {
            return result;
        }
        evaluated.push(result);
    }

    match evaluated.len() {
        0 => Value::unit(),
        1 => evaluated.into_iter().next().unwrap(),
        _ => {
            let mut iter = evaluated.into_iter();
            let head = iter.next().unwrap();
            let args: Vec<Value> = iter.collect();
            match head {
                Value::Function(f) => call(env, f, args),
                other => Value::Error(format!(
                    "S-Expression starts with incorrect type. Got {}, Expected Function.",
                    other.type_name()
                )),
            }
        }
    }
}

/// `call(env, f, args)` — §4.3. `args` have already been evaluated.
pub fn call(env: &Rc<RefCell<Environment>>, f: Function, args: Vec<Value>) -> Value {
    match f {
        Function::Builtin(handler, _name) => handler(Rc::clone(env), args),
        Function::Lambda { mut formals, body, env: lambda_env } => {
            let given = args.len();
            let total = formals.len();
            let mut args = args.into_iter();

            while let Some(arg) = args.next() {
                if formals.is_empty() {
                    return Value::Error(format!(
                        "Function passed too many arguments. Got {}, Expected {}.",
                        given, total
                    ));
                }
                let sym = formals.remove(0);
                let name = match &sym {
                    Value::Symbol(s) => s.clone(),
                    _ => return Value::Error("Formal must be a symbol.".to_string()),
                };

                if name == VARIADIC_MARKER {
                    if formals.len() != 1 {
                        return Value::Error(
                            "Function format invalid. Symbol '&' not followed by a single symbol."
                                .to_string(),
                        );
                    }
                    let rest_name = match formals.remove(0) {
                        Value::Symbol(s) => s,
                        _ => return Value::Error("Formal must be a symbol.".to_string()),
                    };
                    let mut rest = vec![arg];
                    rest.extend(args);
                    lambda_env.borrow_mut().put(&rest_name, Value::QExpr(rest));
                    formals.clear();
                    break;
                }

                lambda_env.borrow_mut().put(&name, arg);
            }

            // `&` with no remaining actuals: bind the following formal to an
            // empty list.
            if formals.len() >= 2 {
                if let Value::Symbol(s) = &formals[0] {
                    if s == VARIADIC_MARKER {
                        let rest_name = match &formals[1] {
                            Value::Symbol(s) => s.clone(),
                            _ => return Value::Error("Formal must be a symbol.".to_string()),
                        };
                        lambda_env.borrow_mut().put(&rest_name, Value::QExpr(Vec::new()));
                        formals.drain(0..2);
                    }
                }
            } else if formals.len() == 1 {
                if let Value::Symbol(s) = &formals[0] {
                    if s == VARIADIC_MARKER {
                        return Value::Error(
                            "Function format invalid. Symbol '&' not followed by a single symbol."
                                .to_string(),
                        );
                    }
                }
            }

            if formals.is_empty() {
                lambda_env.borrow_mut().set_parent(Rc::clone(env));
                eval(&lambda_env, Value::SExpr(body))
            } else {
                Value::Function(Function::Lambda { formals, body, env: lambda_env })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::populate_globals;
    use crate::parser::parse;
    use crate::reader::read_root;

    /// Evaluates one REPL-line's worth of source against a fresh
    /// environment — mirrors `main.rs::run_repl`: parse the line, read its
    /// root as a single `Value` (`read_root`, not the per-top-level-form
    /// `read_top_level` that only `load` uses), eval it once.
    fn run(src: &str) -> Value {
        let env = Environment::new_root();
        populate_globals(&env);
        run_line(&env, src)
    }

    fn run_line(env: &Rc<RefCell<Environment>>, src: &str) -> Value {
        let tree = parse(src).unwrap();
        eval(env, read_root(&tree))
    }

    /// Runs each line in turn against one persistent environment, as a
    /// sequence of separate REPL inputs (spec.md §8's "then" scenarios).
    /// Returns the last line's result.
    fn run_lines(lines: &[&str]) -> Value {
        let env = Environment::new_root();
        populate_globals(&env);
        let mut last = Value::unit();
        for line in lines {
            last = run_line(&env, line);
        }
        last
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run("(+ 1 2 3)"), Value::Number(6));
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(run("(/ 10 0)"), Value::Error("Division by Zero.".to_string()));
    }

    #[test]
    fn head_is_list_preserving() {
        assert_eq!(run("(head {1 2 3})"), Value::QExpr(vec![Value::Number(1)]));
    }

    #[test]
    fn nested_eval_tail() {
        assert_eq!(
            run("(eval (tail {tail tail {5 6 7}}))"),
            Value::QExpr(vec![Value::Number(6), Value::Number(7)])
        );
    }

    #[test]
    fn def_then_use() {
        assert_eq!(run("(def {x} 10)"), Value::unit());
        assert_eq!(run_lines(&["(def {x} 10)", "(+ x 5)"]), Value::Number(15));
    }

    #[test]
    fn fun_sugar_and_variadic() {
        let result = run_lines(&[
            "(fun {add-mul x y & z} {+ x (* y (eval (join {+} z)))})",
            "(add-mul 1 2 3 4 5)",
        ]);
        assert_eq!(result, Value::Number(25));
    }

    #[test]
    fn if_conditional() {
        assert_eq!(run("(if (> 2 1) {100} {200})"), Value::Number(100));
    }

    #[test]
    fn structural_equality() {
        assert_eq!(run("(== {1 2 3} {1 2 3})"), Value::Number(1));
    }

    #[test]
    fn closure_capture_is_independent_of_later_def() {
        assert_eq!(
            run_lines(&[
                "(def {mkadder} (\\ {x} {\\ {y} {+ x y}}))",
                "((mkadder 3) 4)",
            ]),
            Value::Number(7)
        );
        assert_eq!(
            run_lines(&[
                "(def {mkadder} (\\ {x} {\\ {y} {+ x y}}))",
                "((mkadder 3) 4)",
                "(def {x} 100)",
                "((mkadder 3) 4)",
            ]),
            Value::Number(7)
        );
    }

    #[test]
    fn partial_application() {
        let full = run_lines(&["(def {f} (\\ {a b c} {+ a (+ b c)}))", "((f 1) 2 3)"]);
        let direct = run_lines(&["(def {f} (\\ {a b c} {+ a (+ b c)}))", "(f 1 2 3)"]);
        assert_eq!(full, direct);
        assert_eq!(full, Value::Number(6));
    }

    #[test]
    fn unbound_symbol_error() {
        assert_eq!(run("nope"), Value::Error("Unbound symbol 'nope'".to_string()));
    }

    #[test]
    fn calling_non_function_errors() {
        assert_eq!(
            run("(1 2 3)"),
            Value::Error("S-Expression starts with incorrect type. Got Number, Expected Function.".to_string())
        );
    }

    // Literal spec.md §8 end-to-end scenario table, unparenthesized exactly
    // as written there, proving the REPL's single-eval-per-line semantics
    // handle the table's actual inputs (not an outer-parens-added stand-in).
    mod spec_table_scenarios {
        use super::*;

        #[test]
        fn scenario_1_sum() {
            assert_eq!(run("+ 1 2 3"), Value::Number(6));
        }

        #[test]
        fn scenario_2_div_by_zero() {
            assert_eq!(run("/ 10 0"), Value::Error("Division by Zero.".to_string()));
        }

        #[test]
        fn scenario_3_head() {
            assert_eq!(run("head {1 2 3}"), Value::QExpr(vec![Value::Number(1)]));
        }

        #[test]
        fn scenario_4_nested_eval_tail() {
            assert_eq!(
                run("eval (tail {tail tail {5 6 7}})"),
                Value::QExpr(vec![Value::Number(6), Value::Number(7)])
            );
        }

        #[test]
        fn scenario_5_def_then_use() {
            assert_eq!(run("def {x} 10"), Value::unit());
            assert_eq!(run_lines(&["def {x} 10", "+ x 5"]), Value::Number(15));
        }

        #[test]
        fn scenario_6_fun_variadic() {
            assert_eq!(
                run_lines(&[
                    "fun {add-mul x y & z} {+ x (* y (eval (join {+} z)))}",
                    "add-mul 1 2 3 4 5",
                ]),
                Value::Number(25)
            );
        }

        #[test]
        fn scenario_7_if() {
            assert_eq!(run("if (> 2 1) {100} {200}"), Value::Number(100));
        }

        #[test]
        fn scenario_8_structural_equality() {
            assert_eq!(run("== {1 2 3} {1 2 3}"), Value::Number(1));
        }
    }
}
