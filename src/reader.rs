//! Converts a `ParseNode` tree (crate::parser) into `Value`s, per spec.md
//! §4.1. This is "the AST reader" component: parser construction is the
//! black box, this is not.

use crate::parser::ParseNode;
use crate::value::Value;

/// Reads an entire root node (tag `">"`) as a *single* `Value`, per §4.1's
/// literal contract: "A root node ... becomes an SExpr populated by ...
/// recursively reading each ... child". This is what the REPL (`main.rs`)
/// evaluates once per input line: `+ 1 2 3` reads as one `SExpr` of four
/// children and evaluates to `6`, not four independent top-level values.
pub fn read_root(root: &ParseNode) -> Value {
    read_node(root).unwrap_or_else(Value::unit)
}

/// Reads every top-level expression out of a root node as its own `Value`,
/// skipping comments. Unlike `read_root`, this does not fold the children
/// into one SExpr — it's what `load` (§4.4) uses to evaluate each top-level
/// form of a file independently, in sequence, printing errors and
/// continuing rather than treating the whole file as a single expression.
pub fn read_top_level(root: &ParseNode) -> Vec<Value> {
    root.children.iter().filter_map(read_node).collect()
}

/// Reads a single node per the §4.1 contract. Returns `None` for nodes the
/// reader elides entirely (comments, delimiters — delimiters never reach
/// this function since the parser doesn't emit them as nodes).
fn read_node(node: &ParseNode) -> Option<Value> {
    match node.tag {
        "number" => Some(read_number(&node.contents)),
        "symbol" => Some(Value::Symbol(node.contents.clone())),
        "string" => Some(Value::Str(unescape(&node.contents))),
        "comment" => None,
        "sexpr" | ">" => Some(Value::SExpr(read_children(node))),
        "qexpr" => Some(Value::QExpr(read_children(node))),
        other => panic!("reader: unknown parse node tag {:?}", other),
    }
}

fn read_children(node: &ParseNode) -> Vec<Value> {
    node.children.iter().filter_map(read_node).collect()
}

fn read_number(lexeme: &str) -> Value {
    match lexeme.parse::<i64>() {
        Ok(n) => Value::Number(n),
        Err(_) => Value::Error("Invalid Number: Out of range.".to_string()),
    }
}

/// Unescapes the standard C-style escapes the tokenizer leaves untouched
/// (`\n`, `\t`, `\\`, `\"`, plus the common `\r`, `\0`, `\a`, `\b`, `\f`,
/// `\v`). Unrecognized escapes keep their backslash-less character.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn reads_arithmetic_sexpr() {
        let tree = parse("(+ 1 2 3)").unwrap();
        let values = read_top_level(&tree);
        assert_eq!(values.len(), 1);
        match &values[0] {
            Value::SExpr(children) => assert_eq!(children.len(), 4),
            other => panic!("expected SExpr, got {:?}", other),
        }
    }

    #[test]
    fn number_out_of_range_becomes_error_value() {
        let tree = parse("99999999999999999999999").unwrap();
        let values = read_top_level(&tree);
        assert!(matches!(&values[0], Value::Error(msg) if msg == "Invalid Number: Out of range."));
    }

    #[test]
    fn comments_are_skipped() {
        let tree = parse("1 ; a comment\n2").unwrap();
        let values = read_top_level(&tree);
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn string_unescaping() {
        let tree = parse("\"a\\nb\"").unwrap();
        let values = read_top_level(&tree);
        assert_eq!(values[0], Value::Str("a\nb".to_string()));
    }

    #[test]
    fn qexpr_children_read_as_qexpr() {
        let tree = parse("{1 2 3}").unwrap();
        let values = read_top_level(&tree);
        assert!(matches!(&values[0], Value::QExpr(items) if items.len() == 3));
    }

    #[test]
    fn read_root_folds_unparenthesized_line_into_one_sexpr() {
        let tree = parse("+ 1 2 3").unwrap();
        match read_root(&tree) {
            Value::SExpr(children) => assert_eq!(children.len(), 4),
            other => panic!("expected SExpr, got {:?}", other),
        }
    }

    #[test]
    fn read_root_wraps_single_parenthesized_form_in_an_outer_sexpr() {
        let tree = parse("(+ 1 2 3)").unwrap();
        match read_root(&tree) {
            Value::SExpr(children) => {
                assert_eq!(children.len(), 1);
                assert!(matches!(&children[0], Value::SExpr(inner) if inner.len() == 4));
            }
            other => panic!("expected SExpr, got {:?}", other),
        }
    }
}
