//! Tokenizer and recursive-descent parser that turns Lispy source text into
//! a generic tagged parse tree. Grammar construction is out of scope for
//! this crate (spec.md §1): this module is the "black box" that plays the
//! role the original's vendored `mpc` parser combinator library played,
//! producing `mpc_ast_t`-shaped nodes (`tag` + `contents` + `children`) for
//! `crate::reader` to walk per §4.1's contract.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::{EvalError, EvalResult};

/// A node in the parse tree, tagged the way `mpc_ast_t` tags its nodes
/// (`"number"`, `"symbol"`, `"string"`, `"comment"`, `"sexpr"`, `"qexpr"`,
/// or `">"` for a top-level root).
#[derive(Debug, Clone)]
pub struct ParseNode {
    pub tag: &'static str,
    pub contents: String,
    pub children: Vec<ParseNode>,
}

impl ParseNode {
    fn leaf(tag: &'static str, contents: String) -> ParseNode {
        ParseNode { tag, contents, children: Vec::new() }
    }

    fn branch(tag: &'static str, children: Vec<ParseNode>) -> ParseNode {
        ParseNode { tag, contents: String::new(), children }
    }
}

/// The symbol grammar from spec.md §6: `[a-zA-Z0-9_+\-*/\\=<>!&|]`.
fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_+-*/\\=<>!&|".contains(c)
}

struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Tokenizer { chars: input.chars().peekable() }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(c) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    /// Reads one top-level expr node, or `None` at end of input.
    fn next_node(&mut self) -> EvalResult<Option<ParseNode>> {
        self.skip_whitespace();
        match self.chars.peek() {
            None => Ok(None),
            Some('(') => self.read_list('(', ')', "sexpr").map(Some),
            Some('{') => self.read_list('{', '}', "qexpr").map(Some),
            Some(')') | Some('}') => {
                Err(EvalError::Custom(format!("Unexpected '{}'", self.chars.next().unwrap())))
            }
            Some(';') => {
                let node = self.read_comment();
                Ok(Some(node))
            }
            Some('"') => self.read_string().map(Some),
            Some(c) if c.is_ascii_digit() || (*c == '-' && self.peeks_digit_after_minus()) => {
                self.read_number().map(Some)
            }
            Some(_) => self.read_symbol().map(Some),
        }
    }

    fn peeks_digit_after_minus(&self) -> bool {
        let mut clone = self.chars.clone();
        clone.next();
        matches!(clone.peek(), Some(c) if c.is_ascii_digit())
    }

    fn read_list(&mut self, open: char, close: char, tag: &'static str) -> EvalResult<ParseNode> {
        self.chars.next(); // consume opening delimiter
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                None => return Err(EvalError::Custom(format!("Unmatched '{}'", open))),
                Some(c) if *c == close => {
                    self.chars.next();
                    return Ok(ParseNode::branch(tag, children));
                }
                Some(')') | Some('}') => {
                    return Err(EvalError::Custom(format!(
                        "Unexpected '{}' while reading {}",
                        self.chars.next().unwrap(),
                        tag
                    )));
                }
                _ => match self.next_node()? {
                    Some(node) => children.push(node),
                    None => return Err(EvalError::Custom(format!("Unmatched '{}'", open))),
                },
            }
        }
    }

    fn read_comment(&mut self) -> ParseNode {
        let mut contents = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            contents.push(c);
            self.chars.next();
        }
        ParseNode::leaf("comment", contents)
    }

    fn read_string(&mut self) -> EvalResult<ParseNode> {
        self.chars.next(); // opening quote
        let mut raw = String::new();
        loop {
            match self.chars.next() {
                None => return Err(EvalError::Custom("Unterminated string literal".into())),
                Some('"') => break,
                Some('\\') => {
                    let escaped = self
                        .chars
                        .next()
                        .ok_or_else(|| EvalError::Custom("Unterminated escape in string literal".into()))?;
                    raw.push('\\');
                    raw.push(escaped);
                }
                Some(c) => raw.push(c),
            }
        }
        // `contents` carries the raw (still-escaped) text between quotes;
        // unescaping is the reader's job (§4.1).
        Ok(ParseNode::leaf("string", raw))
    }

    fn read_number(&mut self) -> EvalResult<ParseNode> {
        let mut lexeme = String::new();
        if matches!(self.chars.peek(), Some('-')) {
            lexeme.push(self.chars.next().unwrap());
        }
        while matches!(self.chars.peek(), Some(c) if c.is_ascii_digit()) {
            lexeme.push(self.chars.next().unwrap());
        }
        Ok(ParseNode::leaf("number", lexeme))
    }

    fn read_symbol(&mut self) -> EvalResult<ParseNode> {
        let mut lexeme = String::new();
        while matches!(self.chars.peek(), Some(&c) if is_symbol_char(c)) {
            lexeme.push(self.chars.next().unwrap());
        }
        if lexeme.is_empty() {
            let bad = self.chars.next().unwrap();
            return Err(EvalError::Custom(format!("Unexpected character '{}'", bad)));
        }
        Ok(ParseNode::leaf("symbol", lexeme))
    }
}

/// Parses a full line (or file) of source into a root node tagged `">"`
/// whose children are the top-level expressions, mirroring the grammar in
/// spec.md §6 (`Top-level is a sequence of exprs`).
pub fn parse(input: &str) -> EvalResult<ParseNode> {
    let mut tokenizer = Tokenizer::new(input);
    let mut children = Vec::new();
    while let Some(node) = tokenizer.next_node()? {
        children.push(node);
    }
    Ok(ParseNode::branch(">", children))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_sexpr() {
        let root = parse("(+ 1 (* 2 3))").unwrap();
        assert_eq!(root.tag, ">");
        assert_eq!(root.children.len(), 1);
        let call = &root.children[0];
        assert_eq!(call.tag, "sexpr");
        assert_eq!(call.children.len(), 3);
        assert_eq!(call.children[2].tag, "sexpr");
    }

    #[test]
    fn parses_qexpr_and_negative_numbers() {
        let root = parse("{1 -2 3}").unwrap();
        let qexpr = &root.children[0];
        assert_eq!(qexpr.tag, "qexpr");
        assert_eq!(qexpr.children[1].contents, "-2");
    }

    #[test]
    fn parses_string_and_comment() {
        let root = parse("\"hi\\n\" ; trailing comment").unwrap();
        assert_eq!(root.children[0].tag, "string");
        assert_eq!(root.children[1].tag, "comment");
    }

    #[test]
    fn multiple_top_level_expressions() {
        let root = parse("1 2 3").unwrap();
        assert_eq!(root.children.len(), 3);
    }

    #[test]
    fn unmatched_paren_is_an_error() {
        assert!(parse("(+ 1 2").is_err());
    }
}
