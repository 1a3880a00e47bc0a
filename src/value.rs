use std::fmt;
use std::rc::Rc;
use std::cell::RefCell;

use crate::env::Environment;

/// Signature shared by every built-in procedure: the environment the call is
/// happening in, plus the already-evaluated argument list.
pub type BuiltinFn = fn(Rc<RefCell<Environment>>, Vec<Value>) -> Value;

/// The variadic marker that may appear in a lambda's formals list.
pub const VARIADIC_MARKER: &str = "&";

/// A runtime Lispy value. Every evaluation step produces one of these.
///
/// There is no separate boolean variant: truthiness is carried by
/// `Number`, with `0` false and anything else true, matching the
/// comparison/`if`/`and`/`or`/`not` builtins (§4.4).
#[derive(Debug)]
pub enum Value {
    Number(i64),
    Error(String),
    Symbol(String),
    Str(String),
    SExpr(Vec<Value>),
    QExpr(Vec<Value>),
    Function(Function),
}

/// Either a built-in handler or a user-defined lambda closure.
#[derive(Debug)]
pub enum Function {
    Builtin(BuiltinFn, String),
    Lambda {
        formals: Vec<Value>,
        body: Vec<Value>,
        env: Rc<RefCell<Environment>>,
    },
}

impl Clone for Function {
    fn clone(&self) -> Self {
        match self {
            Function::Builtin(f, name) => Function::Builtin(*f, name.clone()),
            Function::Lambda { formals, body, env } => Function::Lambda {
                formals: formals.clone(),
                body: body.clone(),
                env: Environment::clone_handle(env),
            },
        }
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        match self {
            Value::Number(n) => Value::Number(*n),
            Value::Error(s) => Value::Error(s.clone()),
            Value::Symbol(s) => Value::Symbol(s.clone()),
            Value::Str(s) => Value::Str(s.clone()),
            Value::SExpr(items) => Value::SExpr(items.clone()),
            Value::QExpr(items) => Value::QExpr(items.clone()),
            Value::Function(f) => Value::Function(f.clone()),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Function::Builtin(a, _), Function::Builtin(b, _)) => std::ptr::eq(*a as *const (), *b as *const ()),
            (
                Function::Lambda { formals: f1, body: b1, .. },
                Function::Lambda { formals: f2, body: b2, .. },
            ) => f1 == f2 && b1 == b2,
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::SExpr(a), Value::SExpr(b)) => a == b,
            (Value::QExpr(a), Value::QExpr(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "Number",
            Value::Error(_) => "Error",
            Value::Symbol(_) => "Symbol",
            Value::Str(_) => "String",
            Value::SExpr(_) => "S-Expression",
            Value::QExpr(_) => "Q-Expression",
            Value::Function(_) => "Function",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Number(0))
    }

    pub fn bool(b: bool) -> Value {
        Value::Number(if b { 1 } else { 0 })
    }

    pub fn unit() -> Value {
        Value::SExpr(Vec::new())
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, open: char, close: char, items: &[Value]) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Error(msg) => write!(f, "Error: {}", msg),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Str(s) => write!(f, "\"{}\"", escape(s)),
            Value::SExpr(items) => write_joined(f, '(', ')', items),
            Value::QExpr(items) => write_joined(f, '{', '}', items),
            Value::Function(Function::Builtin(_, name)) => write!(f, "<builtin: {}>", name),
            Value::Function(Function::Lambda { formals, body, .. }) => {
                write!(f, "(\\ ")?;
                write_joined(f, '{', '}', formals)?;
                write!(f, " ")?;
                write_joined(f, '{', '}', body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_sexpr_and_qexpr() {
        let s = Value::SExpr(vec![Value::Number(1), Value::Number(2)]);
        assert_eq!(s.to_string(), "(1 2)");
        let q = Value::QExpr(vec![Value::Symbol("a".into())]);
        assert_eq!(q.to_string(), "{a}");
    }

    #[test]
    fn display_error() {
        let e = Value::Error("Division by Zero.".into());
        assert_eq!(e.to_string(), "Error: Division by Zero.");
    }

    #[test]
    fn display_string_escapes() {
        let s = Value::Str("a\nb".into());
        assert_eq!(s.to_string(), "\"a\\nb\"");
    }

    #[test]
    fn equality_is_structural_for_lists() {
        let a = Value::QExpr(vec![Value::Number(1), Value::Number(2)]);
        let b = Value::QExpr(vec![Value::Number(1), Value::Number(2)]);
        assert_eq!(a, b);
    }

    #[test]
    fn equality_requires_same_type() {
        assert_ne!(Value::Number(1), Value::Str("1".into()));
    }

    #[test]
    fn truthiness_follows_zero() {
        assert!(!Value::Number(0).truthy());
        assert!(Value::Number(1).truthy());
        assert!(Value::Number(-1).truthy());
    }
}
