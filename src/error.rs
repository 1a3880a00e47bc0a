use thiserror::Error;

use crate::value::Value;

/// Internal error type used by built-ins to build formatted messages with
/// `?`. This is never the outward error channel: at the boundary between a
/// built-in and the evaluator every `EvalError` is flattened into a
/// `Value::Error`, since spec.md §7 treats errors as first-class runtime
/// values rather than exceptions that escape evaluation.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error("Function '{name}' passed incorrect type for argument {index}. Got {got}, Expected {expected}.")]
    WrongType {
        name: &'static str,
        index: usize,
        got: &'static str,
        expected: &'static str,
    },

    #[error("Function '{name}' passed too many arguments. Got {got}, Expected {expected}.")]
    TooManyArgs {
        name: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Function '{name}' passed too few arguments. Got {got}, Expected {expected}.")]
    TooFewArgs {
        name: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("Division by Zero.")]
    DivideByZero,

    #[error("Function '{name}' passed {{}} for argument {index}, Expected non-empty Q-Expression.")]
    EmptyList { name: &'static str, index: usize },

    #[error("Function '{name}' passed incorrect number of arguments for {what}. Got {got}, Expected {expected}.")]
    ShapeMismatch {
        name: &'static str,
        what: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("{0}")]
    Custom(String),
}

/// Result alias used internally by built-ins, never exposed past
/// `crate::builtins`'s own boundary helper.
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Flattens a built-in's internal `Result` into the `Value::Error` the
/// evaluator actually propagates.
pub fn to_value(result: EvalResult<Value>) -> Value {
    match result {
        Ok(v) => v,
        Err(e) => Value::Error(e.to_string()),
    }
}
