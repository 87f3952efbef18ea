//! Expression errors

use crate::token::Span;

/// Syntax error with the offending source span
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("SyntaxError: {message} at {}", span.start)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self { message: message.into(), span }
    }
}

/// Evaluation error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("ReferenceError: {0} is not defined")]
    Reference(String),

    #[error("TypeError: {0}")]
    Type(String),

    #[error("RangeError: {0}")]
    Range(String),

    #[error("TypeError: cannot assign to read-only '{0}'")]
    ReadOnly(String),

    /// Error raised by a host-provided function
    #[error("{0}")]
    Host(String),
}

impl EvalError {
    pub fn type_error(message: impl Into<String>) -> Self {
        EvalError::Type(message.into())
    }
}
