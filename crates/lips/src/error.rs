//! Error types

use lips_css::CssError;
use lips_dom::DomError;
use lips_expr::EvalError;

/// Runtime error returned by public operations
#[derive(Debug, thiserror::Error)]
pub enum LipsError {
    #[error("component '{0}' is not registered")]
    NotFound(String),

    #[error("component '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("no element matches '{0}'")]
    TargetNotFound(String),

    #[error("component '{0}' has been destroyed")]
    Destroyed(String),

    #[error("method '{0}' is not defined")]
    MethodNotFound(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Dom(#[from] DomError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Css(#[from] CssError),
}

/// Failure of a single directive; logged, never propagated past the directive
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    #[error("<{tag}> requires a `{attribute}` attribute")]
    MissingAttribute { tag: String, attribute: &'static str },

    #[error("<{tag}> must follow {expected}")]
    Orphan { tag: String, expected: &'static str },

    #[error("`{expression}` is not iterable (got {found})")]
    NotIterable { expression: String, found: &'static str },

    #[error("range bounds must be finite numbers")]
    InvalidRange,

    #[error("range of {count} iterations exceeds the limit of {limit}")]
    RangeTooLarge { count: f64, limit: usize },

    #[error("component nesting exceeds {0} levels")]
    DepthExceeded(usize),

    #[error("`{0}` is neither a method nor a function")]
    NotCallable(String),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Dom(#[from] DomError),
}
