//! Lips CSS - component stylesheet scoping
//!
//! A component stylesheet is nested under an attribute selector naming the
//! component instance, then flattened by lightningcss into plain CSS that only
//! reaches elements carrying that attribute (and their descendants).

mod scope;

pub use scope::{CssScoper, scope_selector};

/// Scope a stylesheet with the default scoper
pub fn scope_stylesheet(css: &str, attribute: &str, scope_id: &str) -> Result<ScopedStylesheet, CssError> {
    CssScoper::new(attribute).scope(css, scope_id)
}

/// Stylesheet rewritten for one component instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedStylesheet {
    /// Scope identifier the rules are bound to
    pub scope_id: String,
    /// Flattened CSS text
    pub css: String,
}

/// CSS scoping error
#[derive(Debug, thiserror::Error)]
pub enum CssError {
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: u32, message: String },

    #[error("Print error: {message}")]
    PrintError { message: String },
}
