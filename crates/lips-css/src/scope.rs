//! Stylesheet scoping using lightningcss

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use crate::{CssError, ScopedStylesheet};

/// Lowest browser version printed for; predates native nesting, so nested
/// rules get flattened
const FLATTEN_TARGET: u32 = 95 << 16;

/// Attribute selector matching one scope
pub fn scope_selector(attribute: &str, scope_id: &str) -> String {
    format!("[{}=\"{}\"]", attribute, scope_id.replace('"', "\\\""))
}

/// Stylesheet scoper
#[derive(Debug, Clone)]
pub struct CssScoper {
    attribute: String,
}

impl CssScoper {
    /// Create a scoper marking scopes with `attribute`
    pub fn new(attribute: &str) -> Self {
        Self { attribute: attribute.to_string() }
    }

    /// Attribute carrying the scope id
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Rewrite `css` so it only applies inside `scope_id`
    pub fn scope(&self, css: &str, scope_id: &str) -> Result<ScopedStylesheet, CssError> {
        let wrapped = format!("{} {{\n{}\n}}", scope_selector(&self.attribute, scope_id), css);

        let stylesheet = StyleSheet::parse(&wrapped, ParserOptions::default())
            .map_err(|e| CssError::ParseError {
                line: e.loc.as_ref().map(|l| l.line).unwrap_or(0),
                message: format!("{:?}", e.kind),
            })?;

        let targets = Targets::from(Browsers {
            chrome: Some(FLATTEN_TARGET),
            ..Browsers::default()
        });
        let printed = stylesheet
            .to_css(PrinterOptions {
                targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| CssError::PrintError {
                message: format!("{:?}", e.kind),
            })?;

        tracing::debug!(scope = scope_id, bytes = printed.code.len(), "scoped stylesheet");

        Ok(ScopedStylesheet {
            scope_id: scope_id.to_string(),
            css: printed.code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_selector() {
        assert_eq!(scope_selector("lips-scope", "c1"), "[lips-scope=\"c1\"]");
    }

    #[test]
    fn test_scope_simple_rule() {
        let scoped = CssScoper::new("lips-scope").scope("p { color: red; }", "c1").unwrap();
        assert_eq!(scoped.scope_id, "c1");
        assert!(scoped.css.contains("lips-scope"));
        assert!(scoped.css.contains("c1"));
        assert!(scoped.css.contains(" p"));
        assert!(scoped.css.contains("red"));
    }

    #[test]
    fn test_invalid_css() {
        let result = CssScoper::new("lips-scope").scope("p { color: red; } }", "c1");
        assert!(result.is_err());
    }
}
