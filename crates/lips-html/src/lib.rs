//! Lips HTML - template markup
//!
//! Templates are written in an HTML dialect with directive tags (`<if>`,
//! `<for>`, ...). This crate rewrites the dialect's shorthand into plain
//! HTML, parses it with html5ever into an immutable [`TemplateNode`] tree and
//! caches parsed trees by markup.

mod preprocess;
mod parser;
mod node;
mod cache;
mod build;

pub use preprocess::preprocess;
pub use parser::{TemplateParser, ParseOptions};
pub use node::{TemplateNode, TemplateElement, TemplateAttr, to_markup};
pub use cache::TemplateCache;
pub use build::build_into;

/// Preprocess and parse a template in one step
pub fn parse(markup: &str) -> Vec<TemplateNode> {
    TemplateParser::new(ParseOptions::default()).parse(&preprocess(markup))
}
