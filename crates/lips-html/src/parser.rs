//! Template parser
//!
//! Uses html5ever's RcDom and converts the content of `<head>` and `<body>`
//! into a flat list of [`TemplateNode`]s. Leading `<style>`/`<meta>` tags end
//! up in head, so head children come first to keep source order.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::{TemplateAttr, TemplateElement, TemplateNode};

/// Parser options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Keep whitespace-only text that contains a newline
    pub keep_indentation: bool,
}

/// Template parser
#[derive(Debug, Clone, Default)]
pub struct TemplateParser {
    options: ParseOptions,
}

impl TemplateParser {
    /// Create a new template parser
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    /// Parse preprocessed markup into template nodes
    pub fn parse(&self, markup: &str) -> Vec<TemplateNode> {
        let dom = parse_document(RcDom::default(), Default::default()).one(markup);

        let mut nodes = Vec::new();
        for child in dom.document.children.borrow().iter() {
            if element_name(child).as_deref() != Some("html") {
                // comments ahead of the first tag land on the document
                if matches!(child.data, RcNodeData::Comment { .. }) {
                    self.convert_node(child, &mut nodes);
                }
                continue;
            }
            for section in child.children.borrow().iter() {
                match element_name(section).as_deref() {
                    Some("head") | Some("body") => {
                        for node in section.children.borrow().iter() {
                            self.convert_node(node, &mut nodes);
                        }
                    }
                    _ => self.convert_node(section, &mut nodes),
                }
            }
        }

        tracing::debug!("Parsed template into {} top-level nodes", nodes.len());
        nodes
    }

    /// Convert an RcDom node, appending the result to `out`
    fn convert_node(&self, handle: &Handle, out: &mut Vec<TemplateNode>) {
        match &handle.data {
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if !self.options.keep_indentation && text.trim().is_empty() && text.contains('\n') {
                    return;
                }
                out.push(TemplateNode::Text(text));
            }
            RcNodeData::Comment { contents } => {
                out.push(TemplateNode::Comment(contents.to_string()));
            }
            RcNodeData::Element { name, attrs, .. } => {
                let attrs = attrs.borrow()
                    .iter()
                    .map(|a| TemplateAttr {
                        name: a.name.local.to_string(),
                        value: a.value.to_string(),
                    })
                    .collect();

                let mut children = Vec::new();
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, &mut children);
                }

                out.push(TemplateNode::Element(TemplateElement {
                    tag: name.local.to_string(),
                    attrs,
                    children: children.into(),
                }));
            }
            RcNodeData::Document
            | RcNodeData::Doctype { .. }
            | RcNodeData::ProcessingInstruction { .. } => {}
        }
    }
}

fn element_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        RcNodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(markup: &str) -> Vec<TemplateNode> {
        TemplateParser::default().parse(markup)
    }

    #[test]
    fn test_parse_simple() {
        let nodes = parse("<div class=\"a\"><span>Text</span></div>");
        assert_eq!(nodes.len(), 1);
        let div = nodes[0].as_element().unwrap();
        assert_eq!(div.tag, "div");
        assert_eq!(div.attr("class"), Some("a"));
        assert_eq!(div.children.len(), 1);
    }

    #[test]
    fn test_parse_directive_tags() {
        let nodes = parse("<if by=\"x\"><p>a</p></if><else><p>b</p></else>");
        let tags: Vec<_> = nodes.iter().filter_map(|n| n.as_element()).map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["if", "else"]);
    }

    #[test]
    fn test_indentation_dropped() {
        let nodes = parse("<ul>\n  <li>a</li>\n</ul>");
        let ul = nodes[0].as_element().unwrap();
        assert_eq!(ul.children.len(), 1);

        let kept = TemplateParser::new(ParseOptions { keep_indentation: true })
            .parse("<ul>\n  <li>a</li>\n</ul>");
        assert_eq!(kept[0].as_element().unwrap().children.len(), 3);
    }

    #[test]
    fn test_inline_space_kept() {
        let nodes = parse("<p><b>a</b> <i>b</i></p>");
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.children.len(), 3);
        assert_eq!(p.children[1], TemplateNode::Text(" ".into()));
    }

    #[test]
    fn test_leading_style_kept_in_order() {
        let nodes = parse("<style>p{}</style><p>x</p>");
        let tags: Vec<_> = nodes.iter().filter_map(|n| n.as_element()).map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["style", "p"]);
    }
}
