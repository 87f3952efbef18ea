//! Parsed template tree
//!
//! Immutable once parsed. Children are reference counted so directive
//! bodies can be handed around (e.g. to a nested component's slot) without
//! copying the subtree.

use std::rc::Rc;

use lips_dom::VOID_ELEMENTS;

/// Template node
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Element(TemplateElement),
    Text(String),
    Comment(String),
}

impl TemplateNode {
    /// Element payload, if this is an element
    pub fn as_element(&self) -> Option<&TemplateElement> {
        match self {
            TemplateNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this is a text node holding only whitespace
    pub fn is_blank_text(&self) -> bool {
        matches!(self, TemplateNode::Text(t) if t.trim().is_empty())
    }
}

/// Template element
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateElement {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in source order
    pub attrs: Vec<TemplateAttr>,
    pub children: Rc<[TemplateNode]>,
}

impl TemplateElement {
    /// Get an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Serialize the children back into markup
    pub fn inner_markup(&self) -> String {
        to_markup(&self.children)
    }
}

/// Template attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAttr {
    pub name: String,
    pub value: String,
}

/// Serialize template nodes back into markup that parses to the same tree
pub fn to_markup(nodes: &[TemplateNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, false, &mut out);
    }
    out
}

fn write_node(node: &TemplateNode, raw: bool, out: &mut String) {
    match node {
        TemplateNode::Text(text) if raw => out.push_str(text),
        TemplateNode::Text(text) => {
            for c in text.chars() {
                match c {
                    '&' => out.push_str("&amp;"),
                    '<' => out.push_str("&lt;"),
                    '>' => out.push_str("&gt;"),
                    _ => out.push(c),
                }
            }
        }
        TemplateNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        TemplateNode::Element(elem) => {
            out.push('<');
            out.push_str(&elem.tag);
            for attr in &elem.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&attr.value.replace('&', "&amp;").replace('"', "&quot;"));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&elem.tag.as_str()) {
                return;
            }
            let raw = elem.tag == "style" || elem.tag == "script";
            for child in elem.children.iter() {
                write_node(child, raw, out);
            }
            out.push_str("</");
            out.push_str(&elem.tag);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, attrs: &[(&str, &str)], children: Vec<TemplateNode>) -> TemplateNode {
        TemplateNode::Element(TemplateElement {
            tag: tag.to_string(),
            attrs: attrs.iter()
                .map(|(n, v)| TemplateAttr { name: n.to_string(), value: v.to_string() })
                .collect(),
            children: children.into(),
        })
    }

    #[test]
    fn test_to_markup_escapes() {
        let tree = vec![element("if", &[("by", "a && b == \"x\"")], vec![
            TemplateNode::Text("1 < 2".into()),
            element("br", &[], vec![]),
        ])];
        assert_eq!(
            to_markup(&tree),
            "<if by=\"a &amp;&amp; b == &quot;x&quot;\">1 &lt; 2<br></if>"
        );
    }

    #[test]
    fn test_attr_lookup() {
        let node = element("for", &[("in", "items")], vec![]);
        let elem = node.as_element().unwrap();
        assert_eq!(elem.attr("in"), Some("items"));
        assert_eq!(elem.attr("from"), None);
    }
}
