//! HTML serialization

use crate::{Dom, NodeId, NodeKind};

/// Elements that never have a closing tag
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "source", "track", "wbr",
];

pub(crate) fn write_node<D: Dom + ?Sized>(dom: &D, node: NodeId, out: &mut String) {
    match dom.kind(node) {
        None => {}
        Some(NodeKind::Text) => {
            // style and script content is raw text
            let raw = dom.parent(node)
                .and_then(|p| dom.tag_name(p))
                .map(|t| t == "style" || t == "script")
                .unwrap_or(false);
            let text = dom.text(node).unwrap_or_default();
            if raw {
                out.push_str(text);
            } else {
                escape_into(text, false, out);
            }
        }
        Some(NodeKind::Comment) => {
            out.push_str("<!--");
            out.push_str(dom.text(node).unwrap_or_default());
            out.push_str("-->");
        }
        Some(NodeKind::Document) | Some(NodeKind::Fragment) => {
            for child in dom.children(node) {
                write_node(dom, child, out);
            }
        }
        Some(NodeKind::Element) => {
            let tag = dom.tag_name(node).unwrap_or_default().to_string();
            out.push('<');
            out.push_str(&tag);
            for (name, value) in dom.attributes(node) {
                out.push(' ');
                out.push_str(&name);
                out.push_str("=\"");
                escape_into(&value, true, out);
                out.push('"');
            }
            out.push('>');

            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            for child in dom.children(node) {
                write_node(dom, child, out);
            }
            out.push_str("</");
            out.push_str(&tag);
            out.push('>');
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
