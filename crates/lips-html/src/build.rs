//! Static DOM construction
//!
//! Builds DOM nodes from a template tree verbatim, with no directive or
//! expression handling. Used for `html` attributes.

use lips_dom::{Dom, DomResult, NodeId};

use crate::TemplateNode;

/// Append DOM nodes built from `nodes` to `parent`
pub fn build_into<D: Dom + ?Sized>(dom: &mut D, parent: NodeId, nodes: &[TemplateNode]) -> DomResult<()> {
    for node in nodes {
        let id = match node {
            TemplateNode::Text(text) => dom.create_text(text),
            TemplateNode::Comment(text) => dom.create_comment(text),
            TemplateNode::Element(elem) => {
                let id = dom.create_element(&elem.tag);
                for attr in &elem.attrs {
                    dom.set_attribute(id, &attr.name, &attr.value)?;
                }
                build_into(dom, id, &elem.children)?;
                id
            }
        };
        dom.append_child(parent, id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lips_dom::DomTree;

    #[test]
    fn test_build_static_markup() {
        let nodes = crate::parse("<b class=\"x\">bold</b> and <!--c-->text");
        let mut dom = DomTree::new();
        let div = dom.create_element("div");
        build_into(&mut dom, div, &nodes).unwrap();
        assert_eq!(dom.inner_html(div), "<b class=\"x\">bold</b> and <!--c-->text");
    }
}
