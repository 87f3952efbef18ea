//! Edge case tests for lips-dom
//!
//! Node lifetime, slot reuse, moves between containers and queries over
//! larger trees.

use std::cell::Cell;
use std::rc::Rc;

use lips_dom::{dispatch_event, Dom, DomError, DomEvent, DomTree, NodeKind};

// ============================================================================
// NODE LIFETIME
// ============================================================================

#[test]
fn test_remove_document_is_rejected() {
    let mut dom = DomTree::new();
    let doc = dom.document();
    assert_eq!(dom.remove(doc), Err(DomError::InvalidNodeType));
    assert!(dom.contains(doc));
}

#[test]
fn test_operations_on_removed_node() {
    let mut dom = DomTree::new();
    let div = dom.create_element("div");
    dom.remove(div).unwrap();

    assert_eq!(dom.set_attribute(div, "id", "x"), Err(DomError::NotFound));
    assert_eq!(dom.detach(div), Err(DomError::NotFound));
    assert!(dom.children(div).is_empty());
    assert!(dom.parent(div).is_none());
    assert_eq!(dom.outer_html(div), "");
}

#[test]
fn test_many_create_remove_cycles_keep_arena_bounded() {
    let mut dom = DomTree::new();
    let body = dom.body().unwrap();
    let baseline = dom.len();

    for i in 0..1000 {
        let p = dom.create_element("p");
        let t = dom.create_text(&i.to_string());
        dom.append_child(p, t).unwrap();
        dom.append_child(body, p).unwrap();
        dom.remove(p).unwrap();
    }

    assert_eq!(dom.len(), baseline);
}

// ============================================================================
// MOVES
// ============================================================================

#[test]
fn test_fragment_children_moved_in_order() {
    let mut dom = DomTree::new();
    let body = dom.body().unwrap();
    let marker = dom.create_comment("end");
    dom.append_child(body, marker).unwrap();

    let frag = dom.create_fragment();
    let nodes: Vec<_> = (0..3).map(|_| dom.create_element("li")).collect();
    for &n in &nodes {
        dom.append_child(frag, n).unwrap();
    }

    for child in dom.children(frag) {
        dom.insert_before(body, child, Some(marker)).unwrap();
    }

    let mut expected = nodes.clone();
    expected.push(marker);
    assert_eq!(dom.children(body), expected);
    assert!(dom.children(frag).is_empty());
}

#[test]
fn test_insert_before_self_is_noop() {
    let mut dom = DomTree::new();
    let body = dom.body().unwrap();
    let a = dom.create_element("a");
    dom.append_child(body, a).unwrap();
    dom.insert_before(body, a, Some(a)).unwrap();
    assert_eq!(dom.children(body), vec![a]);
}

#[test]
fn test_detach_keeps_node_alive() {
    let mut dom = DomTree::new();
    let body = dom.body().unwrap();
    let span = dom.create_element("span");
    dom.append_child(body, span).unwrap();

    dom.detach(span).unwrap();
    assert!(dom.contains(span));
    assert!(dom.parent(span).is_none());
    assert_eq!(dom.kind(span), Some(NodeKind::Element));
}

// ============================================================================
// QUERIES AND SERIALIZATION
// ============================================================================

#[test]
fn test_query_selector_document_order() {
    let mut dom = DomTree::new();
    let body = dom.body().unwrap();
    let ul = dom.create_element("ul");
    dom.append_child(body, ul).unwrap();
    for i in 0..5 {
        let li = dom.create_element("li");
        dom.set_attribute(li, "data-i", &i.to_string()).unwrap();
        dom.append_child(ul, li).unwrap();
    }

    let all = dom.query_selector_all(body, "ul > li");
    assert_eq!(all.len(), 5);
    assert_eq!(dom.get_attribute(all[0], "data-i"), Some("0"));
    assert_eq!(dom.query_selector(body, "[data-i=3]"), Some(all[3]));
    assert!(dom.query_selector(body, "li li").is_none());
}

#[test]
fn test_inner_html_of_body() {
    let mut dom = DomTree::new();
    let body = dom.body().unwrap();
    let h1 = dom.create_element("h1");
    dom.set_text(h1, "Title").unwrap();
    dom.append_child(body, h1).unwrap();
    assert_eq!(dom.inner_html(body), "<h1>Title</h1>");
    assert_eq!(dom.text_content(body), "Title");
}

// ============================================================================
// EVENTS
// ============================================================================

#[test]
fn test_removed_listener_not_invoked() {
    let dom = DomTree::new().into_shared();
    let button = {
        let mut d = dom.borrow_mut();
        let body = d.body().unwrap();
        let b = d.create_element("button");
        d.append_child(body, b).unwrap();
        b
    };

    let hits = Rc::new(Cell::new(0));
    let counter = hits.clone();
    let id = dom
        .borrow_mut()
        .add_listener(button, "click", Rc::new(move |_: &DomEvent| counter.set(counter.get() + 1)))
        .unwrap();

    dispatch_event(&dom, button, "click");
    assert!(dom.borrow_mut().remove_listener(id));
    assert!(!dom.borrow_mut().remove_listener(id));
    dispatch_event(&dom, button, "click");

    assert_eq!(hits.get(), 1);
    assert_eq!(dom.borrow().listener_count(), 0);
}
