//! Template parsing tests for lips-html
//!
//! Preprocessing and parsing together, the way the runtime uses them.

use lips_html::{parse, preprocess, to_markup, TemplateCache, TemplateNode};

fn tags(nodes: &[TemplateNode]) -> Vec<&str> {
    nodes.iter().filter_map(|n| n.as_element()).map(|e| e.tag.as_str()).collect()
}

// ============================================================================
// DIRECTIVES
// ============================================================================

#[test]
fn test_if_chain_shorthand() {
    let nodes = parse(
        "<if(count > 1)><p>many</p></if>\n<else-if(count === 1)><p>one</p></else-if>\n<else><p>none</p></else>",
    );
    assert_eq!(tags(&nodes), vec!["if", "else-if", "else"]);
    assert_eq!(nodes[0].as_element().unwrap().attr("by"), Some("count > 1"));
    assert_eq!(nodes.len(), 3);
}

#[test]
fn test_for_with_quoted_strings() {
    let nodes = parse("<for(['a', \"b\"])><li>{each}</li></for>");
    let for_tag = nodes[0].as_element().unwrap();
    assert_eq!(for_tag.attr("in"), Some("['a', \"b\"]"));
    assert_eq!(for_tag.children.len(), 1);
}

#[test]
fn test_self_closing_let_scopes_siblings() {
    // without expansion html5ever would nest the paragraph inside <let>
    let nodes = parse("<let name=\"'x'\"/><p>{name}</p>");
    assert_eq!(tags(&nodes), vec!["let", "p"]);
    assert!(nodes[0].as_element().unwrap().children.is_empty());
}

#[test]
fn test_switch_case_default() {
    let nodes = parse("<switch(kind)><case(1, 2)>low</case><default>other</default></switch>");
    let switch = nodes[0].as_element().unwrap();
    assert_eq!(switch.attr("by"), Some("kind"));
    assert_eq!(tags(&switch.children), vec!["case", "default"]);
    assert_eq!(switch.children[0].as_element().unwrap().attr("is"), Some("1, 2"));
}

#[test]
fn test_async_block() {
    let nodes = parse(
        "<async(load, 1)><preload>loading</preload><resolve>{response}</resolve><catch>{error}</catch></async>",
    );
    let block = nodes[0].as_element().unwrap();
    assert_eq!(block.attr("await"), Some("load, 1"));
    assert_eq!(tags(&block.children), vec!["preload", "resolve", "catch"]);
}

// ============================================================================
// COMPONENT USAGE
// ============================================================================

#[test]
fn test_component_tag_keeps_slot_markup() {
    let nodes = parse("<my-card title=\"'Hi'\" active><b>inner {x}</b></my-card>");
    let card = nodes[0].as_element().unwrap();
    assert_eq!(card.tag, "my-card");
    assert_eq!(card.attr("active"), Some(""));
    assert_eq!(card.inner_markup(), "<b>inner {x}</b>");
}

#[test]
fn test_markup_reparses_to_same_tree() {
    let source = preprocess("<if(a && b)><p title=\"x\">1 &lt; 2</p></if>");
    let first = parse(&source);
    let second = parse(&to_markup(&first));
    assert_eq!(first, second);
}

// ============================================================================
// CACHE
// ============================================================================

#[test]
fn test_cache_keyed_by_markup() {
    let cache = TemplateCache::default();
    let markup = preprocess("<p>{a}</p>");
    let first = cache.get(&markup);
    let again = cache.get(&markup);
    assert_eq!(first.len(), 1);
    assert!(std::rc::Rc::ptr_eq(&first, &again));
}

// ============================================================================
// MALFORMED INPUT
// ============================================================================

#[test]
fn test_unclosed_tags() {
    let nodes = parse("<div><p><span>text");
    assert_eq!(tags(&nodes), vec!["div"]);
}

#[test]
fn test_empty_and_whitespace() {
    assert!(parse("").is_empty());
    assert!(parse("  \n  ").is_empty());
}
