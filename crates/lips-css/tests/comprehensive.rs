//! Scoping tests for lips-css

use lips_css::{scope_stylesheet, CssScoper};

fn scoped(css: &str) -> String {
    scope_stylesheet(css, "lips-scope", "card-1").unwrap().css
}

#[test]
fn test_empty_stylesheet() {
    let out = scope_stylesheet("", "lips-scope", "x").unwrap();
    assert_eq!(out.scope_id, "x");
    assert!(!out.css.contains("color"));
}

#[test]
fn test_every_selector_is_prefixed() {
    let out = scoped("h1, h2 { margin: 0; } .title { color: blue; }");
    for selector in ["h1", "h2", ".title"] {
        let line = out.lines().find(|l| l.contains(selector)).unwrap();
        assert!(line.contains("lips-scope"), "unscoped selector in {line:?}");
    }
}

#[test]
fn test_nested_rules_flattened() {
    let out = scoped(".card { padding: 1px; & .body { color: red; } }");
    assert!(out.contains(".card .body"));
    assert!(!out.contains('&'));
}

#[test]
fn test_media_query_kept() {
    let out = scoped("@media (max-width: 600px) { p { display: none; } }");
    assert!(out.contains("@media"));
    assert!(out.contains("lips-scope"));
}

#[test]
fn test_custom_attribute() {
    let scoper = CssScoper::new("data-scope");
    assert_eq!(scoper.attribute(), "data-scope");
    let out = scoper.scope("p { color: red; }", "a").unwrap();
    assert!(out.css.contains("data-scope"));
}

#[test]
fn test_parse_error_reported() {
    let err = scope_stylesheet("p { color: red; } }", "lips-scope", "x").unwrap_err();
    assert!(err.to_string().starts_with("Parse error"));
}
