//! Template preprocessor
//!
//! Rewrites the dialect's shorthand into HTML that html5ever understands:
//!
//! - `<if(expr)>` → `<if by="expr">` (likewise `else-if`, `switch`)
//! - `<case(values)>` → `<case is="values">`
//! - `<for(expr)>` → `<for in="expr">`
//! - `<async(expr)>` → `<async await="expr">`
//! - `<x .../>` → `<x ...></x>` for every non-void tag
//!
//! Everything else is copied through untouched.

use lips_dom::VOID_ELEMENTS;

/// Shorthand tag → attribute receiving the parenthesized expression
const SHORTHAND: &[(&str, &str)] = &[
    ("if", "by"),
    ("else-if", "by"),
    ("switch", "by"),
    ("case", "is"),
    ("for", "in"),
    ("async", "await"),
];

/// Elements whose content is not markup
const RAW_TEXT: &[&str] = &["style", "script"];

/// Rewrite shorthand directive syntax into plain HTML
pub fn preprocess(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len() + 16);
    let mut rest = markup;

    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(after) = rest.strip_prefix("<!--") {
            let end = after.find("-->").map(|i| i + 3).unwrap_or(after.len());
            out.push_str(&rest[..4 + end]);
            rest = &after[end..];
            continue;
        }

        let name_len = rest[1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'))
            .unwrap_or(rest.len() - 1);
        let starts_with_letter = rest[1..].starts_with(|c: char| c.is_ascii_alphabetic());
        if name_len == 0 || !starts_with_letter {
            out.push('<');
            rest = &rest[1..];
            continue;
        }

        let name = &rest[1..1 + name_len];
        let tag = name.to_ascii_lowercase();
        out.push('<');
        out.push_str(name);
        rest = &rest[1 + name_len..];

        if rest.starts_with('(') {
            if let Some(attr) = shorthand_attr(&tag) {
                if let Some(len) = balanced_parens(rest) {
                    out.push(' ');
                    out.push_str(attr);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(&rest[1..len - 1]));
                    out.push('"');
                    rest = &rest[len..];
                }
            }
        }

        let Some((body_len, self_closing)) = scan_tag_rest(rest) else {
            // unterminated tag, leave it to the parser
            out.push_str(rest);
            rest = "";
            break;
        };

        if self_closing && !VOID_ELEMENTS.contains(&tag.as_str()) {
            let body = rest[..body_len - 2].trim_end();
            out.push_str(body);
            out.push_str("></");
            out.push_str(name);
            out.push('>');
        } else {
            out.push_str(&rest[..body_len]);
        }
        rest = &rest[body_len..];

        if RAW_TEXT.contains(&tag.as_str()) && !self_closing {
            let close = format!("</{}", tag);
            let end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
            out.push_str(&rest[..end]);
            rest = &rest[end..];
        }
    }

    out.push_str(rest);
    out
}

fn shorthand_attr(tag: &str) -> Option<&'static str> {
    SHORTHAND.iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, attr)| *attr)
}

/// Length of the parenthesized group at the start of `input`, quotes respected
fn balanced_parens(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Scan attributes up to the closing `>`; returns the length including it
/// and whether the tag ended with `/>`
fn scan_tag_rest(input: &str) -> Option<(usize, bool)> {
    let mut quote: Option<char> = None;
    let mut prev = '\0';

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            prev = c;
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '>' => return Some((i + 1, prev == '/')),
            _ => {}
        }
        prev = c;
    }
    None
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_directives() {
        assert_eq!(preprocess("<if(count > 1)>x</if>"), "<if by=\"count > 1\">x</if>");
        assert_eq!(preprocess("<else-if(a)>y</else-if>"), "<else-if by=\"a\">y</else-if>");
        assert_eq!(preprocess("<for(items)>z</for>"), "<for in=\"items\">z</for>");
        assert_eq!(preprocess("<case(1, 2)></case>"), "<case is=\"1, 2\"></case>");
        assert_eq!(preprocess("<async(load, id)></async>"), "<async await=\"load, id\"></async>");
    }

    #[test]
    fn test_shorthand_quotes_and_nested_parens() {
        assert_eq!(
            preprocess("<if(f(\"a)\") && b)>"),
            "<if by=\"f(&quot;a)&quot;) &amp;&amp; b\">"
        );
    }

    #[test]
    fn test_self_closing_expansion() {
        assert_eq!(preprocess("<card title=\"x\"/>"), "<card title=\"x\"></card>");
        assert_eq!(preprocess("<let a=\"1\" />after"), "<let a=\"1\"></let>after");
        assert_eq!(preprocess("<br/>"), "<br/>");
        assert_eq!(preprocess("<p title=\"a/>b\">t</p>"), "<p title=\"a/>b\">t</p>");
    }

    #[test]
    fn test_passthrough() {
        let src = "a < b <!-- <if(x)/> --> </div> <style>a>b{}</style>";
        assert_eq!(preprocess(src), src);
    }
}
