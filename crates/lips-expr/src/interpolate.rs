//! Text interpolation and list splitting
//!
//! Both scanners skip over string literals and nested brackets so braces or
//! commas inside `'...'`, `"..."` and template literals are never treated as
//! delimiters.

use crate::scope::Scope;

/// Piece of an interpolated text node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextPart<'a> {
    Literal(&'a str),
    /// Expression source between the braces
    Expr(&'a str),
}

/// Byte offset just past the quote closing the literal opened at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Position of the `}` matching the `{` at `open`
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split text into literal runs and `{expr}` sources
///
/// An unbalanced `{` leaves the rest of the text literal.
pub fn split_interpolations(text: &str) -> Vec<TextPart<'_>> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'{' {
            i += 1;
            continue;
        }
        let Some(close) = matching_brace(bytes, i) else { break };
        if i > literal_start {
            parts.push(TextPart::Literal(&text[literal_start..i]));
        }
        parts.push(TextPart::Expr(&text[i + 1..close]));
        i = close + 1;
        literal_start = i;
    }

    if literal_start < text.len() {
        parts.push(TextPart::Literal(&text[literal_start..]));
    }
    parts
}

/// Whether the text contains at least one `{expr}` segment
pub fn has_interpolation(text: &str) -> bool {
    split_interpolations(text).iter().any(|p| matches!(p, TextPart::Expr(_)))
}

/// Replace every `{expr}` with its evaluated display string
pub fn interpolate(text: &str, scope: &Scope) -> String {
    let mut out = String::with_capacity(text.len());
    for part in split_interpolations(text) {
        match part {
            TextPart::Literal(s) => out.push_str(s),
            TextPart::Expr(src) => out.push_str(&crate::evaluate(src, scope).to_display()),
        }
    }
    out
}

/// Split on `sep` at bracket depth zero, trimming each piece
///
/// Empty input yields no pieces.
pub fn split_top_level(source: &str, sep: char) -> Vec<&str> {
    if source.trim().is_empty() {
        return Vec::new();
    }

    let bytes = source.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => {
                i = skip_string(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b if depth == 0 && sep.is_ascii() && b == sep as u8 => {
                parts.push(source[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(source[start..].trim());
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_split_interpolations() {
        assert_eq!(split_interpolations("a {b} c"), vec![
            TextPart::Literal("a "),
            TextPart::Expr("b"),
            TextPart::Literal(" c"),
        ]);
        assert_eq!(split_interpolations("{ {x: 1}.x }"), vec![TextPart::Expr(" {x: 1}.x ")]);
        assert_eq!(split_interpolations("{'}'}"), vec![TextPart::Expr("'}'")]);
        assert_eq!(split_interpolations("open { only"), vec![TextPart::Literal("open { only")]);
        assert!(!has_interpolation("plain"));
    }

    #[test]
    fn test_interpolate() {
        let scope = Scope::new().with("name", Value::from("Ada")).with("n", Value::from(2));
        assert_eq!(interpolate("Hi {name}, {n + 1} items", &scope), "Hi Ada, 3 items");
        assert_eq!(interpolate("{[1, 2]}", &scope), "1,2");
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("fetch, 'a,b', [1, 2], f(x, y)", ','), vec![
            "fetch", "'a,b'", "[1, 2]", "f(x, y)",
        ]);
        assert_eq!(split_top_level("single", ','), vec!["single"]);
        assert!(split_top_level("   ", ',').is_empty());
    }
}
