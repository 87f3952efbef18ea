//! Selector matching
//!
//! A small subset of CSS selectors: compound selectors made of a tag, `#id`,
//! `.class`, `[attr]`, `[attr=value]` and `*`, joined by descendant or child
//! combinators, with comma-separated alternatives.

use crate::{Dom, NodeId, NodeKind};

/// Simple selector component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    /// Universal selector (*)
    Universal,
    /// Tag selector (div, span, etc.)
    Tag(String),
    /// ID selector (#id)
    Id(String),
    /// Class selector (.class)
    Class(String),
    /// Attribute presence ([attr])
    Attribute(String),
    /// Attribute value ([attr=value])
    AttributeEquals(String, String),
}

impl SimpleSelector {
    fn matches<D: Dom + ?Sized>(&self, dom: &D, node: NodeId) -> bool {
        match self {
            SimpleSelector::Universal => true,
            SimpleSelector::Tag(tag) => dom.tag_name(node) == Some(tag.as_str()),
            SimpleSelector::Id(id) => dom.get_attribute(node, "id") == Some(id.as_str()),
            SimpleSelector::Class(class) => dom.get_attribute(node, "class")
                .map(|list| list.split_whitespace().any(|c| c == class))
                .unwrap_or(false),
            SimpleSelector::Attribute(name) => dom.get_attribute(node, name).is_some(),
            SimpleSelector::AttributeEquals(name, value) => {
                dom.get_attribute(node, name) == Some(value.as_str())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// One compound selector and the combinator linking it to the previous one
#[derive(Debug, Clone, PartialEq, Eq)]
struct Compound {
    parts: Vec<SimpleSelector>,
    combinator: Combinator,
}

impl Compound {
    fn matches<D: Dom + ?Sized>(&self, dom: &D, node: NodeId) -> bool {
        dom.kind(node) == Some(NodeKind::Element) && self.parts.iter().all(|p| p.matches(dom, node))
    }
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Vec<Compound>>,
}

impl Selector {
    /// Parse a selector list; `None` when it is empty or malformed
    pub fn parse(input: &str) -> Option<Self> {
        let mut alternatives = Vec::new();
        for alt in input.split(',') {
            alternatives.push(parse_complex(alt.trim())?);
        }
        Some(Self { alternatives })
    }

    /// Check if an element matches any alternative
    pub fn matches<D: Dom + ?Sized>(&self, dom: &D, node: NodeId) -> bool {
        self.alternatives.iter().any(|chain| match_chain(dom, node, chain))
    }
}

fn match_chain<D: Dom + ?Sized>(dom: &D, node: NodeId, chain: &[Compound]) -> bool {
    let Some((last, rest)) = chain.split_last() else {
        return false;
    };
    if !last.matches(dom, node) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match last.combinator {
        Combinator::Child => match dom.parent(node) {
            Some(parent) => match_chain(dom, parent, rest),
            None => false,
        },
        Combinator::Descendant => {
            let mut current = dom.parent(node);
            while let Some(ancestor) = current {
                if match_chain(dom, ancestor, rest) {
                    return true;
                }
                current = dom.parent(ancestor);
            }
            false
        }
    }
}

fn parse_complex(input: &str) -> Option<Vec<Compound>> {
    if input.is_empty() {
        return None;
    }

    let mut chain = Vec::new();
    let mut combinator = Combinator::Descendant;
    let mut pending_child = false;

    for token in tokenize(input) {
        if token == ">" {
            if chain.is_empty() || pending_child {
                return None;
            }
            pending_child = true;
            continue;
        }
        if pending_child {
            combinator = Combinator::Child;
            pending_child = false;
        }
        chain.push(Compound { parts: parse_compound(&token)?, combinator });
        combinator = Combinator::Descendant;
    }

    if pending_child || chain.is_empty() {
        return None;
    }
    Some(chain)
}

/// Split on whitespace, keeping `>` as its own token and `[...]` intact
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;

    for c in input.chars() {
        match c {
            '[' => {
                in_brackets = true;
                current.push(c);
            }
            ']' => {
                in_brackets = false;
                current.push(c);
            }
            '>' if !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                tokens.push(">".to_string());
            }
            c if c.is_whitespace() && !in_brackets => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_compound(input: &str) -> Option<Vec<SimpleSelector>> {
    let mut parts = Vec::new();
    let mut rest = input;

    while !rest.is_empty() {
        let first = rest.chars().next()?;
        match first {
            '*' => {
                parts.push(SimpleSelector::Universal);
                rest = &rest[1..];
            }
            '#' | '.' => {
                let (name, tail) = take_ident(&rest[1..]);
                if name.is_empty() {
                    return None;
                }
                parts.push(if first == '#' {
                    SimpleSelector::Id(name.to_string())
                } else {
                    SimpleSelector::Class(name.to_string())
                });
                rest = tail;
            }
            '[' => {
                let end = rest.find(']')?;
                let body = &rest[1..end];
                parts.push(match body.split_once('=') {
                    Some((name, value)) => SimpleSelector::AttributeEquals(
                        name.trim().to_ascii_lowercase(),
                        value.trim().trim_matches(|c| c == '"' || c == '\'').to_string(),
                    ),
                    None => SimpleSelector::Attribute(body.trim().to_ascii_lowercase()),
                });
                rest = &rest[end + 1..];
            }
            _ => {
                let (name, tail) = take_ident(rest);
                if name.is_empty() {
                    return None;
                }
                parts.push(SimpleSelector::Tag(name.to_ascii_lowercase()));
                rest = tail;
            }
        }
    }

    (!parts.is_empty()).then_some(parts)
}

fn take_ident(input: &str) -> (&str, &str) {
    let end = input
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(input.len());
    input.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomTree;

    #[test]
    fn test_parse_compound() {
        let sel = Selector::parse("div.card#main[data-x=1]").unwrap();
        assert_eq!(sel.alternatives.len(), 1);
        assert_eq!(sel.alternatives[0][0].parts, vec![
            SimpleSelector::Tag("div".into()),
            SimpleSelector::Class("card".into()),
            SimpleSelector::Id("main".into()),
            SimpleSelector::AttributeEquals("data-x".into(), "1".into()),
        ]);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Selector::parse("").is_none());
        assert!(Selector::parse("> p").is_none());
        assert!(Selector::parse("div >").is_none());
        assert!(Selector::parse("a,").is_none());
    }

    #[test]
    fn test_combinators() {
        let mut dom = DomTree::new();
        let body = dom.body().unwrap();
        let section = dom.create_element("section");
        let div = dom.create_element("div");
        let p = dom.create_element("p");
        dom.set_attribute(p, "class", "note big").unwrap();
        dom.append_child(body, section).unwrap();
        dom.append_child(section, div).unwrap();
        dom.append_child(div, p).unwrap();

        assert!(dom.matches(p, "section p"));
        assert!(dom.matches(p, "div > p.note"));
        assert!(!dom.matches(p, "section > p"));
        assert!(dom.matches(p, "span, .big"));
        assert_eq!(dom.query_selector_all(body, "*").len(), 3);
    }
}
