//! Parsed template cache
//!
//! Components keep their preprocessed markup; re-rendering (e.g. after a
//! language switch) only costs a lookup here.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::{ParseOptions, TemplateNode, TemplateParser};

/// Cache of parsed templates keyed by preprocessed markup
#[derive(Debug, Default)]
pub struct TemplateCache {
    parser: TemplateParser,
    entries: RefCell<HashMap<String, Rc<[TemplateNode]>>>,
}

impl TemplateCache {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            parser: TemplateParser::new(options),
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Parsed tree for `markup`, parsing on first use
    pub fn get(&self, markup: &str) -> Rc<[TemplateNode]> {
        if let Some(nodes) = self.entries.borrow().get(markup) {
            return nodes.clone();
        }

        tracing::debug!(len = markup.len(), "template cache miss");
        let nodes: Rc<[TemplateNode]> = self.parser.parse(markup).into();
        self.entries.borrow_mut().insert(markup.to_string(), nodes.clone());
        nodes
    }

    /// Number of cached templates
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Drop all cached templates
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_shares_tree() {
        let cache = TemplateCache::default();
        let a = cache.get("<p>x</p>");
        let b = cache.get("<p>x</p>");
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        cache.get("<p>y</p>");
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
