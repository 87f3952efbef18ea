//! DOM abstraction
//!
//! The handful of operations the renderer needs: node creation, attribute
//! get/set, child insertion and removal, listener registration and queries.
//! Queries and serialization are provided on top of the required methods.

use std::cell::RefCell;
use std::rc::Rc;

use crate::{Listener, ListenerId, NodeId, NodeKind, Selector};
use crate::serialize;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found (never existed or already removed)
    #[error("node not found")]
    NotFound,
    /// Hierarchy error (e.g., inserting an ancestor into its descendant)
    #[error("hierarchy request error")]
    HierarchyRequest,
    /// Operation not valid for this node type
    #[error("invalid node type")]
    InvalidNodeType,
    /// Reference node is not a child of the given parent
    #[error("node is not a child of the given parent")]
    NotAChild,
}

/// DOM shared between the components of one runtime
pub type SharedDom = Rc<RefCell<dyn Dom>>;

/// Minimal DOM interface
pub trait Dom {
    /// Document root
    fn document(&self) -> NodeId;

    /// Create a detached element
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Create a detached text node
    fn create_text(&mut self, content: &str) -> NodeId;

    /// Create a detached comment node
    fn create_comment(&mut self, content: &str) -> NodeId;

    /// Create an empty fragment container
    fn create_fragment(&mut self) -> NodeId;

    /// Whether the id refers to a live node
    fn contains(&self, node: NodeId) -> bool;

    /// Kind of a live node
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// Lowercase tag name of an element
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    /// Attribute value of an element
    fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// All attributes of an element, in order
    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;

    /// Character data of a text or comment node
    fn text(&self, node: NodeId) -> Option<&str>;

    /// Parent of a node
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Children of a node, in order
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Set an attribute on an element
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()>;

    /// Remove an attribute; `Ok(false)` when it was not present
    fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<bool>;

    /// Replace the content of a node with text
    ///
    /// Containers lose all children and get a single text child, text and
    /// comment nodes get their data replaced.
    fn set_text(&mut self, node: NodeId, content: &str) -> DomResult<()>;

    /// Append a child, moving it from its current parent
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert a child before `reference` (append when `None`)
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()>;

    /// Unlink a node from its parent, keeping it alive
    fn detach(&mut self, node: NodeId) -> DomResult<()>;

    /// Unlink a node and free it with its whole subtree and listeners
    fn remove(&mut self, node: NodeId) -> DomResult<()>;

    /// Register an event listener on a node
    fn add_listener(&mut self, node: NodeId, event_type: &str, listener: Listener) -> DomResult<ListenerId>;

    /// Remove a listener; false when it was already gone
    fn remove_listener(&mut self, id: ListenerId) -> bool;

    /// Listeners registered on a node for an event type, in registration order
    fn listeners(&self, node: NodeId, event_type: &str) -> Vec<(ListenerId, Listener)>;

    /// Whether a listener is still registered
    fn has_listener(&self, id: ListenerId) -> bool;

    /// Number of registered listeners
    fn listener_count(&self) -> usize;

    /// Number of live nodes, the document included
    fn node_count(&self) -> usize;

    /// First element child of the document with the given tag
    fn document_child(&self, tag: &str) -> Option<NodeId> {
        self.query_selector(self.document(), tag)
    }

    /// `<head>` element, if the document has one
    fn head(&self) -> Option<NodeId> {
        self.document_child("head")
    }

    /// `<body>` element, if the document has one
    fn body(&self) -> Option<NodeId> {
        self.document_child("body")
    }

    /// All descendants of `root` in document order (root excluded)
    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).into_iter().rev());
        }
        out
    }

    /// Concatenated text of a subtree
    fn text_content(&self, node: NodeId) -> String {
        match self.kind(node) {
            Some(NodeKind::Text) => self.text(node).unwrap_or_default().to_string(),
            Some(NodeKind::Comment) | None => String::new(),
            Some(_) => self.descendants(node)
                .into_iter()
                .filter(|&n| self.kind(n) == Some(NodeKind::Text))
                .filter_map(|n| self.text(n))
                .collect(),
        }
    }

    /// Check if an element matches a selector
    fn matches(&self, node: NodeId, selector: &str) -> bool {
        Selector::parse(selector)
            .map(|s| s.matches(self, node))
            .unwrap_or(false)
    }

    /// First descendant of `root` matching a selector
    fn query_selector(&self, root: NodeId, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector)?;
        self.descendants(root)
            .into_iter()
            .find(|&n| selector.matches(self, n))
    }

    /// All descendants of `root` matching a selector
    fn query_selector_all(&self, root: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        self.descendants(root)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }

    /// Serialize a node and its subtree
    fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        serialize::write_node(self, node, &mut out);
        out
    }

    /// Serialize the children of a node
    fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            serialize::write_node(self, child, &mut out);
        }
        out
    }
}
