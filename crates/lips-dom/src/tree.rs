//! DOM Tree (arena-based allocation)
//!
//! Nodes are stored in slots; removing a node frees its slot for reuse and
//! bumps the slot generation so stale [`NodeId`]s stop resolving.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::node::{ElementData, Node, NodeData, NodeKind};
use crate::{Dom, DomError, DomResult, Listener, ListenerId, NodeId, SharedDom};

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

struct ListenerEntry {
    node: NodeId,
    event_type: String,
    listener: Listener,
}

/// Arena-based DOM tree
pub struct DomTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    document: NodeId,
    // BTreeMap keeps registration order for dispatch
    listeners: BTreeMap<u64, ListenerEntry>,
    next_listener: u64,
}

impl DomTree {
    /// Create a document with the basic `html`/`head`/`body` structure
    pub fn new() -> Self {
        let mut tree = Self::empty();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        tree.link(tree.document, html, NodeId::NONE);
        tree.link(html, head, NodeId::NONE);
        tree.link(html, body, NodeId::NONE);

        tree
    }

    /// Create a document with no structure
    pub fn empty() -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            document: NodeId::NONE,
            listeners: BTreeMap::new(),
            next_listener: 1,
        };
        tree.document = tree.alloc(NodeData::Document);
        tree
    }

    /// Wrap into the shared handle used by the runtime
    pub fn into_shared(self) -> SharedDom {
        Rc::new(RefCell::new(self))
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_ref()
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.node.as_mut()
    }

    /// Number of live nodes (the document node included)
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if tree only holds the document node
    pub fn is_empty(&self) -> bool {
        self.live <= 1
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node::new(data);
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, node: Some(node) });
            NodeId { index, generation: 0 }
        }
    }

    fn release(&mut self, id: NodeId) {
        if let Some(slot) = self.slots.get_mut(id.index as usize) {
            if slot.generation == id.generation && slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                self.live -= 1;
            }
        }
    }

    /// Unlink a node from its parent and siblings
    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(node) => (node.parent, node.prev_sibling, node.next_sibling),
            None => return,
        };

        if parent.is_valid() {
            if prev.is_valid() {
                if let Some(p) = self.get_mut(prev) {
                    p.next_sibling = next;
                }
            } else if let Some(p) = self.get_mut(parent) {
                p.first_child = next;
            }

            if next.is_valid() {
                if let Some(n) = self.get_mut(next) {
                    n.prev_sibling = prev;
                }
            } else if let Some(p) = self.get_mut(parent) {
                p.last_child = prev;
            }
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = NodeId::NONE;
            node.prev_sibling = NodeId::NONE;
            node.next_sibling = NodeId::NONE;
        }
    }

    /// Link an unlinked node under `parent`, before `reference` (NONE appends)
    fn link(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        let prev = if reference.is_valid() {
            self.get(reference).map(|n| n.prev_sibling).unwrap_or(NodeId::NONE)
        } else {
            self.get(parent).map(|n| n.last_child).unwrap_or(NodeId::NONE)
        };

        if let Some(node) = self.get_mut(child) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = reference;
        }

        if prev.is_valid() {
            if let Some(p) = self.get_mut(prev) {
                p.next_sibling = child;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.first_child = child;
        }

        if reference.is_valid() {
            if let Some(r) = self.get_mut(reference) {
                r.prev_sibling = child;
            }
        } else if let Some(p) = self.get_mut(parent) {
            p.last_child = child;
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while current.is_valid() {
            if current == ancestor {
                return true;
            }
            current = self.get(current).map(|n| n.parent).unwrap_or(NodeId::NONE);
        }
        false
    }

    fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = vec![root];
        out.extend(self.descendants(root));
        out
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DomTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomTree")
            .field("live", &self.live)
            .field("slots", &self.slots.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Dom for DomTree {
    fn document(&self) -> NodeId {
        self.document
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData::new(tag)))
    }

    fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(NodeData::Text(content.to_string()))
    }

    fn create_comment(&mut self, content: &str) -> NodeId {
        self.alloc(NodeData::Comment(content.to_string()))
    }

    fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeData::Fragment)
    }

    fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.get(node).map(Node::kind)
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.get(node)?.as_element().map(|e| e.tag.as_str())
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node)?.as_element()?.get_attr(name)
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.get(node)
            .and_then(Node::as_element)
            .map(|e| e.attrs.iter().map(|a| (a.name.clone(), a.value.clone())).collect())
            .unwrap_or_default()
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        self.get(node)?.as_text()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.get(node)?.parent;
        parent.is_valid().then_some(parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(node).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        while current.is_valid() {
            out.push(current);
            current = self.get(current).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
        }
        out
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        let node = self.get_mut(node).ok_or(DomError::NotFound)?;
        let elem = node.as_element_mut().ok_or(DomError::InvalidNodeType)?;
        elem.set_attr(name, value);
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<bool> {
        let node = self.get_mut(node).ok_or(DomError::NotFound)?;
        let elem = node.as_element_mut().ok_or(DomError::InvalidNodeType)?;
        Ok(elem.remove_attr(name))
    }

    fn set_text(&mut self, node: NodeId, content: &str) -> DomResult<()> {
        let kind = self.kind(node).ok_or(DomError::NotFound)?;
        match kind {
            NodeKind::Text | NodeKind::Comment => {
                if let Some(n) = self.get_mut(node) {
                    match &mut n.data {
                        NodeData::Text(t) | NodeData::Comment(t) => *t = content.to_string(),
                        _ => {}
                    }
                }
                Ok(())
            }
            NodeKind::Document => Err(DomError::InvalidNodeType),
            NodeKind::Element | NodeKind::Fragment => {
                for child in self.children(node) {
                    self.remove(child)?;
                }
                if !content.is_empty() {
                    let text = self.create_text(content);
                    self.link(node, text, NodeId::NONE);
                }
                Ok(())
            }
        }
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> DomResult<()> {
        let parent_kind = self.kind(parent).ok_or(DomError::NotFound)?;
        let child_kind = self.kind(child).ok_or(DomError::NotFound)?;

        if !parent_kind.is_container() || child_kind == NodeKind::Document {
            return Err(DomError::InvalidNodeType);
        }
        if self.is_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest);
        }

        let reference = match reference {
            Some(r) => {
                let node = self.get(r).ok_or(DomError::NotFound)?;
                if node.parent != parent {
                    return Err(DomError::NotAChild);
                }
                if r == child {
                    return Ok(());
                }
                r
            }
            None => NodeId::NONE,
        };

        self.unlink(child);
        self.link(parent, child, reference);
        Ok(())
    }

    fn detach(&mut self, node: NodeId) -> DomResult<()> {
        if !self.contains(node) {
            return Err(DomError::NotFound);
        }
        self.unlink(node);
        Ok(())
    }

    fn remove(&mut self, node: NodeId) -> DomResult<()> {
        match self.kind(node) {
            None => return Err(DomError::NotFound),
            Some(NodeKind::Document) => return Err(DomError::InvalidNodeType),
            Some(_) => {}
        }

        self.unlink(node);
        let doomed = self.subtree(node);
        self.listeners.retain(|_, entry| !doomed.contains(&entry.node));
        for id in doomed {
            self.release(id);
        }
        Ok(())
    }

    fn add_listener(&mut self, node: NodeId, event_type: &str, listener: Listener) -> DomResult<ListenerId> {
        if !self.contains(node) {
            return Err(DomError::NotFound);
        }
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.insert(id, ListenerEntry {
            node,
            event_type: event_type.to_string(),
            listener,
        });
        Ok(ListenerId(id))
    }

    fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id.0).is_some()
    }

    fn listeners(&self, node: NodeId, event_type: &str) -> Vec<(ListenerId, Listener)> {
        self.listeners.iter()
            .filter(|(_, e)| e.node == node && e.event_type == event_type)
            .map(|(&id, e)| (ListenerId(id), e.listener.clone()))
            .collect()
    }

    fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id.0)
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn node_count(&self) -> usize {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DomEvent;

    #[test]
    fn test_document_structure() {
        let tree = DomTree::new();
        assert_eq!(tree.len(), 4);
        assert!(tree.head().is_some());
        assert!(tree.body().is_some());
    }

    #[test]
    fn test_append_and_insert_before() {
        let mut tree = DomTree::new();
        let body = tree.body().unwrap();

        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");

        tree.append_child(body, a).unwrap();
        tree.append_child(body, c).unwrap();
        tree.insert_before(body, b, Some(c)).unwrap();

        assert_eq!(tree.children(body), vec![a, b, c]);
        assert_eq!(tree.parent(b), Some(body));
    }

    #[test]
    fn test_move_between_parents() {
        let mut tree = DomTree::new();
        let body = tree.body().unwrap();
        let frag = tree.create_fragment();
        let p = tree.create_element("p");

        tree.append_child(frag, p).unwrap();
        tree.append_child(body, p).unwrap();

        assert!(tree.children(frag).is_empty());
        assert_eq!(tree.children(body), vec![p]);
    }

    #[test]
    fn test_remove_frees_subtree() {
        let mut tree = DomTree::new();
        let body = tree.body().unwrap();
        let div = tree.create_element("div");
        let text = tree.create_text("hello");
        tree.append_child(div, text).unwrap();
        tree.append_child(body, div).unwrap();

        let before = tree.len();
        tree.remove(div).unwrap();

        assert_eq!(tree.len(), before - 2);
        assert!(!tree.contains(div));
        assert!(!tree.contains(text));
        assert_eq!(tree.remove(div), Err(DomError::NotFound));
    }

    #[test]
    fn test_stale_id_does_not_alias_reused_slot() {
        let mut tree = DomTree::new();
        let old = tree.create_element("span");
        tree.remove(old).unwrap();

        let new = tree.create_element("em");
        assert_eq!(old.index(), new.index());
        assert!(tree.tag_name(old).is_none());
        assert_eq!(tree.tag_name(new), Some("em"));
    }

    #[test]
    fn test_hierarchy_errors() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("div");
        tree.append_child(outer, inner).unwrap();

        assert_eq!(tree.append_child(inner, outer), Err(DomError::HierarchyRequest));

        let text = tree.create_text("x");
        assert_eq!(tree.append_child(text, inner), Err(DomError::InvalidNodeType));

        let stranger = tree.create_element("p");
        let other = tree.create_element("p");
        assert_eq!(tree.insert_before(outer, other, Some(stranger)), Err(DomError::NotAChild));
    }

    #[test]
    fn test_set_text_replaces_children() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let span = tree.create_element("span");
        tree.append_child(div, span).unwrap();

        tree.set_text(div, "plain").unwrap();
        assert_eq!(tree.children(div).len(), 1);
        assert_eq!(tree.text_content(div), "plain");
        assert!(!tree.contains(span));
    }

    #[test]
    fn test_listeners_dropped_with_node() {
        let mut tree = DomTree::new();
        let button = tree.create_element("button");
        tree.add_listener(button, "click", Rc::new(|_: &DomEvent| {})).unwrap();
        assert_eq!(tree.listener_count(), 1);

        tree.remove(button).unwrap();
        assert_eq!(tree.listener_count(), 0);
    }
}
