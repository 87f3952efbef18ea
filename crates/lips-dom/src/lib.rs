//! Lips DOM - Document Object Model
//!
//! Arena-backed DOM tree used as the render target of the Lips runtime, and
//! the minimal [`Dom`] abstraction the renderer is written against.

mod node;
mod tree;
mod dom;
mod query;
mod events;
mod serialize;

pub use node::{Node, NodeData, NodeKind, ElementData, Attribute};
pub use tree::DomTree;
pub use dom::{Dom, SharedDom, DomError, DomResult};
pub use query::{Selector, SimpleSelector};
pub use events::{DomEvent, Listener, ListenerId, dispatch_event};
pub use serialize::VOID_ELEMENTS;

use std::fmt;

/// Node identifier (arena slot + slot generation)
///
/// A slot is reused after its node is removed; the generation makes ids held
/// past removal resolve to nothing instead of to the slot's new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId { index: u32::MAX, generation: 0 };

    /// Check that this is not the sentinel
    #[inline]
    pub fn is_valid(self) -> bool {
        self.index != u32::MAX
    }

    /// Arena slot index
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.index, self.generation)
    }
}
