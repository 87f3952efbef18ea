//! DOM events
//!
//! Listeners are plain callbacks stored in the tree. Dispatch collects the
//! listeners of the target and its ancestors first, then calls them with no
//! borrow of the DOM held, so a listener may freely mutate the tree. A
//! listener removed by an earlier handler of the same dispatch is skipped.

use std::rc::Rc;

use crate::{NodeId, SharedDom};

/// Event listener callback
pub type Listener = Rc<dyn Fn(&DomEvent)>;

/// Handle returned by [`crate::Dom::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub(crate) u64);

/// Event passed to listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    /// Event type ("click", "input", ...)
    pub event_type: String,
    /// Node the event was dispatched on
    pub target: NodeId,
    /// Node whose listener is currently running
    pub current_target: NodeId,
}

/// Dispatch an event on `target`, bubbling to its ancestors
///
/// Returns the number of listeners invoked.
pub fn dispatch_event(dom: &SharedDom, target: NodeId, event_type: &str) -> usize {
    let path: Vec<(NodeId, Vec<(ListenerId, Listener)>)> = {
        let dom = dom.borrow();
        let mut path = Vec::new();
        let mut current = Some(target).filter(|&n| dom.contains(n));
        while let Some(node) = current {
            path.push((node, dom.listeners(node, event_type)));
            current = dom.parent(node);
        }
        path
    };

    let mut invoked = 0;
    for (node, listeners) in path {
        let event = DomEvent {
            event_type: event_type.to_string(),
            target,
            current_target: node,
        };
        for (id, listener) in listeners {
            // an earlier handler may have removed it, or freed its node
            if !dom.borrow().has_listener(id) {
                continue;
            }
            listener(&event);
            invoked += 1;
        }
    }

    tracing::trace!(event = event_type, %target, invoked, "dispatched");
    invoked
}
