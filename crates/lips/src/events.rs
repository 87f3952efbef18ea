//! Component event bus
//!
//! Separate from DOM listeners: components emit named events with a payload
//! and whoever subscribed (usually the parent, through `on-*` attributes on
//! the component tag) gets called in subscription order.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use lips_expr::Value;

/// Event callback
pub type EventCallback = Rc<dyn Fn(&[Value])>;

/// Subscription handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    event: String,
    callback: EventCallback,
}

/// Named event bus
#[derive(Default)]
pub struct EventBus {
    next_id: Cell<u64>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `event`
    pub fn on(&self, event: &str, callback: EventCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscriptions.borrow_mut().push(Subscription {
            id,
            event: event.to_string(),
            callback,
        });
        id
    }

    /// Remove one subscription
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscriptions.borrow_mut();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    /// Remove every subscription to `event`
    pub fn off_event(&self, event: &str) -> usize {
        let mut subs = self.subscriptions.borrow_mut();
        let before = subs.len();
        subs.retain(|s| s.event != event);
        before - subs.len()
    }

    /// Call every subscriber of `event`; returns how many ran
    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        let callbacks: Vec<EventCallback> = self.subscriptions.borrow()
            .iter()
            .filter(|s| s.event == event)
            .map(|s| s.callback.clone())
            .collect();
        for callback in &callbacks {
            callback(args);
        }
        callbacks.len()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.subscriptions.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_in_order() {
        let bus = EventBus::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let (a, b) = (log.clone(), log.clone());
        bus.on("save", Rc::new(move |args| a.borrow_mut().push(format!("a:{}", args[0]))));
        bus.on("save", Rc::new(move |_| b.borrow_mut().push("b".to_string())));
        bus.on("other", Rc::new(|_| panic!("wrong event")));

        assert_eq!(bus.emit("save", &[Value::from(1)]), 2);
        assert_eq!(*log.borrow(), vec!["a:1", "b"]);
    }

    #[test]
    fn test_off() {
        let bus = EventBus::new();
        let id = bus.on("x", Rc::new(|_| {}));
        bus.on("y", Rc::new(|_| {}));
        bus.on("y", Rc::new(|_| {}));

        assert!(bus.off(id));
        assert!(!bus.off(id));
        assert_eq!(bus.off_event("y"), 2);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_subscribe_during_emit() {
        let bus = Rc::new(EventBus::new());
        let inner = bus.clone();
        bus.on("go", Rc::new(move |_| {
            inner.on("go", Rc::new(|_| {}));
        }));

        assert_eq!(bus.emit("go", &[]), 1);
        assert_eq!(bus.len(), 2);
    }
}
