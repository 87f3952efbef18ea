//! Promise Implementation
//!
//! Single-threaded settle-once cell. Callbacks registered with
//! [`Promise::then`] run synchronously when the promise settles, or right
//! away if it already has.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Promise state
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

type Callback = Box<dyn FnOnce(Result<Value, Value>)>;

struct Inner {
    state: PromiseState,
    callbacks: Vec<Callback>,
}

/// Shared promise handle
#[derive(Clone)]
pub struct Promise(Rc<RefCell<Inner>>);

impl Promise {
    /// Create a pending promise and the resolver that settles it
    pub fn pending() -> (Promise, Deferred) {
        let promise = Promise(Rc::new(RefCell::new(Inner {
            state: PromiseState::Pending,
            callbacks: Vec::new(),
        })));
        (promise.clone(), Deferred(promise))
    }

    pub fn resolved(value: Value) -> Promise {
        let (promise, deferred) = Promise::pending();
        deferred.resolve(value);
        promise
    }

    pub fn rejected(reason: Value) -> Promise {
        let (promise, deferred) = Promise::pending();
        deferred.reject(reason);
        promise
    }

    /// Snapshot of the current state
    pub fn state(&self) -> PromiseState {
        self.0.borrow().state.clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.0.borrow().state, PromiseState::Pending)
    }

    /// Run `callback` with the outcome once settled
    pub fn then(&self, callback: impl FnOnce(Result<Value, Value>) + 'static) {
        let mut inner = self.0.borrow_mut();
        let outcome = match &inner.state {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(v) => Some(Ok(v.clone())),
            PromiseState::Rejected(e) => Some(Err(e.clone())),
        };
        match outcome {
            None => inner.callbacks.push(Box::new(callback)),
            Some(outcome) => {
                drop(inner);
                callback(outcome);
            }
        }
    }

    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn settle(&self, outcome: Result<Value, Value>) {
        let callbacks = {
            let mut inner = self.0.borrow_mut();
            if !matches!(inner.state, PromiseState::Pending) {
                return;
            }
            inner.state = match &outcome {
                Ok(v) => PromiseState::Fulfilled(v.clone()),
                Err(e) => PromiseState::Rejected(e.clone()),
            };
            std::mem::take(&mut inner.callbacks)
        };
        for callback in callbacks {
            callback(outcome.clone());
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Promise").field(&self.0.borrow().state).finish()
    }
}

/// Resolver half of a pending promise
///
/// Settling twice is a no-op. Resolving with another promise adopts its
/// outcome.
#[derive(Clone)]
pub struct Deferred(Promise);

impl Deferred {
    pub fn resolve(&self, value: Value) {
        match value {
            Value::Promise(inner) if !inner.ptr_eq(&self.0) => {
                let target = self.0.clone();
                inner.then(move |outcome| target.settle(outcome));
            }
            value => self.0.settle(Ok(value)),
        }
    }

    pub fn reject(&self, reason: Value) {
        self.0.settle(Err(reason));
    }

    /// The promise this resolver settles
    pub fn promise(&self) -> Promise {
        self.0.clone()
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Deferred").field(&self.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_promise_resolve() {
        let (promise, deferred) = Promise::pending();
        assert!(promise.is_pending());

        deferred.resolve(Value::Number(42.0));
        assert_eq!(promise.state(), PromiseState::Fulfilled(Value::Number(42.0)));

        deferred.reject(Value::from("late"));
        assert_eq!(promise.state(), PromiseState::Fulfilled(Value::Number(42.0)));
    }

    #[test]
    fn test_then_fires_on_settle_and_after() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (promise, deferred) = Promise::pending();

        let early = log.clone();
        promise.then(move |r| early.borrow_mut().push(("early", r)));
        assert!(log.borrow().is_empty());

        deferred.reject(Value::from("boom"));
        let late = log.clone();
        promise.then(move |r| late.borrow_mut().push(("late", r)));

        assert_eq!(*log.borrow(), vec![
            ("early", Err(Value::from("boom"))),
            ("late", Err(Value::from("boom"))),
        ]);
    }

    #[test]
    fn test_resolve_adopts_promise() {
        let (outer, outer_deferred) = Promise::pending();
        let (inner, inner_deferred) = Promise::pending();

        outer_deferred.resolve(Value::Promise(inner));
        assert!(outer.is_pending());

        inner_deferred.resolve(Value::from("done"));
        assert_eq!(outer.state(), PromiseState::Fulfilled(Value::from("done")));
    }
}
