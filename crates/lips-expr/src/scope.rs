//! Scope chain
//!
//! Name resolution order: local frames (innermost first), then the host
//! names, then `scope` (an object of every local binding). Globals are
//! resolved by the interpreter after the scope has had its say.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::EvalError;
use crate::value::{Object, Value};

/// Names provided by the embedding component
///
/// For Lips these are `self`, `input`, `state`, `static` and `context`.
pub trait Host {
    /// Value bound to a host name
    fn get(&self, name: &str) -> Option<Value>;

    /// Write `value` at `path` below the host name `name`
    fn assign(&self, name: &str, path: &[Value], value: Value) -> Result<(), EvalError>;
}

struct Frame {
    vars: RefCell<Object>,
    parent: Option<Rc<Frame>>,
}

/// Expression scope
///
/// Cheap to clone; extending creates a new frame and never mutates the
/// frames it is built on.
#[derive(Clone, Default)]
pub struct Scope {
    frame: Option<Rc<Frame>>,
    host: Option<Rc<dyn Host>>,
}

impl Scope {
    /// Empty scope with no host
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty scope resolving host names through `host`
    pub fn with_host(host: Rc<dyn Host>) -> Self {
        Self { frame: None, host: Some(host) }
    }

    pub fn host(&self) -> Option<&Rc<dyn Host>> {
        self.host.as_ref()
    }

    /// New scope with `bindings` layered on top
    pub fn extend<K: Into<String>>(&self, bindings: impl IntoIterator<Item = (K, Value)>) -> Scope {
        let vars: Object = bindings.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Scope {
            frame: Some(Rc::new(Frame {
                vars: RefCell::new(vars),
                parent: self.frame.clone(),
            })),
            host: self.host.clone(),
        }
    }

    /// New scope with a single binding layered on top
    pub fn with(&self, name: &str, value: Value) -> Scope {
        self.extend([(name, value)])
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.frame.as_deref(), |f| f.parent.as_deref())
    }

    /// Innermost local binding of `name`
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.frames().find_map(|f| f.vars.borrow().get(name).cloned())
    }

    /// Resolve a name through locals, host names and `scope`
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.get_local(name) {
            return Some(value);
        }
        if let Some(value) = self.host.as_ref().and_then(|h| h.get(name)) {
            return Some(value);
        }
        if name == "scope" {
            return Some(Value::from(self.locals()));
        }
        None
    }

    /// Every visible local binding, inner bindings shadowing outer ones
    pub fn locals(&self) -> Object {
        let frames: Vec<&Frame> = self.frames().collect();
        let mut out = Object::new();
        for frame in frames.into_iter().rev() {
            for (k, v) in frame.vars.borrow().iter() {
                out.insert(k.clone(), v.clone());
            }
        }
        out
    }

    /// Assign through the chain: the innermost local holding `name`, else
    /// the host
    pub fn assign(&self, name: &str, path: &[Value], value: Value) -> Result<(), EvalError> {
        for frame in self.frames() {
            let mut vars = frame.vars.borrow_mut();
            if let Some(slot) = vars.get_mut(name) {
                return slot.set_path(path, value);
            }
        }

        match &self.host {
            Some(host) if host.get(name).is_some() => host.assign(name, path, value),
            _ if path.is_empty() => Err(EvalError::Reference(name.to_string())),
            _ => Err(EvalError::ReadOnly(name.to_string())),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("locals", &self.locals())
            .field("host", &self.host.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StateHost(RefCell<Value>);

    impl Host for StateHost {
        fn get(&self, name: &str) -> Option<Value> {
            match name {
                "state" => Some(self.0.borrow().clone()),
                "input" => Some(Value::empty_object()),
                _ => None,
            }
        }

        fn assign(&self, name: &str, path: &[Value], value: Value) -> Result<(), EvalError> {
            match name {
                "state" => self.0.borrow_mut().set_path(path, value),
                other => Err(EvalError::ReadOnly(other.to_string())),
            }
        }
    }

    #[test]
    fn test_shadowing() {
        let outer = Scope::new().extend([("a", Value::from(1)), ("b", Value::from(2))]);
        let inner = outer.with("a", Value::from(10));

        assert_eq!(inner.lookup("a"), Some(Value::from(10)));
        assert_eq!(inner.lookup("b"), Some(Value::from(2)));
        assert_eq!(outer.lookup("a"), Some(Value::from(1)));
        assert_eq!(inner.locals().get("a"), Some(&Value::from(10)));
        assert_eq!(inner.lookup("scope").unwrap().get("b"), Value::from(2));
    }

    #[test]
    fn test_assign_local_innermost() {
        let outer = Scope::new().with("n", Value::from(1));
        let inner = outer.with("n", Value::from(2));
        inner.assign("n", &[], Value::from(3)).unwrap();
        assert_eq!(inner.lookup("n"), Some(Value::from(3)));
        assert_eq!(outer.lookup("n"), Some(Value::from(1)));
    }

    #[test]
    fn test_assign_host() {
        let host = Rc::new(StateHost(RefCell::new(Value::object([("count", Value::from(0))]))));
        let scope = Scope::with_host(host.clone());

        scope.assign("state", &["count".into()], Value::from(5)).unwrap();
        assert_eq!(host.0.borrow().get("count"), Value::from(5));

        assert!(matches!(scope.assign("input", &["x".into()], Value::Null), Err(EvalError::ReadOnly(_))));
        assert!(matches!(scope.assign("nope", &[], Value::Null), Err(EvalError::Reference(_))));
    }
}
