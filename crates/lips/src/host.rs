//! Expression host
//!
//! Exposes a component to template expressions: `self`, `input`, `state`,
//! `static`, `context` and every handler method by name. Only `state` is
//! writable, and writes bypass notification; the background tick picks them
//! up.

use std::rc::Weak;

use lips_expr::{EvalError, Function, Host, Object, Value};

use crate::component::{Component, ComponentInner};

pub(crate) struct ComponentHost(pub(crate) Weak<ComponentInner>);

impl ComponentHost {
    fn component(&self) -> Option<Component> {
        self.0.upgrade().map(Component)
    }
}

impl Host for ComponentHost {
    fn get(&self, name: &str) -> Option<Value> {
        let component = self.component()?;
        match name {
            "self" => Some(self_object(&component)),
            "input" => Some(component.input()),
            "state" => Some(component.state()),
            "static" => Some(component.statics().clone()),
            "context" => Some(component.context()),
            _ => component.method(name).map(Value::Function),
        }
    }

    fn assign(&self, name: &str, path: &[Value], value: Value) -> Result<(), EvalError> {
        let component = self
            .component()
            .ok_or_else(|| EvalError::Host("component is gone".to_string()))?;
        match name {
            "state" => component.state_signal().update_silent(|state| state.set_path(path, value)),
            other => Err(EvalError::ReadOnly(other.to_string())),
        }
    }
}

/// `self` as seen by expressions: data, methods and a few component calls
fn self_object(component: &Component) -> Value {
    let mut object = Object::new();
    object.insert("name".into(), Value::from(component.name()));
    object.insert("key".into(), Value::from(component.key()));
    object.insert("input".into(), component.input());
    object.insert("state".into(), component.state());
    object.insert("static".into(), component.statics().clone());
    object.insert("context".into(), component.context());

    let weak = component.downgrade();
    object.insert("setState".into(), Value::Function(Function::new(move |args| {
        if let Some(c) = weak.upgrade() {
            Component(c).set_state(args.first().cloned().unwrap_or_default());
        }
        Ok(Value::Undefined)
    })));

    let weak = component.downgrade();
    object.insert("emit".into(), Value::Function(Function::new(move |args| {
        let Some(c) = weak.upgrade() else { return Ok(Value::from(0)) };
        let event = args.first().map(Value::to_display).unwrap_or_default();
        let rest = args.get(1..).unwrap_or_default();
        Ok(Value::from(Component(c).emit(&event, rest)))
    })));

    for (name, method) in component.methods() {
        object.insert(name.clone(), Value::Function(method.clone()));
    }
    Value::from(object)
}
