//! Component templates
//!
//! A template is the immutable recipe a component is built from: markup,
//! default data, declared context fields, handler methods and an optional
//! stylesheet. Templates are shared as `Rc<Template>` and never mutated.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use lips_expr::{EvalError, Value};

use crate::Component;

/// Handler method: receives the component and the call arguments
pub type Handler = Rc<dyn Fn(&Component, &[Value]) -> Result<Value, EvalError>>;

/// Component template
#[derive(Clone, Default)]
pub struct Template {
    pub(crate) markup: String,
    pub(crate) state: Value,
    pub(crate) input: Value,
    pub(crate) statics: Value,
    pub(crate) context: Vec<String>,
    pub(crate) handlers: IndexMap<String, Handler>,
    pub(crate) stylesheet: Option<String>,
}

impl Template {
    /// Template with the given markup and empty data
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: lips_html::preprocess(&markup.into()),
            state: Value::empty_object(),
            input: Value::empty_object(),
            statics: Value::empty_object(),
            ..Default::default()
        }
    }

    /// Default state
    pub fn state(mut self, state: impl Into<Value>) -> Self {
        self.state = state.into();
        self
    }

    /// Default input, merged under the caller's input
    pub fn input(mut self, input: impl Into<Value>) -> Self {
        self.input = input.into();
        self
    }

    /// Immutable per-instance data
    pub fn statics(mut self, statics: impl Into<Value>) -> Self {
        self.statics = statics.into();
        self
    }

    /// Global context fields projected into the component
    pub fn context<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.context = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add an infallible handler method
    pub fn handler(
        self,
        name: &str,
        f: impl Fn(&Component, &[Value]) -> Value + 'static,
    ) -> Self {
        self.try_handler(name, move |c, args| Ok(f(c, args)))
    }

    /// Add a handler method that may fail
    pub fn try_handler(
        mut self,
        name: &str,
        f: impl Fn(&Component, &[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        self.handlers.insert(name.to_string(), Rc::new(f));
        self
    }

    /// Component stylesheet, scoped per instance
    pub fn stylesheet(mut self, css: impl Into<String>) -> Self {
        self.stylesheet = Some(css.into());
        self
    }

    /// Preprocessed markup
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn default_state(&self) -> &Value {
        &self.state
    }

    pub fn default_input(&self) -> &Value {
        &self.input
    }

    pub fn context_fields(&self) -> &[String] {
        &self.context
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("markup", &self.markup)
            .field("state", &self.state)
            .field("input", &self.input)
            .field("statics", &self.statics)
            .field("context", &self.context)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .field("stylesheet", &self.stylesheet)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let t = Template::new("<if(state.open)><p/></if>")
            .state(Value::object([("open", Value::Bool(true))]))
            .input(Value::object([("size", Value::from(2))]))
            .context(["user"])
            .handler("toggle", |_, _| Value::Undefined)
            .stylesheet("p { margin: 0 }");

        assert_eq!(t.markup(), "<if by=\"state.open\"><p></p></if>");
        assert_eq!(t.default_state().get("open"), Value::Bool(true));
        assert_eq!(t.default_input().get("size"), Value::from(2));
        assert_eq!(t.context_fields(), ["user".to_string()]);
        assert!(t.has_handler("toggle"));
        assert_eq!(t.handler_names().collect::<Vec<_>>(), vec!["toggle"]);
    }
}
