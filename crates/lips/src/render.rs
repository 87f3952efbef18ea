//! Directive renderer
//!
//! Walks a parsed template and builds DOM nodes for one component. Directive
//! tags (`let`, `for`, `if`/`else-if`/`else`, `switch`/`case`/`default`,
//! `async`/`preload`/`resolve`/`catch`) are interpreted here; registered
//! component tags become nested components; everything else is copied with
//! its attributes evaluated.
//!
//! Each directive renders into its own fragment. A failing directive is
//! logged and contributes nothing; its siblings render normally.

use std::rc::Rc;

use indexmap::IndexSet;
use lips_dom::{Dom, NodeId, SharedDom};
use lips_expr::{
    EvalError, Function, Object, Promise, PromiseState, Scope, TextPart, Value,
    evaluate, has_interpolation, interpolate, split_interpolations, split_top_level, try_evaluate,
};
use lips_html::{TemplateElement, TemplateNode};

use crate::component::{Component, Placement};
use crate::{DirectiveError, Template};

/// `on-*` binding waiting for its node to be attached
pub(crate) struct PendingListener {
    pub(crate) node: NodeId,
    pub(crate) event: String,
    pub(crate) source: String,
    pub(crate) scope: Scope,
}

/// What a render pass collected besides DOM nodes
#[derive(Default)]
pub(crate) struct RenderPass {
    /// Structural keys of the nested components met, in discovery order
    pub(crate) seen: IndexSet<String>,
    pub(crate) listeners: Vec<PendingListener>,
}

pub(crate) struct Renderer<'a> {
    component: &'a Component,
    dom: SharedDom,
    pass: RenderPass,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(component: &'a Component, pass: RenderPass) -> Self {
        Self {
            dom: component.dom(),
            component,
            pass,
        }
    }

    pub(crate) fn finish(self) -> RenderPass {
        self.pass
    }

    /// Render `nodes` under `parent`
    pub(crate) fn render_nodes(&mut self, nodes: &[TemplateNode], scope: &Scope, parent: NodeId) {
        let mut scope = scope.clone();
        let mut i = 0;
        while i < nodes.len() {
            let node = &nodes[i];
            i += 1;

            let el = match node {
                TemplateNode::Text(text) => {
                    let content = if has_interpolation(text) {
                        interpolate(text, &scope)
                    } else {
                        text.clone()
                    };
                    self.append_new(parent, |dom| dom.create_text(&content));
                    continue;
                }
                TemplateNode::Comment(text) => {
                    self.append_new(parent, |dom| dom.create_comment(text));
                    continue;
                }
                TemplateNode::Element(el) => el,
            };

            match el.tag.as_str() {
                "let" => {
                    scope = bind_let(el, &scope);
                    self.render_nodes(&el.children, &scope, parent);
                }
                "if" => {
                    let end = chain_end(nodes, i - 1);
                    let chain = &nodes[i - 1..end];
                    self.isolated("if", parent, |r, fragment| r.render_if(chain, &scope, fragment));
                    i = end;
                }
                "for" => self.isolated("for", parent, |r, fragment| r.render_for(el, &scope, fragment)),
                "switch" => self.isolated("switch", parent, |r, fragment| r.render_switch(el, &scope, fragment)),
                "async" => self.isolated("async", parent, |r, fragment| r.render_async(el, &scope, fragment)),
                "else-if" | "else" => self.orphan(el, "<if>"),
                "case" | "default" => self.orphan(el, "<switch>"),
                "preload" | "resolve" | "catch" => self.orphan(el, "<async>"),
                tag => match self.component.lips().import(tag) {
                    Ok(template) => self.isolated(tag, parent, |r, fragment| {
                        r.render_component(el, template, &scope, fragment)
                    }),
                    Err(_) => {
                        if let Err(e) = self.render_element(el, &scope, parent) {
                            self.warn(tag, &e);
                        }
                    }
                },
            }
        }
    }

    /// Run one directive against a private fragment, then move its output
    /// into `parent`; on failure the output is dropped
    fn isolated(
        &mut self,
        tag: &str,
        parent: NodeId,
        f: impl FnOnce(&mut Self, NodeId) -> Result<(), DirectiveError>,
    ) {
        let fragment = self.dom.borrow_mut().create_fragment();
        let listeners = self.pass.listeners.len();
        let seen = self.pass.seen.len();

        let result = f(self, fragment).and_then(|()| {
            let mut dom = self.dom.borrow_mut();
            for node in dom.children(fragment) {
                dom.append_child(parent, node)?;
            }
            Ok(())
        });
        if let Err(e) = result {
            self.warn(tag, &e);
            self.pass.listeners.truncate(listeners);
            self.pass.seen.truncate(seen);
        }

        let mut dom = self.dom.borrow_mut();
        if dom.contains(fragment) {
            let _ = dom.remove(fragment);
        }
    }

    fn warn(&self, tag: &str, error: &DirectiveError) {
        tracing::warn!(component = %self.component.name(), directive = tag, error = %error, "directive skipped");
    }

    fn orphan(&self, el: &TemplateElement, expected: &'static str) {
        let error = DirectiveError::Orphan { tag: el.tag.clone(), expected };
        self.warn(&el.tag, &error);
    }

    fn append_new(&self, parent: NodeId, create: impl FnOnce(&mut dyn Dom) -> NodeId) {
        let mut dom = self.dom.borrow_mut();
        let node = create(&mut *dom);
        if let Err(e) = dom.append_child(parent, node) {
            tracing::warn!(component = %self.component.name(), error = %e, "node not appended");
            let _ = dom.remove(node);
        }
    }

    // ========================================================================
    // Conditionals
    // ========================================================================

    fn render_if(&mut self, chain: &[TemplateNode], scope: &Scope, fragment: NodeId) -> Result<(), DirectiveError> {
        for branch in chain.iter().filter_map(TemplateNode::as_element) {
            let taken = match branch.tag.as_str() {
                "else" => true,
                tag => {
                    let by = branch.attr("by").ok_or_else(|| missing(tag, "by"))?;
                    condition(by, scope)
                }
            };
            if taken {
                self.render_nodes(&branch.children, scope, fragment);
                break;
            }
        }
        Ok(())
    }

    fn render_switch(&mut self, el: &TemplateElement, scope: &Scope, fragment: NodeId) -> Result<(), DirectiveError> {
        let by = el.attr("by").ok_or_else(|| missing("switch", "by"))?;
        let subject = evaluate(by, scope);

        let mut fallback = None;
        for branch in el.children.iter().filter_map(TemplateNode::as_element) {
            match branch.tag.as_str() {
                "case" => {
                    let options = branch.attr("is").ok_or_else(|| missing("case", "is"))?;
                    let matched = split_top_level(options, ',')
                        .into_iter()
                        .any(|option| evaluate(option, scope) == subject);
                    if matched {
                        self.render_nodes(&branch.children, scope, fragment);
                        return Ok(());
                    }
                }
                "default" => {
                    fallback.get_or_insert(branch);
                }
                other => tracing::debug!(tag = other, "ignored inside <switch>"),
            }
        }

        if let Some(branch) = fallback {
            self.render_nodes(&branch.children, scope, fragment);
        }
        Ok(())
    }

    // ========================================================================
    // Loops
    // ========================================================================

    fn render_for(&mut self, el: &TemplateElement, scope: &Scope, fragment: NodeId) -> Result<(), DirectiveError> {
        if let Some(source) = el.attr("in") {
            let items = try_evaluate(source, scope)?;
            match &items {
                Value::Array(items) => {
                    for (index, each) in items.iter().enumerate() {
                        let scope = scope.extend([("each", each.clone()), ("index", Value::from(index))]);
                        self.render_nodes(&el.children, &scope, fragment);
                    }
                }
                Value::Object(map) => {
                    for (index, (key, each)) in map.iter().enumerate() {
                        let scope = scope.extend([
                            ("each", each.clone()),
                            ("index", Value::from(index)),
                            ("key", Value::from(key.as_str())),
                        ]);
                        self.render_nodes(&el.children, &scope, fragment);
                    }
                }
                nullish if nullish.is_nullish() => {}
                other => {
                    return Err(DirectiveError::NotIterable {
                        expression: source.to_string(),
                        found: other.type_of(),
                    });
                }
            }
            return Ok(());
        }

        let from = el.attr("from").ok_or_else(|| missing("for", "in"))?;
        let to = el.attr("to").ok_or_else(|| missing("for", "to"))?;
        let start = try_evaluate(from, scope)?.to_number();
        let end = try_evaluate(to, scope)?.to_number();
        if !start.is_finite() || !end.is_finite() {
            return Err(DirectiveError::InvalidRange);
        }
        if start > end {
            return Ok(());
        }

        let count = (end - start).floor() + 1.0;
        let limit = self.component.lips().config().max_range;
        if count > limit as f64 {
            return Err(DirectiveError::RangeTooLarge { count, limit });
        }
        for index in 0..count as usize {
            let scope = scope.extend([
                ("each", Value::from(start + index as f64)),
                ("index", Value::from(index)),
            ]);
            self.render_nodes(&el.children, &scope, fragment);
        }
        Ok(())
    }

    // ========================================================================
    // Async
    // ========================================================================

    fn render_async(&mut self, el: &TemplateElement, scope: &Scope, fragment: NodeId) -> Result<(), DirectiveError> {
        let source = el.attr("await").ok_or_else(|| missing("async", "await"))?;
        let parts = split_top_level(source, ',');
        let Some((&head, rest)) = parts.split_first() else {
            return Err(missing("async", "await"));
        };
        let args: Vec<Value> = rest.iter().map(|arg| evaluate(arg, scope)).collect();

        let called = match self.component.method(head) {
            Some(method) => method.call(&args),
            None => match try_evaluate(head, scope) {
                Ok(Value::Function(f)) => f.call(&args),
                Ok(Value::Promise(p)) if args.is_empty() => Ok(Value::Promise(p)),
                _ => return Err(DirectiveError::NotCallable(head.to_string())),
            },
        };
        let promise = match called {
            Ok(Value::Promise(p)) => p,
            Ok(value) => Promise::resolved(value),
            Err(e) => Promise::rejected(Value::from(e.to_string())),
        };

        match promise.state() {
            PromiseState::Fulfilled(value) => self.render_settled(el, scope, Ok(value), fragment),
            PromiseState::Rejected(reason) => self.render_settled(el, scope, Err(reason), fragment),
            PromiseState::Pending => {
                let preload = self.dom.borrow_mut().create_fragment();
                if let Some(branch) = branch(el, "preload") {
                    self.render_nodes(&branch.children, scope, preload);
                }
                let (preload_nodes, anchor) = {
                    let mut dom = self.dom.borrow_mut();
                    let nodes = dom.children(preload);
                    for &node in &nodes {
                        dom.append_child(fragment, node)?;
                    }
                    dom.remove(preload)?;
                    let anchor = dom.create_comment("async");
                    dom.append_child(fragment, anchor)?;
                    (nodes, anchor)
                };

                let weak = self.component.downgrade();
                let generation = self.component.generation();
                let el = el.clone();
                let scope = scope.clone();
                promise.then(move |outcome| {
                    let Some(inner) = weak.upgrade() else { return };
                    let component = Component(inner);
                    if component.is_destroyed() || component.generation() != generation {
                        tracing::debug!(component = %component.name(), "discarded stale async settlement");
                        return;
                    }
                    settle_async(&component, &el, &scope, outcome, anchor, preload_nodes);
                });
            }
        }
        Ok(())
    }

    fn render_settled(
        &mut self,
        el: &TemplateElement,
        scope: &Scope,
        outcome: Result<Value, Value>,
        fragment: NodeId,
    ) {
        match outcome {
            Ok(response) => {
                if let Some(branch) = branch(el, "resolve") {
                    self.render_nodes(&branch.children, &scope.with("response", response), fragment);
                }
            }
            Err(error) => match branch(el, "catch") {
                Some(branch) => self.render_nodes(&branch.children, &scope.with("error", error), fragment),
                None => tracing::warn!(
                    component = %self.component.name(),
                    error = %error,
                    "async rejected without a <catch> branch"
                ),
            },
        }
    }

    // ========================================================================
    // Elements
    // ========================================================================

    fn render_element(&mut self, el: &TemplateElement, scope: &Scope, parent: NodeId) -> Result<(), DirectiveError> {
        let node = {
            let mut dom = self.dom.borrow_mut();
            let node = dom.create_element(&el.tag);
            dom.append_child(parent, node)?;
            node
        };

        for attr in &el.attrs {
            if let Some(event) = attr.name.strip_prefix("on-") {
                self.pass.listeners.push(PendingListener {
                    node,
                    event: event.to_string(),
                    source: attr.value.clone(),
                    scope: scope.clone(),
                });
                continue;
            }

            let value = attribute_value(&attr.value, scope);
            match attr.name.as_str() {
                "text" => {
                    let text = self.component.lips().translate(&value.to_display());
                    let mut dom = self.dom.borrow_mut();
                    let child = dom.create_text(&text);
                    dom.append_child(node, child)?;
                }
                "html" => {
                    let nodes = lips_html::parse(&value.to_display());
                    lips_html::build_into(&mut *self.dom.borrow_mut(), node, &nodes)?;
                }
                _ if value.as_str() == Some("?") => {}
                "style" => {
                    self.dom.borrow_mut().set_attribute(node, "style", &style_text(&value))?;
                }
                name => {
                    self.dom.borrow_mut().set_attribute(node, name, &value.to_display())?;
                }
            }
        }

        if matches!(el.tag.as_str(), "style" | "script") {
            let mut dom = self.dom.borrow_mut();
            for child in el.children.iter() {
                if let TemplateNode::Text(text) = child {
                    let text = dom.create_text(text);
                    dom.append_child(node, text)?;
                }
            }
        } else {
            self.render_nodes(&el.children, scope, node);
        }
        Ok(())
    }

    // ========================================================================
    // Nested components
    // ========================================================================

    fn render_component(
        &mut self,
        el: &TemplateElement,
        template: Rc<Template>,
        scope: &Scope,
        fragment: NodeId,
    ) -> Result<(), DirectiveError> {
        let owner = self.component;
        let lips = owner.lips();
        let key = owner.next_child_key();
        self.pass.seen.insert(key.clone());

        let depth = owner.depth() + 1;
        let max_depth = lips.config().max_depth;
        if depth > max_depth {
            return Err(DirectiveError::DepthExceeded(max_depth));
        }

        let mut input = Object::new();
        let mut bindings = Vec::new();
        for attr in &el.attrs {
            if let Some(event) = attr.name.strip_prefix("on-") {
                bindings.push((event.to_string(), attr.value.clone()));
                continue;
            }
            let value = if attr.value.is_empty() {
                Value::Bool(true)
            } else {
                attribute_value(&attr.value, scope)
            };
            if value.as_str() != Some("?") {
                input.insert(attr.name.clone(), value);
            }
        }
        if !el.children.is_empty() {
            input.insert(lips.config().slot_field.clone(), Value::from(el.inner_markup()));
        }
        let input = Value::from(input);

        let child = match owner.take_child(&key) {
            Some(child) if child.name() == el.tag && !child.is_destroyed() => {
                child.set_input(input);
                child
            }
            previous => {
                if let Some(previous) = previous {
                    previous.destroy();
                }
                Component::create(lips, &el.tag, template, input, Placement::Child {
                    key: key.clone(),
                    depth,
                    parent: owner.downgrade(),
                })
            }
        };

        let subscriptions = bindings
            .into_iter()
            .map(|(event, source)| {
                let weak = owner.downgrade();
                let scope = scope.clone();
                child.on_callback(&event, Rc::new(move |args: &[Value]| {
                    if let Some(inner) = weak.upgrade() {
                        invoke_binding(&Component(inner), &source, &scope, args);
                    }
                }))
            })
            .collect();
        child.set_parent_subscriptions(subscriptions);
        owner.insert_child(key, child.clone());

        let mut dom = self.dom.borrow_mut();
        for node in child.nodes() {
            dom.append_child(fragment, node)?;
        }
        Ok(())
    }
}

/// Put a settled `async` branch where its preload content was
pub(crate) fn settle_async(
    component: &Component,
    el: &TemplateElement,
    scope: &Scope,
    outcome: Result<Value, Value>,
    anchor: NodeId,
    preload: Vec<NodeId>,
) {
    let dom = component.dom();
    if !dom.borrow().contains(anchor) {
        return;
    }

    let fragment = dom.borrow_mut().create_fragment();
    let mut renderer = Renderer::new(component, RenderPass::default());
    renderer.render_settled(el, scope, outcome, fragment);
    let pass = renderer.finish();

    let fresh = {
        let mut dom = dom.borrow_mut();
        let fresh = dom.children(fragment);
        let placed = match dom.parent(anchor) {
            Some(parent) => fresh.iter().try_for_each(|&node| dom.insert_before(parent, node, Some(anchor))),
            None => fresh.iter().try_for_each(|&node| dom.detach(node)),
        };
        if let Err(e) = placed {
            tracing::warn!(component = %component.name(), error = %e, "async branch not placed");
        }
        for &node in &preload {
            if dom.contains(node) {
                let _ = dom.remove(node);
            }
        }
        let _ = dom.remove(fragment);
        fresh
    };

    let mut old = preload;
    old.push(anchor);
    let mut placed = fresh;
    placed.push(anchor);
    component.replace_roots(&old, &placed);

    component.attach_listeners(pass.listeners);
}

/// Run an `on-*` binding
///
/// `"method, arg1, arg2"` calls a handler method with the evaluated args
/// followed by the payload; any other expression is evaluated with `event`
/// bound, and a resulting function is called with the payload.
pub(crate) fn invoke_binding(component: &Component, source: &str, scope: &Scope, payload: &[Value]) {
    let parts = split_top_level(source, ',');
    let Some((&head, rest)) = parts.split_first() else { return };
    let scope = scope.with("event", payload.first().cloned().unwrap_or_default());

    let call = |f: Function| {
        let mut args: Vec<Value> = rest.iter().map(|arg| evaluate(arg, &scope)).collect();
        args.extend_from_slice(payload);
        f.call(&args)
    };
    let result = match component.method(head) {
        Some(method) => call(method),
        None if rest.is_empty() => match try_evaluate(source, &scope) {
            Ok(Value::Function(f)) => f.call(payload),
            other => other,
        },
        None => match try_evaluate(head, &scope) {
            Ok(Value::Function(f)) => call(f),
            Ok(other) => Err(EvalError::type_error(format!("{} is not a function", other.type_of()))),
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        tracing::warn!(component = %component.name(), binding = source, error = %e, "event binding failed");
    }
}

/// Evaluate an attribute value
///
/// A value that is exactly one `{expr}` yields the expression's value; text
/// with embedded `{expr}` is interpolated; anything else is evaluated as an
/// expression, falling back to the raw text.
pub(crate) fn attribute_value(raw: &str, scope: &Scope) -> Value {
    let trimmed = raw.trim();
    if let [TextPart::Expr(inner)] = split_interpolations(trimmed).as_slice() {
        return try_evaluate(inner, scope)
            .or_else(|_| try_evaluate(trimmed, scope))
            .unwrap_or_else(|_| Value::from(raw));
    }
    if has_interpolation(raw) {
        return Value::from(interpolate(raw, scope));
    }
    match evaluate(raw, scope) {
        Value::Function(_) => Value::from(raw),
        value => value,
    }
}

fn bind_let(el: &TemplateElement, scope: &Scope) -> Scope {
    el.attrs.iter().fold(scope.clone(), |scope, attr| {
        let value = if attr.value.is_empty() {
            Value::Bool(true)
        } else {
            attribute_value(&attr.value, &scope)
        };
        scope.with(&attr.name, value)
    })
}

/// Index one past the last member of the `if` chain starting at `start`
fn chain_end(nodes: &[TemplateNode], start: usize) -> usize {
    let mut end = start + 1;
    let mut i = start + 1;
    while let Some(node) = nodes.get(i) {
        match node {
            n if n.is_blank_text() => i += 1,
            TemplateNode::Element(el) if el.tag == "else-if" => {
                i += 1;
                end = i;
            }
            TemplateNode::Element(el) if el.tag == "else" => return i + 1,
            _ => break,
        }
    }
    end
}

/// Truthiness of a `by` condition
///
/// Evaluation is fail-soft like everywhere else: a condition that cannot be
/// evaluated yields its source text, which is truthy.
fn condition(source: &str, scope: &Scope) -> bool {
    evaluate(source, scope).is_truthy()
}

fn branch<'t>(el: &'t TemplateElement, tag: &str) -> Option<&'t TemplateElement> {
    el.children
        .iter()
        .filter_map(TemplateNode::as_element)
        .find(|child| child.tag == tag)
}

fn missing(tag: &str, attribute: &'static str) -> DirectiveError {
    DirectiveError::MissingAttribute { tag: tag.to_string(), attribute }
}

fn style_text(value: &Value) -> String {
    match value.as_object() {
        Some(map) => map
            .iter()
            .filter(|(_, v)| !v.is_nullish())
            .map(|(k, v)| format!("{}:{};", k, v.to_display()))
            .collect(),
        None => value.to_display(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_end_skips_blank_text() {
        let nodes = lips_html::parse("<if by=\"a\"></if>\n  <else-if by=\"b\"></else-if> <else></else><p></p>");
        assert_eq!(chain_end(&nodes, 0), 4);

        let nodes = lips_html::parse("<if by=\"a\"></if> <p></p>");
        assert_eq!(chain_end(&nodes, 0), 1);
    }

    #[test]
    fn test_attribute_value_forms() {
        let scope = Scope::new().with("n", Value::from(2));
        assert_eq!(attribute_value("{n + 1}", &scope), Value::from(3));
        assert_eq!(attribute_value("item-{n}", &scope), Value::from("item-2"));
        assert_eq!(attribute_value("n * 2", &scope), Value::from(4));
        assert_eq!(attribute_value("card wide", &scope), Value::from("card wide"));
        assert_eq!(attribute_value("{'?'}", &scope), Value::from("?"));
    }

    #[test]
    fn test_style_text() {
        let style = Value::object([("color", Value::from("red")), ("width", Value::from("2px"))]);
        assert_eq!(style_text(&style), "color:red;width:2px;");
        assert_eq!(style_text(&Value::from("margin:0")), "margin:0");
    }
}
