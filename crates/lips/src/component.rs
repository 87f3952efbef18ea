//! Component instances
//!
//! A component couples a template with live data. `input`, `state` and
//! `context` are independent signals; a single render effect reads them (and
//! the active language) and rebuilds the whole subtree whenever one changes.
//!
//! Lifecycle: created → mounted → (updating ⇄ mounted) → destroyed. Hooks
//! are handler methods named `onCreate`, `onMount`, `onRender`, `onUpdate`,
//! `onInput`, `onContext` and `onDestroy`.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use lips_dom::{DomError, DomEvent, Listener, ListenerId, NodeId, NodeKind, SharedDom};
use lips_expr::{EvalError, Function, Object, Scope, Value};

use crate::events::{EventBus, EventCallback, SubscriptionId};
use crate::host::ComponentHost;
use crate::render::{self, PendingListener, RenderPass, Renderer};
use crate::signal::{Effect, Signal, untrack};
use crate::timers::TimerId;
use crate::{Lips, LipsError, Template};

/// Where a component sits in the component tree
pub(crate) enum Placement {
    /// Top-level instance; keyed by its instance id
    Root,
    /// Nested instance discovered while rendering a parent
    Child { key: String, depth: usize, parent: Weak<ComponentInner> },
}

/// Mount target: a selector resolved against the document, or a node
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Selector(&'a str),
    Node(NodeId),
}

impl<'a> From<&'a str> for Target<'a> {
    fn from(selector: &'a str) -> Self {
        Target::Selector(selector)
    }
}

impl<'a> From<&'a String> for Target<'a> {
    fn from(selector: &'a String) -> Self {
        Target::Selector(selector)
    }
}

impl From<NodeId> for Target<'_> {
    fn from(node: NodeId) -> Self {
        Target::Node(node)
    }
}

/// Handle to a live component
#[derive(Clone)]
pub struct Component(pub(crate) Rc<ComponentInner>);

pub(crate) struct ComponentInner {
    name: String,
    scope_id: String,
    prekey: String,
    depth: usize,
    parent: Option<Weak<ComponentInner>>,
    template: Rc<Template>,
    lips: Lips,

    input: Signal<Value>,
    state: Signal<Value>,
    context: Signal<Value>,
    statics: Value,
    methods: IndexMap<String, Function>,

    bus: EventBus,
    input_bus: EventBus,

    nodes: RefCell<Vec<NodeId>>,
    children: RefCell<IndexMap<String, Component>>,
    discovery: Cell<usize>,
    dom_listeners: RefCell<Vec<ListenerId>>,
    parent_subscriptions: RefCell<Vec<SubscriptionId>>,
    stylesheet: Cell<Option<NodeId>>,
    tick: Cell<Option<TimerId>>,
    effects: RefCell<Vec<Effect>>,

    /// Input and state as of the last completed render
    committed: RefCell<(Value, Value)>,
    rendered: Cell<bool>,
    destroyed: Cell<bool>,
    generation: Cell<u64>,
}

impl Component {
    pub(crate) fn create(
        lips: &Lips,
        name: &str,
        template: Rc<Template>,
        input: Value,
        placement: Placement,
    ) -> Component {
        let id = lips.next_instance_id();
        let (prekey, depth, parent) = match placement {
            Placement::Root => (id.to_string(), 0, None),
            Placement::Child { key, depth, parent } => (key, depth, Some(parent)),
        };
        let input = template.input.merge(&input);

        let inner = Rc::new_cyclic(|weak: &Weak<ComponentInner>| {
            let methods = template.handlers
                .iter()
                .map(|(method, handler)| {
                    let weak = weak.clone();
                    let handler = handler.clone();
                    let bound = Function::new(move |args| {
                        let inner = weak
                            .upgrade()
                            .ok_or_else(|| EvalError::Host("component has been dropped".to_string()))?;
                        handler(&Component(inner), args)
                    });
                    (method.clone(), bound)
                })
                .collect();

            ComponentInner {
                name: name.to_string(),
                scope_id: format!("{name}-{id}"),
                prekey,
                depth,
                parent,
                lips: lips.clone(),
                input: Signal::new(input.clone()),
                state: Signal::new(template.state.clone()),
                context: Signal::new(Value::empty_object()),
                statics: template.statics.clone(),
                methods,
                bus: EventBus::new(),
                input_bus: EventBus::new(),
                nodes: RefCell::new(Vec::new()),
                children: RefCell::new(IndexMap::new()),
                discovery: Cell::new(0),
                dom_listeners: RefCell::new(Vec::new()),
                parent_subscriptions: RefCell::new(Vec::new()),
                stylesheet: Cell::new(None),
                tick: Cell::new(None),
                effects: RefCell::new(Vec::new()),
                committed: RefCell::new((input, template.state.clone())),
                rendered: Cell::new(false),
                destroyed: Cell::new(false),
                generation: Cell::new(0),
                template,
            }
        });

        let component = Component(inner);
        tracing::debug!(component = %component.0.name, key = %component.0.prekey, "created component");
        component.start();
        component
    }

    fn start(&self) {
        if !self.0.template.context.is_empty() {
            let weak = self.downgrade();
            let projection = Effect::new(move || {
                if let Some(inner) = weak.upgrade() {
                    Component(inner).project_context();
                }
            });
            self.0.effects.borrow_mut().push(projection);
        }

        let weak = self.downgrade();
        let render = Effect::new(move || {
            if let Some(inner) = weak.upgrade() {
                Component(inner).render_cycle();
            }
        });
        if self.0.destroyed.get() {
            render.dispose();
        }
        self.0.effects.borrow_mut().push(render);
    }

    /// Copy the declared context fields out of the global context
    fn project_context(&self) {
        let global = self.0.lips.context_signal().get();
        let projected: Object = self.0.template.context
            .iter()
            .map(|field| (field.clone(), global.get(field)))
            .filter(|(_, value)| !value.is_undefined())
            .collect();

        if self.0.context.set(Value::from(projected)) && self.0.rendered.get() {
            self.hook("onContext", &[self.context()]);
        }
    }

    fn render_cycle(&self) {
        let inner = &self.0;
        if inner.destroyed.get() {
            return;
        }

        let input = inner.input.get();
        let state = inner.state.get();
        inner.context.with(|_| ());
        inner.lips.language_signal().with(|_| ());

        untrack(|| {
            let first = !inner.rendered.get();
            if first {
                self.hook("onCreate", &[]);
            }
            if let Err(e) = self.render() {
                tracing::warn!(component = %inner.name, error = %e, "render failed");
            }
            if first {
                if let Err(e) = self.mount_stylesheet() {
                    tracing::warn!(component = %inner.name, error = %e, "stylesheet not injected");
                }
                self.start_tick();
                inner.rendered.set(true);
                self.hook("onMount", &[]);
            }
            *inner.committed.borrow_mut() = (input, state);
            self.hook("onRender", &[]);
        });
    }

    /// Rebuild the whole subtree and swap it in place of the previous one
    fn render(&self) -> Result<(), LipsError> {
        let inner = &self.0;
        inner.generation.set(inner.generation.get() + 1);
        inner.discovery.set(0);

        let dom = inner.lips.dom().clone();
        let marker = self.place_marker()?;
        let fragment = dom.borrow_mut().create_fragment();

        let nodes = inner.lips.parse(&inner.template.markup);
        let mut renderer = Renderer::new(self, RenderPass::default());
        renderer.render_nodes(&nodes, &self.base_scope(), fragment);
        let pass = renderer.finish();

        let stale: Vec<Component> = {
            let mut children = inner.children.borrow_mut();
            let keys: Vec<String> = children.keys()
                .filter(|key| !pass.seen.contains(*key))
                .cloned()
                .collect();
            keys.iter().filter_map(|key| children.shift_remove(key)).collect()
        };
        for child in stale {
            child.destroy();
        }

        let previous = {
            let mut dom = dom.borrow_mut();
            if dom.children(fragment).is_empty() {
                let placeholder = dom.create_comment("");
                dom.append_child(fragment, placeholder)?;
            }

            let fresh = dom.children(fragment);
            if inner.template.stylesheet.is_some() {
                let attribute = &inner.lips.config().scope_attribute;
                for &node in &fresh {
                    if dom.kind(node) == Some(NodeKind::Element) {
                        dom.set_attribute(node, attribute, &inner.scope_id)?;
                    }
                }
            }

            match marker.and_then(|m| dom.parent(m).map(|p| (p, m))) {
                Some((parent, marker)) => {
                    for &node in &fresh {
                        dom.insert_before(parent, node, Some(marker))?;
                    }
                    dom.remove(marker)?;
                }
                None => {
                    for &node in &fresh {
                        dom.detach(node)?;
                    }
                }
            }

            let previous = std::mem::replace(&mut *inner.nodes.borrow_mut(), fresh.clone());
            // roots of reused nested components are carried over into `fresh`
            for &node in previous.iter().filter(|node| !fresh.contains(node)) {
                if dom.contains(node) {
                    dom.remove(node)?;
                }
            }
            dom.remove(fragment)?;

            for id in inner.dom_listeners.borrow_mut().drain(..) {
                dom.remove_listener(id);
            }
            previous
        };

        if let Some(parent) = self.parent() {
            parent.replace_roots(&previous, &inner.nodes.borrow());
        }

        self.attach_listeners(pass.listeners);
        tracing::debug!(
            component = %inner.name,
            generation = inner.generation.get(),
            roots = inner.nodes.borrow().len(),
            "rendered"
        );
        Ok(())
    }

    /// Mark where the current roots sit so the next subtree lands there
    fn place_marker(&self) -> Result<Option<NodeId>, LipsError> {
        let mut dom = self.0.lips.dom().borrow_mut();
        let first = self.0.nodes
            .borrow()
            .iter()
            .copied()
            .find_map(|node| dom.parent(node).map(|parent| (parent, node)));
        let Some((parent, node)) = first else { return Ok(None) };

        let marker = dom.create_comment("");
        dom.insert_before(parent, marker, Some(node))?;
        Ok(Some(marker))
    }

    pub(crate) fn attach_listeners(&self, pending: Vec<PendingListener>) {
        let dom = self.dom();
        for PendingListener { node, event, source, scope } in pending {
            let weak = self.downgrade();
            let listener: Listener = Rc::new(move |e: &DomEvent| {
                if let Some(inner) = weak.upgrade() {
                    render::invoke_binding(&Component(inner), &source, &scope, &[event_value(e)]);
                }
            });
            match dom.borrow_mut().add_listener(node, &event, listener) {
                Ok(id) => self.0.dom_listeners.borrow_mut().push(id),
                Err(e) => tracing::warn!(component = %self.0.name, event = %event, error = %e, "listener not attached"),
            }
        }
    }

    fn mount_stylesheet(&self) -> Result<(), LipsError> {
        let Some(css) = &self.0.template.stylesheet else { return Ok(()) };
        let attribute = &self.0.lips.config().scope_attribute;
        let scoped = lips_css::scope_stylesheet(css, attribute, &self.0.scope_id)?;

        let mut dom = self.0.lips.dom().borrow_mut();
        let Some(head) = dom.head().or_else(|| dom.body()) else {
            tracing::debug!(component = %self.0.name, "document has no head; stylesheet skipped");
            return Ok(());
        };
        let style = dom.create_element("style");
        dom.set_attribute(style, attribute, &self.0.scope_id)?;
        dom.set_text(style, &scoped.css)?;
        dom.append_child(head, style)?;
        self.0.stylesheet.set(Some(style));
        Ok(())
    }

    fn start_tick(&self) {
        let weak = self.downgrade();
        let period = self.0.lips.config().tick_interval();
        let id = self.0.lips.set_interval(period, move || {
            if let Some(inner) = weak.upgrade() {
                Component(inner).tick();
            }
        });
        self.0.tick.set(Some(id));
    }

    /// Reconcile in-place state mutations with the last render
    ///
    /// Runs on the background interval; a divergence from the committed
    /// snapshot is handled like `set_state`.
    pub fn tick(&self) -> bool {
        if self.0.destroyed.get() || !self.0.rendered.get() {
            return false;
        }
        let diverged = self.0.committed.borrow().1 != self.0.state.get_untracked();
        if diverged {
            tracing::debug!(component = %self.0.name, "state mutated in place");
            self.0.state.notify();
            self.state_changed();
        }
        diverged
    }

    fn base_scope(&self) -> Scope {
        Scope::with_host(Rc::new(ComponentHost(self.downgrade())))
    }

    /// Run a lifecycle hook when the template defines it
    fn hook(&self, name: &str, args: &[Value]) {
        let Some(method) = self.0.methods.get(name).cloned() else { return };
        if let Err(e) = untrack(|| method.call(args)) {
            tracing::warn!(component = %self.0.name, hook = name, error = %e, "hook failed");
        }
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Shallow-merge `partial` into the state and re-render
    ///
    /// Returns `false` (no render, no hooks) when nothing changed.
    pub fn set_state(&self, partial: impl Into<Value>) -> bool {
        if self.0.destroyed.get() {
            return false;
        }
        let next = self.0.state.get_untracked().merge(&partial.into());
        if !self.0.state.set(next) {
            return false;
        }
        self.state_changed();
        true
    }

    fn state_changed(&self) {
        let state = self.state();
        self.hook("onUpdate", std::slice::from_ref(&state));
        self.0.bus.emit("update", &[state]);
    }

    /// Shallow-merge `partial` into the input and re-render
    pub fn set_input(&self, partial: impl Into<Value>) -> bool {
        if self.0.destroyed.get() {
            return false;
        }
        let next = self.0.input.get_untracked().merge(&partial.into());
        if !self.0.input.set(next) {
            return false;
        }
        let input = self.input();
        self.hook("onInput", std::slice::from_ref(&input));
        self.0.input_bus.emit("input", &[input]);
        true
    }

    /// Subscribe to effective input changes
    pub fn sub_input(&self, callback: impl Fn(&Value) + 'static) -> SubscriptionId {
        self.0.input_bus.on("input", Rc::new(move |args: &[Value]| {
            callback(&args.first().cloned().unwrap_or_default())
        }))
    }

    pub fn input(&self) -> Value {
        self.0.input.get_untracked()
    }

    pub fn state(&self) -> Value {
        self.0.state.get_untracked()
    }

    pub fn context(&self) -> Value {
        self.0.context.get_untracked()
    }

    pub fn statics(&self) -> &Value {
        &self.0.statics
    }

    pub(crate) fn state_signal(&self) -> &Signal<Value> {
        &self.0.state
    }

    // ========================================================================
    // Methods and events
    // ========================================================================

    /// Call a handler method
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, LipsError> {
        if self.0.destroyed.get() {
            return Err(LipsError::Destroyed(self.0.name.clone()));
        }
        let function = self.method(method).ok_or_else(|| LipsError::MethodNotFound(method.to_string()))?;
        Ok(function.call(args)?)
    }

    /// Bound handler method
    pub fn method(&self, name: &str) -> Option<Function> {
        self.0.methods.get(name).cloned()
    }

    pub(crate) fn methods(&self) -> &IndexMap<String, Function> {
        &self.0.methods
    }

    /// Subscribe to a component event
    pub fn on(&self, event: &str, callback: impl Fn(&[Value]) + 'static) -> SubscriptionId {
        self.0.bus.on(event, Rc::new(callback))
    }

    pub(crate) fn on_callback(&self, event: &str, callback: EventCallback) -> SubscriptionId {
        self.0.bus.on(event, callback)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.0.bus.off(id)
    }

    /// Emit a component event; returns how many subscribers ran
    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        self.0.bus.emit(event, args)
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Tear the component down: nested children, DOM listeners, stylesheet,
    /// tick, effects, then `onDestroy` and the `destroy` event, and finally
    /// the root nodes
    pub fn destroy(&self) {
        let inner = &self.0;
        if inner.destroyed.replace(true) {
            return;
        }

        let children: Vec<Component> = inner.children.borrow_mut().drain(..).map(|(_, c)| c).collect();
        for child in children {
            child.destroy();
        }

        {
            let mut dom = inner.lips.dom().borrow_mut();
            for id in inner.dom_listeners.borrow_mut().drain(..) {
                dom.remove_listener(id);
            }
            if let Some(style) = inner.stylesheet.take() {
                if dom.contains(style) {
                    let _ = dom.remove(style);
                }
            }
        }

        if let Some(tick) = inner.tick.take() {
            inner.lips.clear_timer(tick);
        }
        let effects = std::mem::take(&mut *inner.effects.borrow_mut());
        for effect in effects {
            effect.dispose();
        }

        self.hook("onDestroy", &[]);
        inner.bus.emit("destroy", &[]);

        {
            let nodes = std::mem::take(&mut *inner.nodes.borrow_mut());
            let mut dom = inner.lips.dom().borrow_mut();
            for node in nodes {
                if dom.contains(node) {
                    let _ = dom.remove(node);
                }
            }
        }

        inner.rendered.set(false);
        inner.parent_subscriptions.borrow_mut().clear();
        inner.bus.clear();
        inner.input_bus.clear();
        tracing::debug!(component = %inner.name, key = %inner.prekey, "destroyed component");
    }

    // ========================================================================
    // Placement
    // ========================================================================

    fn resolve(&self, target: Target<'_>) -> Result<NodeId, LipsError> {
        if self.0.destroyed.get() {
            return Err(LipsError::Destroyed(self.0.name.clone()));
        }
        let dom = self.0.lips.dom().borrow();
        match target {
            Target::Node(node) if dom.contains(node) => Ok(node),
            Target::Node(_) => Err(DomError::NotFound.into()),
            Target::Selector(selector) => dom
                .query_selector(dom.document(), selector)
                .ok_or_else(|| LipsError::TargetNotFound(selector.to_string())),
        }
    }

    /// Move the root nodes to the end of `target`
    pub fn append_to<'a>(&self, target: impl Into<Target<'a>>) -> Result<(), LipsError> {
        let parent = self.resolve(target.into())?;
        let mut dom = self.0.lips.dom().borrow_mut();
        for &node in self.0.nodes.borrow().iter() {
            dom.insert_before(parent, node, None)?;
        }
        Ok(())
    }

    /// Move the root nodes to the start of `target`
    pub fn prepend_to<'a>(&self, target: impl Into<Target<'a>>) -> Result<(), LipsError> {
        let parent = self.resolve(target.into())?;
        let mut dom = self.0.lips.dom().borrow_mut();
        let first = dom.children(parent)
            .into_iter()
            .find(|n| !self.0.nodes.borrow().contains(n));
        for &node in self.0.nodes.borrow().iter() {
            dom.insert_before(parent, node, first)?;
        }
        Ok(())
    }

    /// Put the root nodes where `target` is and remove `target`
    pub fn replace_with<'a>(&self, target: impl Into<Target<'a>>) -> Result<(), LipsError> {
        let target = self.resolve(target.into())?;
        let mut dom = self.0.lips.dom().borrow_mut();
        let parent = dom.parent(target).ok_or(DomError::HierarchyRequest)?;
        for &node in self.0.nodes.borrow().iter() {
            dom.insert_before(parent, node, Some(target))?;
        }
        dom.remove(target)?;
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// First root element
    pub fn node(&self) -> Option<NodeId> {
        let dom = self.0.lips.dom().borrow();
        self.0.nodes.borrow()
            .iter()
            .copied()
            .find(|&n| dom.kind(n) == Some(NodeKind::Element))
    }

    /// Every root node, text and comments included
    pub fn nodes(&self) -> Vec<NodeId> {
        self.0.nodes.borrow().clone()
    }

    /// First element of the subtree matching `selector`
    pub fn find(&self, selector: &str) -> Option<NodeId> {
        let dom = self.0.lips.dom().borrow();
        self.0.nodes.borrow().iter().find_map(|&root| {
            if dom.matches(root, selector) {
                Some(root)
            } else {
                dom.query_selector(root, selector)
            }
        })
    }

    /// Every element of the subtree matching `selector`, in document order
    pub fn find_all(&self, selector: &str) -> Vec<NodeId> {
        let dom = self.0.lips.dom().borrow();
        let mut found = Vec::new();
        for &root in self.0.nodes.borrow().iter() {
            if dom.matches(root, selector) {
                found.push(root);
            }
            found.extend(dom.query_selector_all(root, selector));
        }
        found
    }

    /// Serialized markup of the root nodes
    pub fn html(&self) -> String {
        let dom = self.0.lips.dom().borrow();
        self.0.nodes.borrow().iter().map(|&n| dom.outer_html(n)).collect()
    }

    /// Text content of the root nodes
    pub fn text(&self) -> String {
        let dom = self.0.lips.dom().borrow();
        self.0.nodes.borrow().iter().map(|&n| dom.text_content(n)).collect()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Structural key (`"<parent key>.<index>"` for nested components)
    pub fn key(&self) -> &str {
        &self.0.prekey
    }

    /// Value of the scope attribute on this instance's root elements
    pub fn scope_id(&self) -> &str {
        &self.0.scope_id
    }

    pub fn depth(&self) -> usize {
        self.0.depth
    }

    pub fn is_rendered(&self) -> bool {
        self.0.rendered.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    /// Number of renders so far
    pub fn generation(&self) -> u64 {
        self.0.generation.get()
    }

    /// Nested component by structural key
    pub fn child(&self, key: &str) -> Option<Component> {
        self.0.children.borrow().get(key).cloned()
    }

    /// Nested components in discovery order
    pub fn children(&self) -> Vec<Component> {
        self.0.children.borrow().values().cloned().collect()
    }

    pub fn lips(&self) -> &Lips {
        &self.0.lips
    }

    pub fn dom(&self) -> SharedDom {
        self.0.lips.dom().clone()
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn downgrade(&self) -> Weak<ComponentInner> {
        Rc::downgrade(&self.0)
    }

    // ========================================================================
    // Renderer support
    // ========================================================================

    /// Next structural key for a nested component tag
    pub(crate) fn next_child_key(&self) -> String {
        let index = self.0.discovery.get();
        self.0.discovery.set(index + 1);
        format!("{}.{}", self.0.prekey, index)
    }

    pub(crate) fn insert_child(&self, key: String, child: Component) -> Option<Component> {
        self.0.children.borrow_mut().insert(key, child)
    }

    pub(crate) fn take_child(&self, key: &str) -> Option<Component> {
        self.0.children.borrow_mut().shift_remove(key)
    }

    /// Replace the subscriptions a parent holds on this component's bus
    pub(crate) fn set_parent_subscriptions(&self, subscriptions: Vec<SubscriptionId>) {
        let old = std::mem::replace(&mut *self.0.parent_subscriptions.borrow_mut(), subscriptions);
        for id in old {
            self.0.bus.off(id);
        }
    }

    fn parent(&self) -> Option<Component> {
        self.0.parent.as_ref().and_then(Weak::upgrade).map(Component)
    }

    /// Swap root ids after part of the subtree was rebuilt in place
    ///
    /// A nested component sitting at its parent's top level shares root
    /// nodes with the parent, so the change is passed up while it matches.
    pub(crate) fn replace_roots(&self, old: &[NodeId], fresh: &[NodeId]) {
        let replaced = {
            let mut roots = self.0.nodes.borrow_mut();
            match roots.iter().position(|node| old.contains(node)) {
                Some(position) => {
                    roots.retain(|node| !old.contains(node));
                    for (offset, &node) in fresh.iter().enumerate() {
                        roots.insert(position + offset, node);
                    }
                    true
                }
                None => false,
            }
        };
        if replaced {
            if let Some(parent) = self.parent() {
                parent.replace_roots(old, fresh);
            }
        }
    }
}

/// DOM event as seen by binding expressions
fn event_value(event: &DomEvent) -> Value {
    Value::object([
        ("type", Value::from(event.event_type.as_str())),
        ("target", Value::from(event.target.to_string())),
        ("currentTarget", Value::from(event.current_target.to_string())),
    ])
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.0.name)
            .field("key", &self.0.prekey)
            .field("rendered", &self.0.rendered.get())
            .field("destroyed", &self.0.destroyed.get())
            .field("generation", &self.0.generation.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_key_and_scope_id() {
        let lips = Lips::detached();
        let a = lips.render("card", Template::new("<p>a</p>"));
        let b = lips.render("card", Template::new("<p>b</p>"));
        assert_ne!(a.key(), b.key());
        assert_eq!(a.scope_id(), format!("card-{}", a.key()));
        assert_eq!(a.depth(), 0);
    }

    #[test]
    fn test_detached_render() {
        let lips = Lips::detached();
        let c = lips.render("hello", Template::new("<p>hi</p><span>there</span>"));
        assert!(c.is_rendered());
        assert_eq!(c.nodes().len(), 2);
        assert_eq!(c.html(), "<p>hi</p><span>there</span>");
        assert_eq!(lips.dom().borrow().parent(c.nodes()[0]), None);
    }

    #[test]
    fn test_empty_render_keeps_placeholder() {
        let lips = Lips::detached();
        let c = lips.render("empty", Template::new("<if by=\"false\"><p></p></if>"));
        assert_eq!(c.nodes().len(), 1);
        assert_eq!(c.node(), None);
        assert_eq!(c.html(), "<!---->");
    }

    #[test]
    fn test_call_and_missing_method() {
        let lips = Lips::detached();
        let c = lips.render("m", Template::new("").handler("twice", |_, args| {
            Value::from(args[0].to_number() * 2.0)
        }));
        assert_eq!(c.call("twice", &[Value::from(4)]).unwrap(), Value::from(8));
        assert!(matches!(c.call("nope", &[]), Err(LipsError::MethodNotFound(_))));

        c.destroy();
        assert!(matches!(c.call("twice", &[Value::from(1)]), Err(LipsError::Destroyed(_))));
    }

    #[test]
    fn test_tick_picks_up_in_place_mutation() {
        let lips = Lips::detached();
        let c = lips.render("t", Template::new("<b>{state.n}</b>").state(Value::object([("n", Value::from(1))])));
        assert!(!c.tick());

        c.state_signal().update_silent(|s| s.set_path(&[Value::from("n")], Value::from(2))).unwrap();
        assert_eq!(c.html(), "<b>1</b>");
        assert!(c.tick());
        assert_eq!(c.html(), "<b>2</b>");
        assert!(!c.tick());
    }

    #[test]
    fn test_replace_with() {
        let lips = Lips::detached();
        let slot = {
            let mut dom = lips.dom().borrow_mut();
            let body = dom.body().unwrap();
            let slot = dom.create_element("div");
            dom.append_child(body, slot).unwrap();
            slot
        };
        let c = lips.render("r", Template::new("<em>x</em>"));
        c.replace_with(slot).unwrap();

        let dom = lips.dom().borrow();
        assert!(!dom.contains(slot));
        assert_eq!(dom.inner_html(dom.body().unwrap()), "<em>x</em>");
    }
}
