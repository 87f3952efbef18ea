//! Lips runtime
//!
//! A [`Lips`] value owns everything components share: the template
//! registry, the parsed-template cache, the global context and language
//! signals, the translation delegate, timers and the task queue. It is a
//! cheap handle; clones refer to the same runtime. Several runtimes can live
//! side by side in one process.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use lips_dom::{DomTree, SharedDom};
use lips_expr::{Promise, Value};
use lips_html::{ParseOptions, TemplateCache, TemplateNode};

use crate::component::{Component, Placement};
use crate::i18n::{self, Translator};
use crate::signal::Signal;
use crate::tasks::TaskQueue;
use crate::timers::{TimerId, TimerManager};
use crate::{LipsConfig, LipsError, Template};

/// Lips runtime handle
#[derive(Clone)]
pub struct Lips(Rc<LipsInner>);

struct LipsInner {
    config: LipsConfig,
    dom: SharedDom,
    templates: RefCell<IndexMap<String, Rc<Template>>>,
    cache: TemplateCache,
    context: Signal<Value>,
    language: Signal<String>,
    translator: RefCell<Option<Rc<dyn Translator>>>,
    timers: RefCell<TimerManager>,
    tasks: TaskQueue,
    next_instance: Cell<u64>,
}

impl Lips {
    /// Runtime over `dom` with the default configuration
    pub fn new(dom: SharedDom) -> Self {
        Self::build(dom, LipsConfig::default())
    }

    /// Runtime over `dom` with a validated configuration
    pub fn with_config(dom: SharedDom, config: LipsConfig) -> Result<Self, LipsError> {
        config.validate()?;
        Ok(Self::build(dom, config))
    }

    /// Runtime over a fresh `html/head/body` document
    pub fn detached() -> Self {
        Self::new(DomTree::new().into_shared())
    }

    fn build(dom: SharedDom, config: LipsConfig) -> Self {
        let cache = TemplateCache::new(ParseOptions {
            keep_indentation: config.keep_indentation,
        });
        let language = Signal::new(config.language.clone());
        Lips(Rc::new(LipsInner {
            config,
            dom,
            templates: RefCell::new(IndexMap::new()),
            cache,
            context: Signal::new(Value::empty_object()),
            language,
            translator: RefCell::new(None),
            timers: RefCell::new(TimerManager::new()),
            tasks: TaskQueue::new(),
            next_instance: Cell::new(0),
        }))
    }

    pub fn config(&self) -> &LipsConfig {
        &self.0.config
    }

    /// The DOM components render into
    pub fn dom(&self) -> &SharedDom {
        &self.0.dom
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Register a template, replacing any template of the same name
    pub fn register(&self, name: &str, template: impl Into<Rc<Template>>) -> Rc<Template> {
        let template = template.into();
        let key = name.to_ascii_lowercase();
        let replaced = self.0.templates.borrow_mut().insert(key.clone(), template.clone());
        tracing::info!(component = %key, replaced = replaced.is_some(), "registered template");
        template
    }

    /// Register a template unless the name is taken
    pub fn try_register(&self, name: &str, template: impl Into<Rc<Template>>) -> Result<Rc<Template>, LipsError> {
        if self.has(name) {
            return Err(LipsError::AlreadyRegistered(name.to_ascii_lowercase()));
        }
        Ok(self.register(name, template))
    }

    /// Remove a template; live components built from it are unaffected
    pub fn unregister(&self, name: &str) -> bool {
        let key = name.to_ascii_lowercase();
        let removed = self.0.templates.borrow_mut().shift_remove(&key).is_some();
        if removed {
            tracing::info!(component = %key, "unregistered template");
        }
        removed
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.templates.borrow().contains_key(&name.to_ascii_lowercase())
    }

    /// Look up a registered template
    pub fn import(&self, name: &str) -> Result<Rc<Template>, LipsError> {
        self.0.templates
            .borrow()
            .get(&name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| LipsError::NotFound(name.to_string()))
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.0.templates.borrow().keys().cloned().collect()
    }

    // ========================================================================
    // Instantiation
    // ========================================================================

    /// Instantiate a detached component
    pub fn render(&self, name: &str, template: impl Into<Rc<Template>>) -> Component {
        Component::create(self, name, template.into(), Value::empty_object(), Placement::Root)
    }

    /// Instantiate a registered component with `input`
    pub fn create(&self, name: &str, input: impl Into<Value>) -> Result<Component, LipsError> {
        let template = self.import(name)?;
        Ok(Component::create(self, &name.to_ascii_lowercase(), template, input.into(), Placement::Root))
    }

    /// Instantiate `template` and mount it into the element matching `selector`
    pub fn root(&self, template: impl Into<Rc<Template>>, selector: &str) -> Result<Component, LipsError> {
        let target = {
            let dom = self.0.dom.borrow();
            dom.query_selector(dom.document(), selector)
        }
        .ok_or_else(|| LipsError::TargetNotFound(selector.to_string()))?;
        let component = self.render("root", template);
        component.append_to(target)?;
        Ok(component)
    }

    // ========================================================================
    // Context and language
    // ========================================================================

    /// Snapshot of the global context
    pub fn context(&self) -> Value {
        self.0.context.get_untracked()
    }

    /// Set one global context field
    pub fn set_context(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        self.0.context.update(|ctx| {
            if ctx.set_path(&[Value::from(key)], value.clone()).is_err() {
                *ctx = Value::object([(key, value)]);
            }
        });
    }

    /// Shallow-merge an object into the global context
    pub fn merge_context(&self, partial: impl Into<Value>) {
        let partial = partial.into();
        let merged = self.0.context.get_untracked().merge(&partial);
        self.0.context.set(merged);
    }

    pub(crate) fn context_signal(&self) -> &Signal<Value> {
        &self.0.context
    }

    /// Active language code
    pub fn language(&self) -> String {
        self.0.language.get_untracked()
    }

    /// Switch the active language; every component re-renders
    pub fn set_language(&self, code: &str) {
        if self.0.language.set(code.to_string()) {
            tracing::info!(language = code, "language changed");
        }
    }

    pub(crate) fn language_signal(&self) -> &Signal<String> {
        &self.0.language
    }

    /// Install the translation delegate used for `text` attributes
    pub fn set_translator(&self, translator: impl Translator + 'static) {
        *self.0.translator.borrow_mut() = Some(Rc::new(translator));
    }

    pub fn clear_translator(&self) {
        self.0.translator.borrow_mut().take();
    }

    /// Translate through the delegate into the active language
    pub fn translate(&self, text: &str) -> String {
        let translator = self.0.translator.borrow().clone();
        i18n::translate(translator.as_deref(), text, &self.0.language.get_untracked())
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// Parsed tree for already preprocessed markup
    pub(crate) fn parse(&self, markup: &str) -> Rc<[TemplateNode]> {
        self.0.cache.get(markup)
    }

    /// Number of distinct parsed templates
    pub fn cached_templates(&self) -> usize {
        self.0.cache.len()
    }

    pub(crate) fn next_instance_id(&self) -> u64 {
        let id = self.0.next_instance.get() + 1;
        self.0.next_instance.set(id);
        id
    }

    // ========================================================================
    // Timers and tasks
    // ========================================================================

    pub fn set_timeout(&self, delay: Duration, callback: impl Fn() + 'static) -> TimerId {
        self.0.timers.borrow_mut().set_timeout(Rc::new(callback), delay, Instant::now())
    }

    pub fn set_interval(&self, period: Duration, callback: impl Fn() + 'static) -> TimerId {
        self.0.timers.borrow_mut().set_interval(Rc::new(callback), period, Instant::now())
    }

    pub fn clear_timer(&self, id: TimerId) -> bool {
        self.0.timers.borrow_mut().clear(id)
    }

    /// Fire every timer due now
    pub fn run_timers(&self) -> usize {
        self.run_timers_at(Instant::now())
    }

    /// Fire every timer due at `now`; returns how many fired
    pub fn run_timers_at(&self, now: Instant) -> usize {
        let due = self.0.timers.borrow().due(now);
        let mut fired = 0;
        for id in due {
            let callback = self.0.timers.borrow_mut().fire(id, now);
            if let Some(callback) = callback {
                callback();
                fired += 1;
            }
        }
        fired
    }

    /// Number of live timers
    pub fn pending_timers(&self) -> usize {
        self.0.timers.borrow().len()
    }

    pub fn time_until_next_timer(&self) -> Option<Duration> {
        self.0.timers.borrow().time_until_next(Instant::now())
    }

    /// Run `future` on the local executor, settling the returned promise
    pub fn spawn_promise<F>(&self, future: F) -> Promise
    where
        F: Future<Output = Result<Value, Value>> + 'static,
    {
        self.0.tasks.spawn_promise(future)
    }

    /// Poll spawned tasks until they stall
    pub fn run_tasks(&self) -> usize {
        self.0.tasks.run_until_stalled()
    }
}

impl fmt::Debug for Lips {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lips")
            .field("templates", &self.names())
            .field("language", &self.language())
            .field("timers", &self.pending_timers())
            .finish()
    }
}
