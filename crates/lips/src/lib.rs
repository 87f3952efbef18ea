//! Lips
//!
//! Component templating and reactivity engine.
//!
//! # Features
//! - HTML templates with directive tags (`<for>`, `<if>`, `<switch>`,
//!   `<async>`, `<let>`) and `{expr}` interpolation
//! - Signal-driven components: `input`, `state` and `context` each trigger a
//!   full re-render when they change
//! - Nested components keyed by position, reused across re-renders
//! - Per-instance scoped stylesheets
//! - Global context, active language and a translation delegate
//!
//! # Example
//! ```rust,ignore
//! use lips::{Lips, Template, Value};
//!
//! let lips = Lips::detached();
//! let counter = lips.render("counter", Template::new("<span text=\"state.count\"></span>")
//!     .state(Value::object([("count", Value::from(0))])));
//! counter.set_state(Value::object([("count", Value::from(5))]));
//! assert_eq!(counter.html(), "<span>5</span>");
//! ```

mod component;
mod config;
mod error;
mod events;
mod host;
mod i18n;
mod registry;
mod render;
mod signal;
mod tasks;
mod template;
mod timers;

pub use component::{Component, Target};
pub use config::LipsConfig;
pub use error::{DirectiveError, LipsError};
pub use events::{EventCallback, EventBus, SubscriptionId};
pub use i18n::Translator;
pub use registry::Lips;
pub use signal::{Effect, Signal, untrack};
pub use tasks::TaskQueue;
pub use template::{Handler, Template};
pub use timers::{TimerCallback, TimerId, TimerManager};

pub use lips_dom::{Dom, DomEvent, DomTree, NodeId, SharedDom, dispatch_event};
pub use lips_expr::{Deferred, EvalError, Function, Object, Promise, PromiseState, Value};
