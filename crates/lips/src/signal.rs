//! Signals and effects
//!
//! A [`Signal`] holds a value and the effects that read it. An [`Effect`]
//! runs immediately, records every signal read during the run and re-runs
//! when one of them changes. A write that lands while the effect is running
//! marks it dirty; it runs again once the current run returns.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

thread_local! {
    /// Stack of running effects; `None` entries come from [`untrack`]
    static OBSERVER: RefCell<Vec<Option<Rc<EffectInner>>>> = const { RefCell::new(Vec::new()) };
}

fn current_observer() -> Option<Rc<EffectInner>> {
    OBSERVER.with(|o| o.borrow().last().cloned().flatten())
}

struct ObserverGuard;

impl ObserverGuard {
    fn push(effect: Option<Rc<EffectInner>>) -> Self {
        OBSERVER.with(|o| o.borrow_mut().push(effect));
        ObserverGuard
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        OBSERVER.with(|o| {
            o.borrow_mut().pop();
        });
    }
}

/// Run `f` without recording signal reads
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _guard = ObserverGuard::push(None);
    f()
}

/// Something an effect can depend on
trait Source {
    fn unsubscribe(&self, effect: &Rc<EffectInner>);
}

struct SignalInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<Weak<EffectInner>>>,
}

impl<T> Source for SignalInner<T> {
    fn unsubscribe(&self, effect: &Rc<EffectInner>) {
        self.subscribers
            .borrow_mut()
            .retain(|s| s.strong_count() > 0 && !std::ptr::eq(s.as_ptr(), Rc::as_ptr(effect)));
    }
}

/// Reactive value cell
pub struct Signal<T>(Rc<SignalInner<T>>);

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal(self.0.clone())
    }
}

impl<T: Clone + PartialEq + 'static> Signal<T> {
    pub fn new(value: T) -> Self {
        Signal(Rc::new(SignalInner {
            value: RefCell::new(value),
            subscribers: RefCell::new(Vec::new()),
        }))
    }

    /// Current value; subscribes the running effect
    pub fn get(&self) -> T {
        self.track();
        self.0.value.borrow().clone()
    }

    /// Current value without subscribing
    pub fn get_untracked(&self) -> T {
        self.0.value.borrow().clone()
    }

    /// Borrow the value; subscribes the running effect
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.0.value.borrow())
    }

    /// Replace the value and notify subscribers
    ///
    /// Returns `false` without notifying when the new value equals the old.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.0.value.borrow_mut();
            if *current == value {
                return false;
            }
            *current = value;
        }
        self.notify();
        true
    }

    /// Mutate in place and notify when the value changed
    pub fn update(&self, f: impl FnOnce(&mut T)) -> bool {
        let mut next = self.get_untracked();
        f(&mut next);
        self.set(next)
    }

    /// Mutate in place without notifying anyone
    pub fn update_silent<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.0.value.borrow_mut())
    }

    /// Re-run every subscriber, changed or not
    pub fn notify(&self) {
        let subscribers: Vec<Rc<EffectInner>> = {
            let mut subs = self.0.subscribers.borrow_mut();
            subs.retain(|s| s.strong_count() > 0);
            subs.iter().filter_map(Weak::upgrade).collect()
        };
        for effect in subscribers {
            EffectInner::run(&effect);
        }
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.0.subscribers.borrow().iter().filter(|s| s.strong_count() > 0).count()
    }

    fn track(&self) {
        let Some(effect) = current_observer() else { return };

        {
            let mut subs = self.0.subscribers.borrow_mut();
            if subs.iter().any(|s| std::ptr::eq(s.as_ptr(), Rc::as_ptr(&effect))) {
                return;
            }
            subs.push(Rc::downgrade(&effect));
        }
        let source: Rc<dyn Source> = self.0.clone();
        effect.sources.borrow_mut().push(Rc::downgrade(&source));
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&self.0.value.borrow()).finish()
    }
}

type EffectFn = Box<dyn FnMut()>;

struct EffectInner {
    f: RefCell<Option<EffectFn>>,
    sources: RefCell<Vec<Weak<dyn Source>>>,
    running: Cell<bool>,
    dirty: Cell<bool>,
    disposed: Cell<bool>,
}

impl EffectInner {
    fn run(this: &Rc<EffectInner>) {
        if this.disposed.get() {
            return;
        }
        if this.running.get() {
            this.dirty.set(true);
            return;
        }

        this.running.set(true);
        loop {
            this.dirty.set(false);
            this.clear_sources();

            let Some(mut f) = this.f.borrow_mut().take() else { break };
            {
                let _guard = ObserverGuard::push(Some(this.clone()));
                f();
            }
            if this.disposed.get() {
                break;
            }
            *this.f.borrow_mut() = Some(f);

            if !this.dirty.get() {
                break;
            }
        }
        this.running.set(false);
    }

    fn clear_sources(self: &Rc<Self>) {
        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        for source in sources.iter().filter_map(Weak::upgrade) {
            source.unsubscribe(self);
        }
    }
}

/// Handle to a running effect
///
/// Dropping the last handle stops the effect.
#[derive(Clone)]
pub struct Effect(Rc<EffectInner>);

impl Effect {
    /// Create an effect and run it once
    pub fn new(f: impl FnMut() + 'static) -> Self {
        let inner = Rc::new(EffectInner {
            f: RefCell::new(Some(Box::new(f))),
            sources: RefCell::new(Vec::new()),
            running: Cell::new(false),
            dirty: Cell::new(false),
            disposed: Cell::new(false),
        });
        EffectInner::run(&inner);
        Effect(inner)
    }

    /// Run again now
    pub fn run(&self) {
        EffectInner::run(&self.0);
    }

    /// Stop the effect and release its closure
    pub fn dispose(&self) {
        self.0.disposed.set(true);
        self.0.clear_sources();
        self.0.f.borrow_mut().take();
    }

    pub fn is_disposed(&self) -> bool {
        self.0.disposed.get()
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("running", &self.0.running.get())
            .field("disposed", &self.0.disposed.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effect_tracks_reads() {
        let count = Signal::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let (c, s) = (count.clone(), seen.clone());
        let _effect = Effect::new(move || s.borrow_mut().push(c.get()));

        count.set(2);
        count.set(2);
        count.set(3);
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn test_untrack() {
        let a = Signal::new(0);
        let b = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        let (a2, b2, r) = (a.clone(), b.clone(), runs.clone());
        let _effect = Effect::new(move || {
            a2.get();
            untrack(|| b2.get());
            r.set(r.get() + 1);
        });

        b.set(1);
        assert_eq!(runs.get(), 1);
        a.set(1);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_write_during_run_reruns() {
        let n = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        let (n2, r) = (n.clone(), runs.clone());
        let _effect = Effect::new(move || {
            r.set(r.get() + 1);
            if n2.get() < 3 {
                n2.set(n2.get_untracked() + 1);
            }
        });

        assert_eq!(n.get_untracked(), 3);
        assert_eq!(runs.get(), 4);
    }

    #[test]
    fn test_dispose_and_drop_stop_effect() {
        let n = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        let (n2, r) = (n.clone(), runs.clone());
        let effect = Effect::new(move || {
            n2.get();
            r.set(r.get() + 1);
        });
        effect.dispose();
        n.set(1);
        assert_eq!(runs.get(), 1);
        assert_eq!(n.subscriber_count(), 0);

        let (n3, r) = (n.clone(), runs.clone());
        let effect = Effect::new(move || {
            n3.get();
            r.set(r.get() + 1);
        });
        drop(effect);
        n.set(2);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_manual_run_and_disposed_flag() {
        let runs = Rc::new(Cell::new(0));
        let r = runs.clone();
        let effect = Effect::new(move || r.set(r.get() + 1));
        assert!(!effect.is_disposed());

        effect.run();
        assert_eq!(runs.get(), 2);

        effect.dispose();
        assert!(effect.is_disposed());
        effect.run();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_silent_update_then_notify() {
        let n = Signal::new(0);
        let runs = Rc::new(Cell::new(0));
        let (n2, r) = (n.clone(), runs.clone());
        let _effect = Effect::new(move || {
            n2.get();
            r.set(r.get() + 1);
        });

        n.update_silent(|v| *v = 5);
        assert_eq!(runs.get(), 1);
        n.notify();
        assert_eq!(runs.get(), 2);
    }
}
