//! Timers
//!
//! Host-pumped timeouts and intervals. Nothing fires on its own: the
//! embedder calls [`crate::Lips::run_timers`] (or `run_timers_at` with an
//! explicit clock) from its loop.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Timer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u32);

/// Timer callback
pub type TimerCallback = Rc<dyn Fn()>;

/// Timer entry
#[derive(Clone)]
struct Timer {
    callback: TimerCallback,
    delay: Duration,
    repeat: bool,
    due: Instant,
}

/// Timer manager
#[derive(Default)]
pub struct TimerManager {
    next_id: u32,
    timers: BTreeMap<TimerId, Timer>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn schedule(&mut self, callback: TimerCallback, delay: Duration, repeat: bool, now: Instant) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.timers.insert(id, Timer {
            callback,
            delay,
            repeat,
            due: now + delay,
        });
        id
    }

    /// Add a timeout
    pub fn set_timeout(&mut self, callback: TimerCallback, delay: Duration, now: Instant) -> TimerId {
        self.schedule(callback, delay, false, now)
    }

    /// Add an interval; a zero period is raised to 1 ms
    pub fn set_interval(&mut self, callback: TimerCallback, period: Duration, now: Instant) -> TimerId {
        self.schedule(callback, period.max(Duration::from_millis(1)), true, now)
    }

    /// Clear a timer
    pub fn clear(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn contains(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    /// Ids of timers due at `now`, earliest first
    pub fn due(&self, now: Instant) -> Vec<TimerId> {
        let mut due: Vec<(Instant, TimerId)> = self.timers.iter()
            .filter(|(_, t)| t.due <= now)
            .map(|(id, t)| (t.due, *id))
            .collect();
        due.sort();
        due.into_iter().map(|(_, id)| id).collect()
    }

    /// Take the callback of a due timer
    ///
    /// Timeouts are removed, intervals rescheduled one period after `now`.
    /// Returns `None` when the timer was cleared in the meantime.
    pub fn fire(&mut self, id: TimerId, now: Instant) -> Option<TimerCallback> {
        let timer = self.timers.get_mut(&id)?;
        let callback = timer.callback.clone();
        if timer.repeat {
            timer.due = now + timer.delay;
        } else {
            self.timers.remove(&id);
        }
        Some(callback)
    }

    /// Check if there are pending timers
    pub fn has_pending(&self) -> bool {
        !self.timers.is_empty()
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Get time until next timer fires
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.timers.values()
            .map(|t| t.due.saturating_duration_since(now))
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn noop() -> TimerCallback {
        Rc::new(|| {})
    }

    #[test]
    fn test_timer_manager() {
        let now = Instant::now();
        let mut tm = TimerManager::new();

        let id1 = tm.set_timeout(noop(), Duration::from_millis(100), now);
        let id2 = tm.set_timeout(noop(), Duration::from_millis(200), now);
        assert!(tm.has_pending());

        tm.clear(id1);
        assert!(tm.has_pending()); // Still has id2

        tm.clear(id2);
        assert!(!tm.has_pending());
    }

    #[test]
    fn test_due_order_and_timeout_removal() {
        let now = Instant::now();
        let mut tm = TimerManager::new();
        let late = tm.set_timeout(noop(), Duration::from_millis(20), now);
        let early = tm.set_timeout(noop(), Duration::from_millis(10), now);

        assert!(tm.due(now).is_empty());
        let later = now + Duration::from_millis(30);
        assert_eq!(tm.due(later), vec![early, late]);

        assert!(tm.fire(early, later).is_some());
        assert!(!tm.contains(early));
        assert!(tm.fire(early, later).is_none());
    }

    #[test]
    fn test_interval_reschedules() {
        let now = Instant::now();
        let mut tm = TimerManager::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let id = tm.set_interval(Rc::new(move || h.set(h.get() + 1)), Duration::from_millis(5), now);

        let t1 = now + Duration::from_millis(5);
        for id in tm.due(t1) {
            if let Some(cb) = tm.fire(id, t1) {
                cb();
            }
        }
        assert_eq!(hits.get(), 1);
        assert!(tm.due(t1).is_empty());
        assert_eq!(tm.time_until_next(t1), Some(Duration::from_millis(5)));

        tm.clear(id);
        assert!(tm.is_empty());
    }
}
