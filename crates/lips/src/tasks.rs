//! Future to promise bridge
//!
//! Rust futures run on a single-threaded `smol::LocalExecutor` owned by the
//! runtime. The host drives it with [`TaskQueue::run_until_stalled`] (or
//! `Lips::run_tasks`) alongside its timer pump.

use std::future::Future;

use lips_expr::{Promise, Value};
use smol::LocalExecutor;

/// Local executor for promise-producing tasks
pub struct TaskQueue {
    executor: LocalExecutor<'static>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        Self { executor: LocalExecutor::new() }
    }

    /// Spawn `future`; the returned promise settles with its outcome
    pub fn spawn_promise<F>(&self, future: F) -> Promise
    where
        F: Future<Output = Result<Value, Value>> + 'static,
    {
        let (promise, deferred) = Promise::pending();
        self.executor
            .spawn(async move {
                match future.await {
                    Ok(value) => deferred.resolve(value),
                    Err(reason) => deferred.reject(reason),
                }
            })
            .detach();
        promise
    }

    /// Poll ready tasks until none can make progress; returns the steps taken
    pub fn run_until_stalled(&self) -> usize {
        let mut steps = 0;
        while self.executor.try_tick() {
            steps += 1;
        }
        steps
    }

    /// Whether no task is left
    pub fn is_idle(&self) -> bool {
        self.executor.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lips_expr::PromiseState;

    #[test]
    fn test_spawn_promise_settles_when_polled() {
        let tasks = TaskQueue::new();
        let promise = tasks.spawn_promise(async { Ok(Value::from(7)) });
        assert!(promise.is_pending());

        tasks.run_until_stalled();
        assert_eq!(promise.state(), PromiseState::Fulfilled(Value::from(7)));
        assert!(tasks.is_idle());
    }

    #[test]
    fn test_spawn_promise_waits_on_channel() {
        let tasks = TaskQueue::new();
        let (tx, rx) = smol::channel::bounded::<String>(1);
        let promise = tasks.spawn_promise(async move {
            rx.recv().await.map(Value::from).map_err(|e| Value::from(e.to_string()))
        });

        tasks.run_until_stalled();
        assert!(promise.is_pending());

        tx.try_send("ready".to_string()).unwrap();
        tasks.run_until_stalled();
        assert_eq!(promise.state(), PromiseState::Fulfilled(Value::from("ready")));
    }
}
