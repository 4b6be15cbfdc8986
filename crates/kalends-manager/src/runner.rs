//! Serializing task queue
//!
//! Tasks requested while a drain is in progress (or while paused) are only
//! queued; the outermost drain picks them up in order. After each batch of
//! tasks the `drained` step runs once, so many queued actions cost a single
//! rebuild.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

/// Queue plus pause bookkeeping
///
/// Interior mutability lets the runner be shared by reference with the code
/// it calls back into, which is how reentrant requests reach the queue.
pub struct TaskRunner<T> {
    queue: RefCell<VecDeque<T>>,
    /// Pause depth per scope; a scope is removed when its depth reaches zero
    pause_depths: RefCell<IndexMap<String, usize>>,
    is_running: Cell<bool>,
}

/// Clears the running flag even when a task fails
struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<T> TaskRunner<T> {
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            pause_depths: RefCell::new(IndexMap::new()),
            is_running: Cell::new(false),
        }
    }

    /// Queue a task; the caller decides when to drain
    pub fn request(&self, task: T) {
        self.queue.borrow_mut().push_back(task);
    }

    pub fn pause(&self, scope: &str) {
        let mut depths = self.pause_depths.borrow_mut();
        *depths.entry(scope.to_string()).or_insert(0) += 1;
        tracing::trace!(scope, depth = depths[scope], "runner paused");
    }

    /// Undo one `pause(scope)`
    pub fn resume(&self, scope: &str) -> Result<()> {
        let mut depths = self.pause_depths.borrow_mut();
        let Some(depth) = depths.get_mut(scope) else {
            return Err(Error::UnbalancedResume {
                scope: scope.to_string(),
            });
        };
        *depth -= 1;
        if *depth == 0 {
            depths.shift_remove(scope);
        }
        tracing::trace!(scope, "runner resumed");
        Ok(())
    }

    pub fn is_paused(&self) -> bool {
        !self.pause_depths.borrow().is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.get()
    }

    /// Number of queued tasks
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    fn pop(&self) -> Option<T> {
        self.queue.borrow_mut().pop_front()
    }

    /// Run every queued task, then `drained`, until the queue stays empty
    ///
    /// Does nothing while paused or when a drain further up the stack is
    /// already in progress. Nothing runs when the queue is empty, so
    /// `drained` never fires without at least one task behind it.
    pub fn drain<E>(
        &self,
        mut run_task: impl FnMut(T) -> std::result::Result<(), E>,
        mut drained: impl FnMut() -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        if self.is_running.get() || self.is_paused() {
            return Ok(());
        }
        self.is_running.set(true);
        let _guard = RunningGuard(&self.is_running);

        while self.pending() > 0 {
            while let Some(task) = self.pop() {
                run_task(task)?;
            }
            drained()?;
        }
        Ok(())
    }
}

impl<T> Default for TaskRunner<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn drain_into(runner: &TaskRunner<u32>, log: &RefCell<Vec<String>>) {
        runner
            .drain(
                |task| {
                    log.borrow_mut().push(format!("task {task}"));
                    Ok::<(), Error>(())
                },
                || {
                    log.borrow_mut().push("drained".to_string());
                    Ok(())
                },
            )
            .unwrap();
    }

    #[test]
    fn test_paused_tasks_drain_with_one_rebuild() {
        let runner = TaskRunner::new();
        let log = RefCell::new(Vec::new());

        runner.pause("");
        runner.request(1);
        drain_into(&runner, &log);
        runner.request(2);
        drain_into(&runner, &log);
        assert!(log.borrow().is_empty());

        runner.resume("").unwrap();
        drain_into(&runner, &log);
        assert_eq!(*log.borrow(), vec!["task 1", "task 2", "drained"]);
    }

    #[test]
    fn test_nested_scopes_must_all_resume() {
        let runner: TaskRunner<u32> = TaskRunner::new();
        runner.pause("a");
        runner.pause("a");
        runner.pause("b");
        runner.resume("a").unwrap();
        runner.resume("b").unwrap();
        assert!(runner.is_paused());
        runner.resume("a").unwrap();
        assert!(!runner.is_paused());
    }

    #[test]
    fn test_unbalanced_resume_is_an_error() {
        let runner: TaskRunner<u32> = TaskRunner::new();
        let err = runner.resume("batch").unwrap_err();
        assert!(matches!(err, Error::UnbalancedResume { ref scope } if scope == "batch"));

        runner.pause("batch");
        runner.resume("batch").unwrap();
        assert!(runner.resume("batch").is_err());
    }

    #[test]
    fn test_empty_queue_does_not_rebuild() {
        let runner: TaskRunner<u32> = TaskRunner::new();
        let log = RefCell::new(Vec::new());
        drain_into(&runner, &log);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_reentrant_requests_run_after_current_task() {
        let runner = Rc::new(TaskRunner::new());
        let log = RefCell::new(Vec::new());
        runner.request(1);

        let inner = runner.clone();
        runner
            .drain(
                |task| {
                    if task == 1 {
                        inner.request(2);
                        // a nested drain is a no-op while the outer one runs
                        inner.drain(|_| Ok::<(), Error>(()), || Ok(()))?;
                    }
                    log.borrow_mut().push(format!("task {task}"));
                    Ok::<(), Error>(())
                },
                || {
                    log.borrow_mut().push("drained".to_string());
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(*log.borrow(), vec!["task 1", "task 2", "drained"]);
        assert!(!runner.is_running());
    }

    #[test]
    fn test_failed_task_clears_running_flag() {
        let runner = TaskRunner::new();
        runner.request(1);
        runner.request(2);
        let result = runner.drain(|_| Err(Error::plugin("boom")), || Ok(()));
        assert!(result.is_err());
        assert!(!runner.is_running());
        assert_eq!(runner.pending(), 1);
    }
}
