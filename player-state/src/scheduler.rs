//! Deferred work for the persistence layer
//!
//! Debounced writes need a way to run a closure later and to cancel it. The
//! [`Scheduler`] trait is that seam. Two implementations are provided:
//!
//! - [`ManualScheduler`]: a virtual clock advanced explicitly, for tests and
//!   for hosts that drive time themselves (e.g. a frame loop)
//! - [`TokioScheduler`]: real timers on a tokio `LocalSet`
//!
//! Scheduled closures are not `Send`; everything runs on the thread that owns
//! the store.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::task::AbortHandle;
use tracing::{trace, warn};

/// Identifies a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// Runs closures after a delay
pub trait Scheduler {
    /// Run `task` once `delay` has elapsed
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId;

    /// Cancel a task that has not run yet. Unknown or finished ids are ignored.
    fn cancel(&self, id: TimerId);
}

impl<S: Scheduler + ?Sized> Scheduler for Rc<S> {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
        (**self).schedule(delay, task)
    }

    fn cancel(&self, id: TimerId) {
        (**self).cancel(id)
    }
}

struct ManualTask {
    id: TimerId,
    due: Duration,
    task: Box<dyn FnOnce()>,
}

/// A scheduler driven by a virtual clock
///
/// Nothing runs until [`advance`](ManualScheduler::advance) is called. Tasks
/// due at the same instant run in scheduling order.
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use std::time::Duration;
/// use player_state::{ManualScheduler, Scheduler};
///
/// let scheduler = ManualScheduler::new();
/// let fired = Rc::new(Cell::new(false));
/// {
///     let fired = Rc::clone(&fired);
///     scheduler.schedule(Duration::from_millis(250), Box::new(move || fired.set(true)));
/// }
///
/// scheduler.advance(Duration::from_millis(249));
/// assert!(!fired.get());
/// scheduler.advance(Duration::from_millis(1));
/// assert!(fired.get());
/// ```
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    tasks: RefCell<Vec<ManualTask>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward, running every task that falls due
    ///
    /// Tasks scheduled by running tasks also run if they fall due before the
    /// new time.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        loop {
            let next = {
                let mut tasks = self.tasks.borrow_mut();
                let index = tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, task)| task.due <= target)
                    .min_by_key(|(_, task)| (task.due, task.id))
                    .map(|(index, _)| index);
                index.map(|index| tasks.remove(index))
            };
            let Some(next) = next else { break };

            self.now.set(next.due);
            trace!(timer = %next.id, "Running manual timer");
            (next.task)();
        }
        self.now.set(target);
    }

    /// Virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        self.now.get()
    }

    /// Number of tasks waiting to run
    pub fn pending_count(&self) -> usize {
        self.tasks.borrow().len()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.tasks.borrow_mut().push(ManualTask {
            id,
            due: self.now.get() + delay,
            task,
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        self.tasks.borrow_mut().retain(|task| task.id != id);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("elapsed", &self.now.get())
            .field("pending", &self.pending_count())
            .finish()
    }
}

type TimerMap = RefCell<HashMap<TimerId, AbortHandle>>;

/// A scheduler backed by tokio timers
///
/// Tasks are spawned with [`tokio::task::spawn_local`], so scheduling must
/// happen inside a [`tokio::task::LocalSet`]. Outside one the task is
/// dropped with a warning and never runs; a [`StorageSync`] then only writes
/// on `flush` or `stop`. Dropping the scheduler aborts every task that has
/// not run yet.
///
/// [`StorageSync`]: crate::StorageSync
#[derive(Default)]
pub struct TokioScheduler {
    next_id: Cell<u64>,
    timers: Rc<TimerMap>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run
    pub fn pending_count(&self) -> usize {
        self.timers.borrow().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Box<dyn FnOnce()>) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        if tokio::runtime::Handle::try_current().is_err() {
            warn!(timer = %id, "No tokio runtime; scheduled task dropped");
            return id;
        }

        let timers: Weak<TimerMap> = Rc::downgrade(&self.timers);
        let future = async move {
            tokio::time::sleep(delay).await;
            if let Some(timers) = timers.upgrade() {
                timers.borrow_mut().remove(&id);
            }
            trace!(timer = %id, "Running tokio timer");
            task();
        };
        // spawn_local panics when called outside a LocalSet
        let spawned = panic::catch_unwind(AssertUnwindSafe(|| tokio::task::spawn_local(future)));
        let Ok(handle) = spawned else {
            warn!(timer = %id, "Not inside a tokio LocalSet; scheduled task dropped");
            return id;
        };

        // Not polled until the caller yields, so it cannot have finished yet
        self.timers.borrow_mut().insert(id, handle.abort_handle());
        id
    }

    fn cancel(&self, id: TimerId) {
        if let Some(handle) = self.timers.borrow_mut().remove(&id) {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.borrow_mut().drain() {
            handle.abort();
        }
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<RefCell<Vec<u32>>>, impl Fn(u32) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = Rc::clone(&log);
            move |n: u32| -> Box<dyn FnOnce()> {
                let log = Rc::clone(&log);
                Box::new(move || log.borrow_mut().push(n))
            }
        };
        (log, make)
    }

    #[test]
    fn test_manual_runs_in_due_order() {
        let scheduler = ManualScheduler::new();
        let (log, task) = counter();

        scheduler.schedule(Duration::from_millis(300), task(3));
        scheduler.schedule(Duration::from_millis(100), task(1));
        scheduler.schedule(Duration::from_millis(100), task(2));

        scheduler.advance(Duration::from_millis(200));
        assert_eq!(*log.borrow(), vec![1, 2]);
        assert_eq!(scheduler.pending_count(), 1);

        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
        assert_eq!(scheduler.elapsed(), Duration::from_millis(300));
    }

    #[test]
    fn test_manual_cancel() {
        let scheduler = ManualScheduler::new();
        let (log, task) = counter();

        let id = scheduler.schedule(Duration::from_millis(10), task(1));
        scheduler.cancel(id);
        scheduler.cancel(id);
        scheduler.advance(Duration::from_secs(1));

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_manual_task_scheduled_by_task() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (log, task) = counter();
        let second = task(2);
        {
            let inner = Rc::clone(&scheduler);
            let first = task(1);
            scheduler.schedule(
                Duration::from_millis(10),
                Box::new(move || {
                    first();
                    inner.schedule(Duration::from_millis(10), second);
                }),
            );
        }

        scheduler.advance(Duration::from_millis(25));
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_fires_after_delay() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let (log, task) = counter();

                scheduler.schedule(Duration::from_millis(100), task(1));
                tokio::time::sleep(Duration::from_millis(50)).await;
                assert!(log.borrow().is_empty());
                assert_eq!(scheduler.pending_count(), 1);

                tokio::time::sleep(Duration::from_millis(60)).await;
                assert_eq!(*log.borrow(), vec![1]);
                assert_eq!(scheduler.pending_count(), 0);
            })
            .await;
    }

    #[test]
    fn test_tokio_scheduler_without_runtime_drops_task() {
        let scheduler = TokioScheduler::new();
        let (log, task) = counter();

        scheduler.schedule(Duration::from_millis(10), task(1));
        assert_eq!(scheduler.pending_count(), 0);
        assert!(log.borrow().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_without_local_set_drops_task() {
        let scheduler = TokioScheduler::new();
        let (log, task) = counter();

        scheduler.schedule(Duration::from_millis(10), task(1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(scheduler.pending_count(), 0);
        assert!(log.borrow().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_cancel() {
        let local = tokio::task::LocalSet::new();
        local
            .run_until(async {
                let scheduler = TokioScheduler::new();
                let (log, task) = counter();

                let id = scheduler.schedule(Duration::from_millis(100), task(1));
                scheduler.cancel(id);
                tokio::time::sleep(Duration::from_millis(200)).await;
                assert!(log.borrow().is_empty());
            })
            .await;
    }
}
