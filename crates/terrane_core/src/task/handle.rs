//! # Task Handles
//!
//! The shared, thread-safe wrapper around a [`Task`] value.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use web_time::Instant;

use super::{CancellationToken, Task, TaskError, TaskId, TaskOutcome, TaskReport, TaskState};
use crate::error::{CoreError, CoreResult};
use crate::sync::CompletionSignal;

type Observer = Box<dyn FnOnce(&TaskReport) + Send>;

#[derive(Debug, Default, Clone, Copy)]
struct Timing {
    started: Option<Instant>,
    finished: Option<Instant>,
}

struct Shared<T> {
    id: TaskId,
    cancel: CancellationToken,
    state: AtomicU8,
    /// `None` only while the body runs.
    task: Mutex<Option<T>>,
    timing: Mutex<Timing>,
    report: Mutex<Option<TaskReport>>,
    observers: Mutex<Vec<Observer>>,
    done: CompletionSignal,
}

/// Shared handle to a task: identity, cancellation, lifecycle, notification.
///
/// Building a handle is the task's initialization: it binds the identity and
/// cancellation token exactly once, before anything can execute it. Clones
/// refer to the same task.
///
/// # Example
///
/// ```rust,ignore
/// let handle = TaskHandle::new(TaskId::next(), CancellationToken::new(), MyTask::default());
/// handle.on_finished(|report| println!("{} took {:?}", report.id, report.elapsed));
/// handle.execute()?;
/// let task = handle.take_task().expect("done");
/// ```
pub struct TaskHandle<T: Task> {
    shared: Arc<Shared<T>>,
}

impl<T: Task> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Task> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T: Task> TaskHandle<T> {
    /// Binds identity and cancellation to `task`.
    #[must_use]
    pub fn new(id: TaskId, cancel: CancellationToken, task: T) -> Self {
        Self {
            shared: Arc::new(Shared {
                id,
                cancel,
                state: AtomicU8::new(TaskState::Created as u8),
                task: Mutex::new(Some(task)),
                timing: Mutex::new(Timing::default()),
                report: Mutex::new(None),
                observers: Mutex::new(Vec::new()),
                done: CompletionSignal::new(),
            }),
        }
    }

    /// Task identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// The token the body polls.
    #[inline]
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.shared.cancel
    }

    /// Requests cooperative cancellation.
    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    /// Returns true once the task is `Done`.
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.state() == TaskState::Done
    }

    /// When `execute()` started.
    #[must_use]
    pub fn started_at(&self) -> Option<Instant> {
        self.shared.timing.lock().started
    }

    /// When the task finished.
    #[must_use]
    pub fn finished_at(&self) -> Option<Instant> {
        self.shared.timing.lock().finished
    }

    /// Elapsed time between start and finish, once `Done`.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let timing = *self.shared.timing.lock();
        Some(timing.finished?.duration_since(timing.started?))
    }

    /// The final report, once `Done`.
    #[must_use]
    pub fn report(&self) -> Option<TaskReport> {
        self.shared.report.lock().clone()
    }

    /// Registers a finished observer.
    ///
    /// Observers run once, on the thread that finishes the task. Registering
    /// after `Done` runs the observer immediately on the calling thread.
    pub fn on_finished<F>(&self, observer: F)
    where
        F: FnOnce(&TaskReport) + Send + 'static,
    {
        let mut observers = self.shared.observers.lock();
        if self.shared.state() == TaskState::Done {
            drop(observers);
            if let Some(report) = self.report() {
                notify(Box::new(observer), &report);
            }
        } else {
            observers.push(Box::new(observer));
        }
    }

    /// Blocks until the task is `Done` and every observer registered before
    /// completion has returned.
    ///
    /// Must not be called from inside one of this task's observers.
    pub fn wait(&self) {
        self.shared.done.wait();
    }

    /// [`wait`](Self::wait) with a timeout.
    ///
    /// Returns true if the task is done and its observers have run.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.shared.done.wait_timeout(timeout)
    }

    /// Runs the task on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::AlreadyExecuted`] if the task is not in the
    /// `Created` state. The task is left untouched in that case.
    pub fn execute(&self) -> CoreResult<TaskReport> {
        self.shared.execute()
    }

    /// Takes the task value back out, once `Done`.
    ///
    /// Returns `None` before `Done` or if it was already taken.
    #[must_use]
    pub fn take_task(&self) -> Option<T> {
        if !self.is_done() {
            return None;
        }
        self.shared.task.lock().take()
    }

    /// Runs `f` against the task value, if it is not currently executing.
    pub fn with_task<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.shared.task.lock().as_ref().map(f)
    }

    /// Type-erased view for the scheduler queue.
    pub(crate) fn as_job(&self) -> Arc<dyn Job> {
        Arc::clone(&self.shared) as Arc<dyn Job>
    }
}

/// Type-erased task as seen by the scheduler.
pub(crate) trait Job: Send + Sync {
    fn id(&self) -> TaskId;
    fn cancel(&self);
    fn run(&self) -> CoreResult<TaskReport>;
    /// Completes a task that never started as `Cancelled`, without running it.
    fn skip(&self) -> Option<TaskReport>;
}

impl<T: Task> Job for Shared<T> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn run(&self) -> CoreResult<TaskReport> {
        self.execute()
    }

    fn skip(&self) -> Option<TaskReport> {
        if !self.claim() {
            return None;
        }
        let now = Instant::now();
        self.timing.lock().started = Some(now);
        Some(self.finish(now, TaskOutcome::Cancelled))
    }
}

impl<T: Task> Shared<T> {
    fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Created -> Running. Only one caller ever wins.
    fn claim(&self) -> bool {
        self.state
            .compare_exchange(
                TaskState::Created as u8,
                TaskState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    fn execute(&self) -> CoreResult<TaskReport> {
        if !self.claim() {
            return Err(CoreError::AlreadyExecuted { id: self.id });
        }

        let started = Instant::now();
        self.timing.lock().started = Some(started);

        // Run without holding the lock so readers never block on the body.
        let mut task = self.task.lock().take();
        let outcome = match task.as_mut() {
            Some(task) => run_body(task, &self.cancel),
            None => TaskOutcome::Faulted(TaskError::failed("task value was taken before execution")),
        };
        *self.task.lock() = task;

        Ok(self.finish(started, outcome))
    }

    /// Records timing, publishes the report, sets `Done`, notifies the
    /// observers, and only then wakes `wait()` callers.
    fn finish(&self, started: Instant, outcome: TaskOutcome) -> TaskReport {
        let finished = Instant::now();
        self.timing.lock().finished = Some(finished);

        let report = TaskReport {
            id: self.id,
            outcome,
            elapsed: finished.duration_since(started),
        };
        *self.report.lock() = Some(report.clone());

        self.state.store(TaskState::Done as u8, Ordering::Release);

        let observers = std::mem::take(&mut *self.observers.lock());
        for observer in observers {
            notify(observer, &report);
        }

        self.done.signal();
        report
    }
}

fn run_body<T: Task>(task: &mut T, cancel: &CancellationToken) -> TaskOutcome {
    let body = panic::catch_unwind(AssertUnwindSafe(|| task.process(cancel)));
    let mut outcome = match body {
        Ok(Ok(())) if cancel.is_cancelled() => TaskOutcome::Cancelled,
        Ok(Ok(())) => TaskOutcome::Completed,
        Ok(Err(err)) => TaskOutcome::Faulted(err),
        Err(payload) => TaskOutcome::Faulted(TaskError::Panicked(panic_message(payload.as_ref()))),
    };

    let hook = panic::catch_unwind(AssertUnwindSafe(|| task.process_finished()));
    if let Err(payload) = hook {
        if outcome.fault().is_none() {
            outcome = TaskOutcome::Faulted(TaskError::Panicked(panic_message(payload.as_ref())));
        }
    }
    outcome
}

fn notify(observer: Observer, report: &TaskReport) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer(report))) {
        tracing::warn!(
            "finished observer for task {} panicked: {}",
            report.id,
            panic_message(payload.as_ref())
        );
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    /// Counts loop iterations, polling the token each step.
    #[derive(Default)]
    struct Counter {
        limit: usize,
        count: usize,
        finished_hook_ran: bool,
    }

    impl Task for Counter {
        fn process(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
            for _ in 0..self.limit {
                if cancel.is_cancelled() {
                    return Ok(());
                }
                self.count += 1;
            }
            Ok(())
        }

        fn process_finished(&mut self) {
            self.finished_hook_ran = true;
        }
    }

    struct Panicker;

    impl Task for Panicker {
        fn process(&mut self, _cancel: &CancellationToken) -> Result<(), TaskError> {
            panic!("noise table corrupted");
        }
    }

    fn counter(limit: usize) -> TaskHandle<Counter> {
        TaskHandle::new(
            TaskId::next(),
            CancellationToken::new(),
            Counter { limit, ..Counter::default() },
        )
    }

    #[test]
    fn test_execute_runs_body_and_hook() {
        let handle = counter(100);
        assert_eq!(handle.state(), TaskState::Created);

        let report = handle.execute().unwrap();
        assert!(report.outcome.is_completed());
        assert!(handle.is_done());
        assert!(handle.elapsed().is_some());
        assert!(handle.finished_at().unwrap() >= handle.started_at().unwrap());

        let task = handle.take_task().unwrap();
        assert_eq!(task.count, 100);
        assert!(task.finished_hook_ran);
    }

    #[test]
    fn test_second_execute_rejected() {
        let handle = counter(1);
        handle.execute().unwrap();

        assert_eq!(
            handle.execute(),
            Err(CoreError::AlreadyExecuted { id: handle.id() })
        );
    }

    #[test]
    fn test_concurrent_execute_runs_once() {
        let handle = counter(10_000);
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = handle.clone();
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if handle.execute().is_ok() {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(handle.take_task().unwrap().count, 10_000);
    }

    #[test]
    fn test_cancelled_before_start_returns_early() {
        let handle = counter(1_000_000);
        handle.cancel();

        let report = handle.execute().unwrap();
        assert!(report.outcome.is_cancelled());
        assert!(handle.is_done(), "cancelled tasks still reach Done");
        assert_eq!(handle.take_task().unwrap().count, 0);
    }

    #[test]
    fn test_observer_sees_done_state() {
        let handle = counter(5);
        let seen_done = Arc::new(AtomicUsize::new(0));

        {
            let observed = handle.clone();
            let seen_done = Arc::clone(&seen_done);
            handle.on_finished(move |report| {
                assert_eq!(report.id, observed.id());
                if observed.is_done() {
                    seen_done.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        handle.execute().unwrap();
        assert_eq!(seen_done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_observer_runs_immediately() {
        let handle = counter(5);
        handle.execute().unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        handle.on_finished(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wait_returns_after_observers() {
        let handle = counter(10);
        let consumed = Arc::new(AtomicUsize::new(0));

        let observer_handle = handle.clone();
        let c = Arc::clone(&consumed);
        handle.on_finished(move |_| {
            thread::sleep(Duration::from_millis(50));
            if observer_handle.take_task().is_some() {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        let runner = {
            let handle = handle.clone();
            thread::spawn(move || handle.execute().unwrap())
        };

        handle.wait();
        assert_eq!(consumed.load(Ordering::SeqCst), 1, "observer ran before wait returned");
        assert!(handle.take_task().is_none(), "observer already took the output");
        runner.join().unwrap();
    }

    #[test]
    fn test_panic_becomes_fault() {
        let handle = TaskHandle::new(TaskId::new(9), CancellationToken::new(), Panicker);
        let report = handle.execute().unwrap();

        assert_eq!(
            report.outcome,
            TaskOutcome::Faulted(TaskError::Panicked("noise table corrupted".to_string()))
        );
        assert!(handle.is_done());
        assert!(handle.take_task().is_some());
    }

    #[test]
    fn test_skip_completes_without_running() {
        let handle = counter(10);
        let job = handle.as_job();

        let report = job.skip().unwrap();
        assert!(report.outcome.is_cancelled());
        assert!(job.skip().is_none(), "skip only wins once");
        assert_eq!(handle.take_task().unwrap().count, 0);
    }
}
