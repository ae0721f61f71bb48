//! # Worker-Pool Scheduler
//!
//! A fixed pool of worker threads consuming one shared FIFO queue.
//!
//! ## Architecture
//!
//! ```text
//!   enqueue() ──┐
//!   enqueue() ──┼──> [FIFO Queue] ──> Worker 1 ──┐
//!   enqueue() ──┘     (Mutex +        Worker 2 ──┼──> fault channel
//!                      Condvar)       Worker N ──┘    timing buffer
//! ```
//!
//! Each task occupies one worker for its whole `execute()`. No ordering is
//! guaranteed across workers; the queue itself is first-in first-out.
//!
//! ## Abort Policy
//!
//! `abort()` cancels every queued and running task and closes the scheduler:
//! `enqueue()` fails with [`CoreError::SchedulerAborted`] until [`Scheduler::reset`]
//! is called. With `wait_for_completion`, queued tasks are completed as
//! cancelled on the calling thread and the call blocks until running tasks
//! have finished and notified, so no finished notification fires afterwards.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::diagnostics::{TimingBuffer, TimingSample};
use crate::error::{CoreError, CoreResult};
use crate::task::{Job, Task, TaskError, TaskHandle, TaskId, TaskOutcome};

/// Configuration for the worker pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fraction of the available CPU parallelism to use, in `(0, 1]`.
    pub core_utilization: f32,
    /// Explicit worker count. Overrides `core_utilization` when set.
    pub workers: Option<usize>,
    /// Capacity of the timing diagnostics buffer.
    pub diagnostics_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            core_utilization: 1.0,
            workers: None,
            diagnostics_capacity: 1024,
        }
    }
}

impl SchedulerConfig {
    /// Config with an explicit worker count.
    #[must_use]
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: Some(workers),
            ..Self::default()
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] for a utilization outside `(0, 1]`
    /// or an explicit worker count of zero.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.core_utilization > 0.0 && self.core_utilization <= 1.0) {
            return Err(CoreError::InvalidConfig(format!(
                "core_utilization must be in (0, 1], got {}",
                self.core_utilization
            )));
        }
        if self.workers == Some(0) {
            return Err(CoreError::InvalidConfig("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Number of workers this config resolves to on the current machine.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        if let Some(workers) = self.workers {
            return workers.max(1);
        }
        let available = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        let scaled = (available as f32 * self.core_utilization).round() as usize;
        scaled.clamp(1, available)
    }
}

/// A fault caught at the worker boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskFaultReport {
    /// The faulting task.
    pub id: TaskId,
    /// What went wrong.
    pub error: TaskError,
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Arc<dyn Job>>,
    running: Vec<Arc<dyn Job>>,
    aborted: bool,
    shutdown: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    /// Signalled when a job is queued or on shutdown.
    work_available: Condvar,
    /// Signalled when nothing is queued or running.
    idle: Condvar,
    faults: Sender<TaskFaultReport>,
    timings: Arc<TimingBuffer>,
}

/// Fixed-size worker pool.
pub struct Scheduler {
    inner: Arc<Inner>,
    workers: Vec<JoinHandle<()>>,
    fault_receiver: Receiver<TaskFaultReport>,
}

impl Scheduler {
    /// Starts the worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConfig`] for a bad config, or
    /// [`CoreError::WorkerSpawn`] if a thread cannot be created. Workers
    /// spawned before the failure are shut down.
    pub fn new(config: &SchedulerConfig) -> CoreResult<Self> {
        config.validate()?;

        let (faults, fault_receiver) = unbounded();
        let inner = Arc::new(Inner {
            state: Mutex::new(QueueState::default()),
            work_available: Condvar::new(),
            idle: Condvar::new(),
            faults,
            timings: Arc::new(TimingBuffer::new(config.diagnostics_capacity)),
        });

        let worker_count = config.worker_count();
        let mut scheduler = Self {
            inner,
            workers: Vec::with_capacity(worker_count),
            fault_receiver,
        };

        for index in 0..worker_count {
            let inner = Arc::clone(&scheduler.inner);
            let handle = thread::Builder::new()
                .name(format!("terrane-worker-{index}"))
                .spawn(move || worker_loop(&inner))
                .map_err(|e| CoreError::WorkerSpawn(e.to_string()))?;
            scheduler.workers.push(handle);
        }

        tracing::info!("scheduler started with {} workers", worker_count);
        Ok(scheduler)
    }

    /// Queues a task for execution by the next free worker.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SchedulerAborted`] after an abort, until reset.
    pub fn enqueue<T: Task>(&self, handle: &TaskHandle<T>) -> CoreResult<()> {
        let mut state = self.inner.state.lock();
        if state.aborted || state.shutdown {
            return Err(CoreError::SchedulerAborted);
        }
        state.jobs.push_back(handle.as_job());
        self.inner.work_available.notify_one();
        Ok(())
    }

    /// Cancels every queued and running task and stops accepting work.
    ///
    /// With `wait_for_completion`, blocks until every task that was queued or
    /// running has reached `Done` and fired its notification.
    pub fn abort(&self, wait_for_completion: bool) {
        let drained: Vec<Arc<dyn Job>> = {
            let mut state = self.inner.state.lock();
            state.aborted = true;
            for job in state.jobs.iter().chain(state.running.iter()) {
                job.cancel();
            }
            tracing::info!(
                "scheduler abort: {} queued, {} running, wait = {}",
                state.jobs.len(),
                state.running.len(),
                wait_for_completion
            );
            if wait_for_completion {
                state.jobs.drain(..).collect()
            } else {
                Vec::new()
            }
        };

        if !wait_for_completion {
            return;
        }

        // Never-started tasks finish here, on the aborting thread.
        for job in drained {
            if let Some(report) = job.skip() {
                self.inner.publish(&report.outcome, report.id, report.elapsed);
            }
        }

        let mut state = self.inner.state.lock();
        while !state.running.is_empty() {
            self.inner.idle.wait(&mut state);
        }
    }

    /// Re-opens the scheduler after an abort.
    pub fn reset(&self) {
        let mut state = self.inner.state.lock();
        if state.aborted {
            state.aborted = false;
            tracing::info!("scheduler reset");
        }
    }

    /// Returns true while enqueues are refused.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.inner.state.lock().aborted
    }

    /// Blocks until nothing is queued or running.
    pub fn wait_idle(&self) {
        let mut state = self.inner.state.lock();
        while !(state.jobs.is_empty() && state.running.is_empty()) {
            self.inner.idle.wait(&mut state);
        }
    }

    /// Number of tasks waiting for a worker.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().jobs.len()
    }

    /// Number of tasks currently executing.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().running.len()
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Receiver for faults caught at the worker boundary.
    #[must_use]
    pub fn faults(&self) -> Receiver<TaskFaultReport> {
        self.fault_receiver.clone()
    }

    /// Per-task timing samples.
    #[must_use]
    pub fn timings(&self) -> Arc<TimingBuffer> {
        Arc::clone(&self.inner.timings)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.abort(true);

        {
            let mut state = self.inner.state.lock();
            state.shutdown = true;
            self.inner.work_available.notify_all();
        }

        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        tracing::info!("scheduler shut down");
    }
}

impl Inner {
    fn publish(&self, outcome: &TaskOutcome, id: TaskId, elapsed: std::time::Duration) {
        if let TaskOutcome::Faulted(error) = outcome {
            tracing::warn!("task {} faulted: {}", id, error);
            let _ = self.faults.send(TaskFaultReport {
                id,
                error: error.clone(),
            });
        }
        self.timings.publish(TimingSample { id, elapsed });
    }

    /// Blocks for the next job. `None` means shut down.
    fn next_job(&self) -> Option<Arc<dyn Job>> {
        let mut state = self.state.lock();
        loop {
            if let Some(job) = state.jobs.pop_front() {
                state.running.push(Arc::clone(&job));
                return Some(job);
            }
            if state.shutdown {
                return None;
            }
            self.work_available.wait(&mut state);
        }
    }

    fn retire(&self, job: &Arc<dyn Job>) {
        let mut state = self.state.lock();
        if let Some(pos) = state.running.iter().position(|r| Arc::ptr_eq(r, job)) {
            state.running.swap_remove(pos);
        }
        if state.running.is_empty() {
            self.idle.notify_all();
        }
    }
}

fn worker_loop(inner: &Inner) {
    while let Some(job) = inner.next_job() {
        match job.run() {
            Ok(report) => inner.publish(&report.outcome, report.id, report.elapsed),
            Err(err) => tracing::warn!("worker skipped task {}: {}", job.id(), err),
        }
        inner.retire(&job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{CancellationToken, TaskState};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Spins until cancelled, flagging once it has started.
    struct Spinner {
        started: Arc<AtomicBool>,
    }

    impl Task for Spinner {
        fn process(&mut self, cancel: &CancellationToken) -> Result<(), TaskError> {
            self.started.store(true, Ordering::SeqCst);
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            Ok(())
        }
    }

    struct Quick;

    impl Task for Quick {
        fn process(&mut self, _cancel: &CancellationToken) -> Result<(), TaskError> {
            Ok(())
        }
    }

    struct Failing;

    impl Task for Failing {
        fn process(&mut self, _cancel: &CancellationToken) -> Result<(), TaskError> {
            Err(TaskError::failed("bad octave count"))
        }
    }

    struct Panicking;

    impl Task for Panicking {
        fn process(&mut self, _cancel: &CancellationToken) -> Result<(), TaskError> {
            panic!("worker boundary test");
        }
    }

    fn handle<T: Task>(task: T) -> TaskHandle<T> {
        TaskHandle::new(TaskId::next(), CancellationToken::new(), task)
    }

    #[test]
    fn test_config_resolution() {
        assert_eq!(SchedulerConfig::with_workers(3).worker_count(), 3);
        assert!(SchedulerConfig::default().worker_count() >= 1);

        let tiny = SchedulerConfig {
            core_utilization: 0.01,
            ..SchedulerConfig::default()
        };
        assert_eq!(tiny.worker_count(), 1, "never fewer than one worker");

        assert!(SchedulerConfig::with_workers(0).validate().is_err());
        let bad = SchedulerConfig {
            core_utilization: 1.5,
            ..SchedulerConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_runs_enqueued_tasks() {
        let scheduler = Scheduler::new(&SchedulerConfig::with_workers(4)).unwrap();
        let finished = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let h = handle(Quick);
                let finished = Arc::clone(&finished);
                h.on_finished(move |_| {
                    finished.fetch_add(1, Ordering::SeqCst);
                });
                scheduler.enqueue(&h).unwrap();
                h
            })
            .collect();

        for h in &handles {
            assert!(h.wait_timeout(Duration::from_secs(5)), "task {} hung", h.id());
        }
        assert_eq!(finished.load(Ordering::SeqCst), 32);
        assert_eq!(scheduler.worker_count(), 4);
    }

    #[test]
    fn test_fault_is_reported_and_worker_survives() {
        let scheduler = Scheduler::new(&SchedulerConfig::with_workers(1)).unwrap();
        let faults = scheduler.faults();

        let failing = handle(Failing);
        let panicking = handle(Panicking);
        let quick = handle(Quick);
        scheduler.enqueue(&failing).unwrap();
        scheduler.enqueue(&panicking).unwrap();
        scheduler.enqueue(&quick).unwrap();

        assert!(quick.wait_timeout(Duration::from_secs(5)), "single worker died");
        assert!(failing.is_done());
        assert!(panicking.is_done());

        let reports: Vec<_> = faults.try_iter().collect();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].id, failing.id());
        assert_eq!(reports[0].error, TaskError::failed("bad octave count"));
        assert!(matches!(reports[1].error, TaskError::Panicked(_)));
    }

    #[test]
    fn test_abort_waits_and_silences_notifications() {
        let scheduler = Scheduler::new(&SchedulerConfig::with_workers(2)).unwrap();
        let notifications = Arc::new(AtomicUsize::new(0));
        let late = Arc::new(AtomicUsize::new(0));
        let after_abort = Arc::new(AtomicBool::new(false));

        let mut started = Vec::new();
        let mut handles = Vec::new();
        for _ in 0..6 {
            let flag = Arc::new(AtomicBool::new(false));
            let h = handle(Spinner {
                started: Arc::clone(&flag),
            });
            let notifications = Arc::clone(&notifications);
            let late = Arc::clone(&late);
            let after_abort = Arc::clone(&after_abort);
            h.on_finished(move |_| {
                if after_abort.load(Ordering::SeqCst) {
                    late.fetch_add(1, Ordering::SeqCst);
                }
                notifications.fetch_add(1, Ordering::SeqCst);
            });
            scheduler.enqueue(&h).unwrap();
            started.push(flag);
            handles.push(h);
        }

        // Two workers, six spinners: wait until both workers are busy.
        while started.iter().filter(|f| f.load(Ordering::SeqCst)).count() < 2 {
            thread::sleep(Duration::from_millis(1));
        }

        scheduler.abort(true);
        after_abort.store(true, Ordering::SeqCst);

        assert!(handles.iter().all(|h| h.state() == TaskState::Done));
        assert!(handles.iter().all(|h| h.report().unwrap().outcome.is_cancelled()));
        assert_eq!(notifications.load(Ordering::SeqCst), 6);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(late.load(Ordering::SeqCst), 0, "notification fired after abort returned");
        assert_eq!(scheduler.in_flight_count(), 0);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_abort_refuses_until_reset() {
        let scheduler = Scheduler::new(&SchedulerConfig::with_workers(1)).unwrap();
        scheduler.abort(false);

        assert!(scheduler.is_aborted());
        assert_eq!(scheduler.enqueue(&handle(Quick)), Err(CoreError::SchedulerAborted));

        scheduler.reset();
        let h = handle(Quick);
        scheduler.enqueue(&h).unwrap();
        assert!(h.wait_timeout(Duration::from_secs(5)));
        assert!(h.report().unwrap().outcome.is_completed());
    }

    #[test]
    fn test_abort_without_wait_still_finishes_tasks() {
        let scheduler = Scheduler::new(&SchedulerConfig::with_workers(1)).unwrap();
        let flag = Arc::new(AtomicBool::new(false));
        let spinner = handle(Spinner {
            started: Arc::clone(&flag),
        });
        let queued = handle(Quick);
        scheduler.enqueue(&spinner).unwrap();
        scheduler.enqueue(&queued).unwrap();

        scheduler.abort(false);

        assert!(spinner.wait_timeout(Duration::from_secs(5)));
        assert!(queued.wait_timeout(Duration::from_secs(5)));
        assert!(queued.cancellation().is_cancelled());
    }

    #[test]
    fn test_timings_are_published() {
        let scheduler = Scheduler::new(&SchedulerConfig::with_workers(2)).unwrap();
        for _ in 0..4 {
            scheduler.enqueue(&handle(Quick)).unwrap();
        }
        scheduler.wait_idle();

        assert_eq!(scheduler.timings().drain().len(), 4);
    }
}
