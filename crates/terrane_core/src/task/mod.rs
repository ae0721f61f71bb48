//! # Task System
//!
//! A [`Task`] is a unit of cancellable background work. Wrapping it in a
//! [`TaskHandle`] gives it identity, a cancellation token, a lifecycle and a
//! single-shot finished notification.
//!
//! ## Lifecycle
//!
//! ```text
//!   TaskHandle::new ──▶ Created ──execute()──▶ Running ──▶ Done
//!                                                 │          │
//!                        process() ◀──────────────┘          │
//!                        process_finished()                  │
//!                        record finish + elapsed             │
//!                        state = Done ───────────────────────┘
//!                        notify observers (after Done only)
//! ```
//!
//! ## Thread Safety
//!
//! - A task body runs on exactly one thread; a second `execute()` is rejected
//! - `Done` is an atomic store and never reverts
//! - Panics inside `process()` are captured and reported as faults

mod cancel;
mod handle;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;

pub use cancel::CancellationToken;
pub use handle::TaskHandle;
pub(crate) use handle::Job;

/// A unit of cancellable background work.
///
/// Implementations must poll `cancel` at the iteration boundaries of any loop
/// whose length depends on input size and return `Ok(())` early when it is
/// set. Cancellation is not an error.
pub trait Task: Send + 'static {
    /// The work body. Runs on a worker thread.
    ///
    /// # Errors
    ///
    /// Returns a [`TaskError`] for faults. The handle records the fault and
    /// still reaches `Done`.
    fn process(&mut self, cancel: &CancellationToken) -> Result<(), TaskError>;

    /// Hook that runs after `process()` on the same thread, whatever its outcome.
    fn process_finished(&mut self) {}
}

/// Opaque task identity, for correlation and debugging only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// Wraps a caller-chosen key.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Draws a fresh key from a process-wide counter.
    #[must_use]
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw key.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TaskState {
    /// Built, not yet picked up.
    Created = 0,
    /// `execute()` is in progress.
    Running = 1,
    /// Finished (completed, cancelled or faulted). Terminal.
    Done = 2,
}

impl TaskState {
    #[inline]
    pub(crate) const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Created,
            1 => Self::Running,
            _ => Self::Done,
        }
    }
}

/// Faults raised by a task body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The body returned an error.
    #[error("task failed: {0}")]
    Failed(String),

    /// The body panicked; the payload message is preserved.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Failed`].
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// How a task ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The body ran to completion.
    Completed,
    /// The body returned after observing cancellation (or never ran).
    Cancelled,
    /// The body or its finished hook faulted.
    Faulted(TaskError),
}

impl TaskOutcome {
    /// Returns true for [`TaskOutcome::Completed`].
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true for [`TaskOutcome::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the fault, if any.
    #[must_use]
    pub const fn fault(&self) -> Option<&TaskError> {
        match self {
            Self::Faulted(err) => Some(err),
            _ => None,
        }
    }
}

/// Delivered to every finished observer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskReport {
    /// Task identity.
    pub id: TaskId,
    /// How the task ended.
    pub outcome: TaskOutcome,
    /// Wall time between start and finish.
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ids_are_unique() {
        let a = TaskId::next();
        let b = TaskId::next();
        assert_ne!(a, b);
        assert!(b.value() > a.value());
    }

    #[test]
    fn test_state_round_trip() {
        for state in [TaskState::Created, TaskState::Running, TaskState::Done] {
            assert_eq!(TaskState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(TaskId::new(7).to_string(), "#7");
        assert_eq!(
            TaskError::failed("boom").to_string(),
            "task failed: boom"
        );
    }
}
