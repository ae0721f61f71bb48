//! # Core Error Types
//!
//! All errors that can occur in the task and scheduling layer.

use thiserror::Error;

use crate::task::TaskId;

/// Errors that can occur in the core layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A region was built with a negative extent.
    #[error("invalid region: size {size:?} has a negative extent")]
    InvalidRegion {
        /// The rejected size.
        size: [i32; 3],
    },

    /// A position lies outside a bounded region.
    #[error("position {position:?} outside region at {origin:?} with size {size:?}")]
    OutOfBounds {
        /// The requested world position.
        position: [i32; 3],
        /// Region origin.
        origin: [i32; 3],
        /// Region size.
        size: [i32; 3],
    },

    /// `execute()` was called on a task that already left the `Created` state.
    #[error("task {id} was already executed")]
    AlreadyExecuted {
        /// The task that was executed twice.
        id: TaskId,
    },

    /// The scheduler refuses work until it is reset.
    #[error("scheduler is aborted, reset it before enqueueing")]
    SchedulerAborted,

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
