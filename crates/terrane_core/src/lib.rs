//! # TERRANE Core
//!
//! Background work primitives for chunk generation:
//! - Cancellable tasks with a strict lifecycle and finished notification
//! - A fixed-size worker pool with global abort
//! - Bounded integer regions with checked local translation
//!
//! ## Architecture Rules
//!
//! 1. **Cooperative cancellation** - Work polls a token; nothing is killed
//! 2. **Faults are data** - A panicking task reports, it never tears a worker down
//! 3. **Done is final** - Once a task reports done it never reverts
//!
//! ## Example
//!
//! ```rust,ignore
//! use terrane_core::{CancellationToken, Scheduler, SchedulerConfig, TaskHandle, TaskId};
//!
//! let scheduler = Scheduler::new(&SchedulerConfig::default())?;
//! let handle = TaskHandle::new(TaskId::next(), CancellationToken::new(), MyTask::new());
//! scheduler.enqueue(&handle)?;
//! handle.wait();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod diagnostics;
pub mod error;
pub mod region;
pub mod scheduler;
pub mod sync;
pub mod task;

pub use diagnostics::{TimingBuffer, TimingSample};
pub use error::{CoreError, CoreResult};
pub use region::BoundedRegion;
pub use scheduler::{Scheduler, SchedulerConfig, TaskFaultReport};
pub use sync::CompletionSignal;
pub use task::{
    CancellationToken, Task, TaskError, TaskHandle, TaskId, TaskOutcome, TaskReport, TaskState,
};
