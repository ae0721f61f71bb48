//! # Timing Diagnostics
//!
//! Per-task elapsed-time samples published by the scheduler. Consumers
//! (debug overlays, benchmarks) drain the buffer at their own pace.
//!
//! ```text
//!   Worker 1 ──┐
//!   Worker 2 ──┼──> [Bounded Channel] ──> drain() on the consumer side
//!   Worker N ──┘    (full = drop + count)
//! ```
//!
//! Publishing never blocks a worker. When the buffer is full the sample is
//! dropped and counted; eviction of old samples is the consumer's business.
//! Running totals of the buffered samples back [`TimingBuffer::mean_elapsed`],
//! so reading the mean never touches the channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::task::TaskId;

/// One finished task's timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingSample {
    /// The task that produced the sample.
    pub id: TaskId,
    /// Time spent inside `execute()`.
    pub elapsed: Duration,
}

/// Bounded multi-producer buffer of [`TimingSample`]s.
#[derive(Debug)]
pub struct TimingBuffer {
    sender: Sender<TimingSample>,
    receiver: Receiver<TimingSample>,
    dropped: AtomicU64,
    /// Sum of `elapsed` over buffered samples, in nanoseconds.
    buffered_nanos: AtomicU64,
    buffered: AtomicU64,
}

impl TimingBuffer {
    /// Creates a buffer holding at most `capacity` samples (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            dropped: AtomicU64::new(0),
            buffered_nanos: AtomicU64::new(0),
            buffered: AtomicU64::new(0),
        }
    }

    /// Publishes a sample without blocking.
    ///
    /// Returns false if the buffer was full and the sample was dropped.
    pub fn publish(&self, sample: TimingSample) -> bool {
        // Counted before the send so a concurrent drain never subtracts first
        let nanos = nanos_of(sample.elapsed);
        self.buffered_nanos.fetch_add(nanos, Ordering::AcqRel);
        self.buffered.fetch_add(1, Ordering::AcqRel);

        match self.sender.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.buffered.fetch_sub(1, Ordering::AcqRel);
                self.buffered_nanos.fetch_sub(nanos, Ordering::AcqRel);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Takes every buffered sample.
    #[must_use]
    pub fn drain(&self) -> Vec<TimingSample> {
        let samples: Vec<TimingSample> = self.receiver.try_iter().collect();
        for sample in &samples {
            self.buffered.fetch_sub(1, Ordering::AcqRel);
            self.buffered_nanos.fetch_sub(nanos_of(sample.elapsed), Ordering::AcqRel);
        }
        samples
    }

    /// Number of samples currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns true if no samples are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Maximum number of buffered samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(usize::MAX)
    }

    /// Samples dropped because the buffer was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Mean elapsed time of the buffered samples, without draining them.
    ///
    /// Under concurrent publishing this is a snapshot: a sample being
    /// published right now may or may not be included.
    #[must_use]
    pub fn mean_elapsed(&self) -> Option<Duration> {
        let count = self.buffered.load(Ordering::Acquire);
        if count == 0 {
            return None;
        }
        let nanos = self.buffered_nanos.load(Ordering::Acquire);
        Some(Duration::from_nanos(nanos / count))
    }
}

#[inline]
fn nanos_of(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX)
}
