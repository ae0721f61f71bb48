//! # Synchronization Primitives
//!
//! One-shot completion signal used by task handles and by the scheduler's
//! idle tracking.
//!
//! ```text
//!   Worker ── signal() ──┐
//!                        ▼
//!              [ done: AtomicBool ] ◀── is_set()   (lock-free fast path)
//!                        │
//!                   Condvar wakes
//!                        ▼
//!              wait() / wait_timeout()              (blocking callers)
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// A latch that is set once and wakes every waiter.
///
/// Setting is idempotent; once set it stays set.
#[derive(Debug, Default)]
pub struct CompletionSignal {
    done: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl CompletionSignal {
    /// Creates an unset signal.
    #[must_use]
    pub fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    /// Sets the signal and wakes all waiters.
    pub fn signal(&self) {
        // Store under the mutex so a waiter cannot miss the wakeup between
        // its check and its wait.
        let _guard = self.mutex.lock();
        self.done.store(true, Ordering::Release);
        self.condvar.notify_all();
    }

    /// Returns true once [`signal`](Self::signal) has been called.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Blocks until the signal is set.
    pub fn wait(&self) {
        if self.is_set() {
            return;
        }
        let mut guard = self.mutex.lock();
        while !self.is_set() {
            self.condvar.wait(&mut guard);
        }
    }

    /// Blocks until the signal is set or `timeout` elapses.
    ///
    /// Returns true if the signal was set.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_set() {
            return true;
        }
        let deadline = std::time::Instant::now() + timeout;
        let mut guard = self.mutex.lock();
        while !self.is_set() {
            if self.condvar.wait_until(&mut guard, deadline).timed_out() {
                break;
            }
        }
        self.is_set()
    }
}
