//! # Cancellation Tokens
//!
//! Cooperative cancellation. Long loops poll [`CancellationToken::is_cancelled`]
//! at iteration boundaries and return early; nothing is ever interrupted from
//! the outside.
//!
//! A token trips when:
//! - someone calls [`cancel`](CancellationToken::cancel) on it (or a clone),
//! - its deadline passes,
//! - its parent trips.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use web_time::Instant;

#[derive(Debug, Default)]
struct TokenInner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<CancellationToken>,
}

/// Shared cancellation flag. Clones observe and trip the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    /// Creates a token that only trips when cancelled explicitly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that trips on its own once `deadline` passes.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                deadline: Some(deadline),
                ..TokenInner::default()
            }),
        }
    }

    /// Creates a token that trips on its own after `timeout`.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Creates a token that trips when either it or `self` is cancelled.
    ///
    /// Cancelling the child does not cancel the parent.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            inner: Arc::new(TokenInner {
                parent: Some(self.clone()),
                ..TokenInner::default()
            }),
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// Returns true if cancellation was requested, the deadline passed,
    /// or an ancestor was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        if self.inner.deadline.is_some_and(|d| Instant::now() >= d) {
            return true;
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// The deadline this token was created with, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_child_follows_parent_only_downwards() {
        let parent = CancellationToken::new();
        let child = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled(), "child must not cancel its parent");

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_deadline_trips_without_cancel() {
        let token = CancellationToken::with_timeout(Duration::from_millis(5));
        assert!(!token.is_cancelled());

        std::thread::sleep(Duration::from_millis(20));
        assert!(token.is_cancelled());
    }
}
