//! Timer scheduling
//!
//! The session engine only needs two primitives: run a task once after a
//! delay, and run a task repeatedly at a fixed period. Both return a
//! [`TimerHandle`] that cancels the timer.
//!
//! # Backends
//!
//! - [`TokioScheduler`]: real time, one Tokio task per timer
//! - [`ManualScheduler`]: virtual time advanced explicitly, fully deterministic

pub mod manual;
pub mod realtime;

use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub use manual::ManualScheduler;
pub use realtime::TokioScheduler;

/// Work executed when a timer fires.
pub type TimerTask = Box<dyn FnMut() + Send + 'static>;

/// A source of one-shot and periodic timers.
///
/// Implementations must never run `task` synchronously from within
/// [`after`](Self::after) or [`every`](Self::every): callers arm timers
/// while holding their own locks.
pub trait Scheduler: Send + Sync {
    /// Runs `task` once, `delay` from now.
    fn after(&self, delay: Duration, task: TimerTask) -> TimerHandle;

    /// Runs `task` every `period`, first at `period` from now.
    fn every(&self, period: Duration, task: TimerTask) -> TimerHandle;
}

/// Cancellation handle for an armed timer.
///
/// Cancelling is idempotent. A cancelled timer never starts its task again,
/// but a task that is already executing runs to completion.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    cancel: CancellationToken,
}

impl TimerHandle {
    pub(crate) const fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Cancels the timer.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_idempotent() {
        let handle = TimerHandle::new(CancellationToken::new());
        assert!(!handle.is_cancelled());
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn clones_share_cancellation() {
        let handle = TimerHandle::new(CancellationToken::new());
        let clone = handle.clone();
        clone.cancel();
        assert!(handle.is_cancelled());
    }
}
