//! Deterministic virtual-time scheduler.
//!
//! Nothing fires until [`ManualScheduler::advance`] moves the virtual clock.
//! Due timers then run in deadline order, ties broken by the order they were
//! armed. Used by the test suite and by the CLI's `--simulate` mode.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::{Scheduler, TimerHandle, TimerTask};

struct ManualTimer {
    seq: u64,
    due: Duration,
    period: Option<Duration>,
    cancel: CancellationToken,
    task: TimerTask,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    timers: Vec<ManualTimer>,
}

/// Scheduler driven by an explicit virtual clock.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
    ignore_cancellation: bool,
}

impl ManualScheduler {
    /// Creates a scheduler with its clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scheduler whose timers keep firing after being cancelled.
    ///
    /// Models callbacks that were already queued when cancellation was
    /// requested: whoever armed the timer must turn them into no-ops.
    /// [`armed`](Self::armed) still reports cancelled timers as released.
    #[must_use]
    pub fn ignoring_cancellation() -> Self {
        Self {
            state: Mutex::default(),
            ignore_cancellation: true,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ManualState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current virtual time, measured from creation.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of timers that are armed and not cancelled.
    #[must_use]
    pub fn armed(&self) -> usize {
        self.lock()
            .timers
            .iter()
            .filter(|t| !t.cancel.is_cancelled())
            .count()
    }

    /// Deadline of the next timer that would fire, if any.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        let ignore = self.ignore_cancellation;
        self.lock()
            .timers
            .iter()
            .filter(|t| ignore || !t.cancel.is_cancelled())
            .map(|t| t.due)
            .min()
    }

    /// Advances the virtual clock by `by`, running every timer that falls
    /// due on the way. Returns the number of tasks run.
    ///
    /// Tasks run without the scheduler lock held and may arm or cancel
    /// timers; timers they arm fire within the same call when due.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        let mut fired = 0;

        while let Some(mut timer) = self.take_due(target) {
            (timer.task)();
            fired += 1;

            if let Some(period) = timer.period {
                if self.ignore_cancellation || !timer.cancel.is_cancelled() {
                    timer.due += period;
                    self.lock().timers.push(timer);
                }
            }
        }

        self.lock().now = target;
        fired
    }

    /// Removes the earliest timer due at or before `target` and moves the
    /// clock to its deadline.
    fn take_due(&self, target: Duration) -> Option<ManualTimer> {
        let mut state = self.lock();
        if !self.ignore_cancellation {
            state.timers.retain(|t| !t.cancel.is_cancelled());
        }

        let index = state
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= target)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;

        let timer = state.timers.swap_remove(index);
        state.now = timer.due;
        Some(timer)
    }

    fn arm(&self, delay: Duration, period: Option<Duration>, task: TimerTask) -> TimerHandle {
        let cancel = CancellationToken::new();
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now + delay;
        state.timers.push(ManualTimer {
            seq,
            due,
            period,
            cancel: cancel.clone(),
            task,
        });
        TimerHandle::new(cancel)
    }
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        self.arm(delay, None, task)
    }

    fn every(&self, period: Duration, task: TimerTask) -> TimerHandle {
        // A zero period would never let the clock move past it.
        let period = period.max(Duration::from_nanos(1));
        self.arm(period, Some(period), task)
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("timers", &state.timers.len())
            .field("ignore_cancellation", &self.ignore_cancellation)
            .finish()
    }
}
