//! Tokio-backed scheduler.
//!
//! Every timer is a spawned task racing its [`CancellationToken`] against a
//! sleep or an interval. The select is biased towards cancellation, so a
//! timer whose deadline and cancellation become ready together does not
//! fire.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{Scheduler, TimerHandle, TimerTask};

/// Real-time scheduler running timers on the current Tokio runtime.
///
/// Periodic timers are fixed-rate: ticks are scheduled at multiples of the
/// period from the arm time and missed ticks are delivered in a burst, so
/// the number of ticks observed always matches elapsed time.
///
/// # Panics
///
/// Arming a timer panics when called outside a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl TokioScheduler {
    /// Creates a scheduler for the ambient Tokio runtime.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Scheduler for TokioScheduler {
    fn after(&self, delay: Duration, mut task: TimerTask) -> TimerHandle {
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => task(),
            }
        });
        TimerHandle::new(token)
    }

    fn every(&self, period: Duration, mut task: TimerTask) -> TimerHandle {
        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => task(),
                }
            }
        });
        TimerHandle::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, TimerTask) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let task: TimerTask = Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, task)
    }

    #[tokio::test(start_paused = true)]
    async fn after_fires_once() {
        let (count, task) = counter();
        let _handle = TokioScheduler::new().after(Duration::from_secs(2), task);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_after_never_fires() {
        let (count, task) = counter();
        let handle = TokioScheduler::new().after(Duration::from_secs(1), task);
        handle.cancel();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn every_fires_at_each_period() {
        let (count, task) = counter();
        let handle = TokioScheduler::new().every(Duration::from_millis(100), task);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn every_stops_when_cancelled_from_its_own_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let slot: Arc<std::sync::Mutex<Option<TimerHandle>>> =
            Arc::new(std::sync::Mutex::new(None));

        let c = Arc::clone(&count);
        let s = Arc::clone(&slot);
        let handle = TokioScheduler::new().every(
            Duration::from_secs(1),
            Box::new(move || {
                if c.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                    if let Some(h) = s.lock().unwrap().as_ref() {
                        h.cancel();
                    }
                }
            }),
        );
        *slot.lock().unwrap() = Some(handle);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
