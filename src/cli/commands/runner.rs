//! Drives an engine for the session-running commands.
//!
//! In real time the runner waits on the event channel. With `--simulate`
//! it repeatedly jumps the [`ManualScheduler`] to the next deadline and
//! drains whatever the engine emitted, so a ten-minute session finishes
//! immediately with the exact same event sequence.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cli::args::RunOptions;
use crate::config::EngineOptions;
use crate::error::StillwaterError;
use crate::observability::EventEmitter;
use crate::session::{RunEvent, SessionEngine};
use crate::timer::{ManualScheduler, Scheduler, TokioScheduler};

/// Why [`Runner::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finish {
    /// The event callback asked to stop, or [`Runner::finish`] fired.
    Done,
    /// Ctrl-C or SIGTERM.
    Interrupted,
    /// Simulation ran out of armed timers.
    Idle,
}

/// An engine plus the plumbing to observe it.
pub struct Runner {
    engine: SessionEngine,
    scheduler: Arc<dyn Scheduler>,
    simulated: Option<Arc<ManualScheduler>>,
    events: mpsc::UnboundedReceiver<RunEvent>,
    recorder: Option<EventEmitter>,
    finished: CancellationToken,
}

impl Runner {
    /// Builds an engine on the real-time or the virtual-time scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if `options` is invalid or the event file cannot be
    /// created.
    pub fn new(run: &RunOptions, options: EngineOptions) -> Result<Self, StillwaterError> {
        let simulated = run.simulate.then(|| Arc::new(ManualScheduler::new()));
        let scheduler: Arc<dyn Scheduler> = match &simulated {
            Some(manual) => Arc::clone(manual) as Arc<dyn Scheduler>,
            None => Arc::new(TokioScheduler::new()),
        };

        let recorder = run
            .events
            .as_deref()
            .map(EventEmitter::from_file)
            .transpose()?;

        let (tx, events) = mpsc::unbounded_channel();
        let engine = SessionEngine::new(Arc::clone(&scheduler), Arc::new(tx), options)?;

        Ok(Self {
            engine,
            scheduler,
            simulated,
            events,
            recorder,
            finished: CancellationToken::new(),
        })
    }

    /// The engine being driven.
    pub const fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    /// The scheduler the engine arms its timers on.
    pub fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    /// A token that ends [`run`](Self::run) with [`Finish::Done`] once
    /// cancelled, e.g. from a deadline timer.
    pub fn finish(&self) -> CancellationToken {
        self.finished.clone()
    }

    /// Whether the engine runs in virtual time.
    pub const fn is_simulated(&self) -> bool {
        self.simulated.is_some()
    }

    /// Delivers events to `on_event` until it breaks, the finish token
    /// fires, or `cancel` fires.
    pub async fn run<F>(&mut self, cancel: &CancellationToken, mut on_event: F) -> Finish
    where
        F: FnMut(&RunEvent) -> ControlFlow<()>,
    {
        if let Some(manual) = self.simulated.clone() {
            return self.simulate(&manual, cancel, on_event);
        }

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Finish::Interrupted,
                event = self.events.recv() => {
                    let Some(event) = event else {
                        return Finish::Idle;
                    };
                    if self.deliver(&event, &mut on_event).is_break() {
                        return Finish::Done;
                    }
                }
                () = self.finished.cancelled() => {
                    return self.drain(&mut on_event);
                }
            }
        }
    }

    fn simulate<F>(
        &mut self,
        manual: &ManualScheduler,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Finish
    where
        F: FnMut(&RunEvent) -> ControlFlow<()>,
    {
        loop {
            if self.drain(&mut on_event) == Finish::Done {
                return Finish::Done;
            }
            if cancel.is_cancelled() {
                return Finish::Interrupted;
            }
            let Some(due) = manual.next_due() else {
                return Finish::Idle;
            };
            manual.advance(due.saturating_sub(manual.now()));
        }
    }

    /// Delivers everything already queued.
    fn drain<F>(&mut self, on_event: &mut F) -> Finish
    where
        F: FnMut(&RunEvent) -> ControlFlow<()>,
    {
        while let Ok(event) = self.events.try_recv() {
            if self.deliver(&event, on_event).is_break() {
                return Finish::Done;
            }
        }
        if self.finished.is_cancelled() {
            Finish::Done
        } else {
            Finish::Idle
        }
    }

    fn deliver<F>(&self, event: &RunEvent, on_event: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&RunEvent) -> ControlFlow<()>,
    {
        if let Some(recorder) = &self.recorder {
            recorder.record(event);
        }
        on_event(event)
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("engine", &self.engine)
            .field("simulated", &self.is_simulated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PhaseConfig, SessionConfig};
    use crate::session::SessionEvent;
    use std::time::Duration;

    fn simulated() -> Runner {
        let run = RunOptions {
            simulate: true,
            events: None,
        };
        Runner::new(&run, EngineOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn simulated_meditation_runs_to_completion() {
        let mut runner = simulated();
        runner
            .engine()
            .session_controller()
            .start(&SessionConfig::for_mode("focus").with_total_seconds(3.0))
            .unwrap();

        let mut seen = Vec::new();
        let finish = runner
            .run(&CancellationToken::new(), |e| {
                seen.push(e.event.clone());
                if e.event == SessionEvent::SessionComplete {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await;

        assert_eq!(finish, Finish::Done);
        assert_eq!(seen.last(), Some(&SessionEvent::SessionComplete));
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn finish_token_ends_simulation() {
        let mut runner = simulated();
        let run = runner
            .engine()
            .phase_cycle()
            .start(&PhaseConfig::default())
            .unwrap();

        let finish = runner.finish();
        let cycle = runner.engine().phase_cycle();
        let _deadline = runner.scheduler().after(
            Duration::from_secs(5),
            Box::new(move || {
                cycle.stop(run);
                finish.cancel();
            }),
        );

        let mut ticks = 0;
        let outcome = runner
            .run(&CancellationToken::new(), |e| {
                if matches!(e.event, SessionEvent::PhaseTick { .. }) {
                    ticks += 1;
                }
                ControlFlow::Continue(())
            })
            .await;

        assert_eq!(outcome, Finish::Done);
        assert_eq!(ticks, 50);
        assert_eq!(runner.engine().active(), None);
    }

    #[tokio::test]
    async fn simulation_goes_idle_without_timers() {
        let mut runner = simulated();
        let outcome = runner
            .run(&CancellationToken::new(), |_| ControlFlow::Continue(()))
            .await;
        assert_eq!(outcome, Finish::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn real_time_run_is_interrupted_by_cancel() {
        let run = RunOptions::default();
        let mut runner = Runner::new(&run, EngineOptions::default()).unwrap();
        runner
            .engine()
            .phase_cycle()
            .start(&PhaseConfig::default())
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            trigger.cancel();
        });

        let outcome = runner.run(&cancel, |_| ControlFlow::Continue(())).await;
        assert_eq!(outcome, Finish::Interrupted);
    }
}
