//! Breathing phase cycle.
//!
//! A single periodic ticker drives the run. Elapsed time within a phase is
//! accumulated from ticks, so the countdown is exact in virtual and real
//! time alike. When a phase runs out the tick that reached zero is reported
//! first, the overshoot past the phase boundary carries into the next phase,
//! and only then is the next phase announced. Phases shorter than a tick are
//! passed through within that tick, so the cycle never falls behind the
//! clock.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info;

use super::events::SessionEvent;
use super::run::{RunHandle, RunId, RunKind, RunOutcome};
use super::slot::{RunBody, Shared};
use crate::config::{PhaseConfig, PhaseDurations};
use crate::error::ConfigError;

/// One step of the breathing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Breathe in.
    Inhale,
    /// Hold the breath.
    Hold,
    /// Breathe out.
    Exhale,
}

impl Phase {
    /// The phase that follows this one. The cycle never ends.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Inhale => Self::Hold,
            Self::Hold => Self::Exhale,
            Self::Exhale => Self::Inhale,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Inhale => "Inhale",
            Self::Hold => "Hold",
            Self::Exhale => "Exhale",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of a running breathing cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseState {
    /// The run this snapshot belongs to.
    pub run: RunId,
    /// Current phase.
    pub phase: Phase,
    /// Time left in the current phase, never negative.
    pub remaining: Duration,
    /// Number of full inhale/hold/exhale cycles finished so far.
    pub cycles_completed: u64,
}

impl PhaseState {
    /// Fractional seconds left in the phase.
    #[must_use]
    pub fn remaining_seconds(&self) -> f64 {
        self.remaining.as_secs_f64()
    }

    /// Seconds left rounded up, as shown to the user.
    #[must_use]
    pub fn display_seconds(&self) -> u64 {
        ceil_seconds(self.remaining)
    }
}

// Phases are capped at one day, so whole seconds always fit.
#[allow(clippy::cast_possible_truncation)]
fn ceil_seconds(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}

/// Mutable state of one breathing run.
#[derive(Debug)]
pub(crate) struct CycleState {
    durations: PhaseDurations,
    phase: Phase,
    elapsed: Duration,
    cycles_completed: u64,
}

impl CycleState {
    pub(crate) const fn new(durations: PhaseDurations) -> Self {
        Self {
            durations,
            phase: Phase::Inhale,
            elapsed: Duration::ZERO,
            cycles_completed: 0,
        }
    }

    const fn duration_of(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Inhale => self.durations.inhale,
            Phase::Hold => self.durations.hold,
            Phase::Exhale => self.durations.exhale,
        }
    }

    fn remaining(&self) -> Duration {
        self.duration_of(self.phase).saturating_sub(self.elapsed)
    }

    fn announce(&self) -> SessionEvent {
        SessionEvent::PhaseChanged {
            phase: self.phase,
            duration_seconds: self.duration_of(self.phase).as_secs_f64(),
        }
    }

    /// Applies one tick and returns the events it produced, in order.
    ///
    /// A tick longer than the phases it crosses ends all of them. Every
    /// phase passed over is still announced and still reports a zero tick
    /// before the next one is announced.
    fn advance(&mut self, tick: Duration) -> Vec<SessionEvent> {
        self.elapsed += tick;
        let mut events = vec![SessionEvent::PhaseTick {
            phase: self.phase,
            remaining_seconds: ceil_seconds(self.remaining()),
        }];

        while self.remaining().is_zero() {
            self.elapsed -= self.duration_of(self.phase);
            self.phase = self.phase.next();
            if self.phase == Phase::Inhale {
                self.cycles_completed += 1;
            }
            events.push(self.announce());
            if self.remaining().is_zero() {
                events.push(SessionEvent::PhaseTick {
                    phase: self.phase,
                    remaining_seconds: 0,
                });
            }
        }
        events
    }

    fn snapshot(&self, run: RunId) -> PhaseState {
        PhaseState {
            run,
            phase: self.phase,
            remaining: self.remaining(),
            cycles_completed: self.cycles_completed,
        }
    }
}

/// The breathing engine.
///
/// Obtained from [`SessionEngine::phase_cycle`](super::SessionEngine::phase_cycle);
/// every clone drives the same slot.
#[derive(Clone)]
pub struct PhaseCycle {
    shared: Arc<Shared>,
}

impl PhaseCycle {
    pub(crate) const fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Starts a new breathing cycle in [`Phase::Inhale`].
    ///
    /// Whatever run currently owns the slot, breathing or meditation, is
    /// torn down first. `PhaseChanged(Inhale)` is emitted before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a non-positive, non-finite or
    /// oversized phase length. Nothing is stopped or armed in that case.
    pub fn start(&self, config: &PhaseConfig) -> Result<RunHandle, ConfigError> {
        let durations = config.validate()?;
        let shared = &self.shared;
        let tick = shared.options().phase_tick;

        let handle = shared.transact(|slot| {
            shared.teardown(slot, RunOutcome::Superseded);

            let handle = slot.mint(RunKind::Breathing);
            let cycle = CycleState::new(durations);
            slot.emit(handle.id(), cycle.announce());

            let ticker = shared.scheduler().every(
                tick,
                shared.callback(handle, move |_, slot| {
                    let Some(RunBody::Breathing(cycle)) = slot.body_mut(handle) else {
                        return;
                    };
                    for event in cycle.advance(tick) {
                        slot.emit(handle.id(), event);
                    }
                }),
            );
            shared.install(slot, handle, vec![ticker], RunBody::Breathing(cycle));

            info!(
                run = %handle.id(),
                inhale_ms = durations.inhale.as_millis(),
                hold_ms = durations.hold.as_millis(),
                exhale_ms = durations.exhale.as_millis(),
                "breathing started"
            );
            handle
        });
        Ok(handle)
    }

    /// Stops the run. Returns `false`, doing nothing, if `handle` is not the
    /// active breathing run.
    pub fn stop(&self, handle: RunHandle) -> bool {
        self.shared.stop(handle, RunKind::Breathing)
    }

    /// Current phase and countdown of `handle`, if it is still running.
    #[must_use]
    pub fn state(&self, handle: RunHandle) -> Option<PhaseState> {
        match self.shared.lock().body(handle) {
            Some(RunBody::Breathing(cycle)) => Some(cycle.snapshot(handle.id())),
            _ => None,
        }
    }

    /// Whether a breathing run currently owns the slot.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared
            .lock()
            .current()
            .is_some_and(|run| run.kind() == RunKind::Breathing)
    }
}

impl fmt::Debug for PhaseCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseCycle")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
