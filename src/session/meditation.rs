//! Meditation countdown with rotating instructions.
//!
//! Two independent periodic timers per run: a one-second countdown and the
//! instruction rotation. The countdown is armed first, so when both fall due
//! at the same instant the tick is delivered before the instruction. The
//! countdown tick that reaches zero tears the run down and emits
//! `SessionComplete` as the run's final event.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::events::SessionEvent;
use super::run::{RunHandle, RunId, RunKind, RunOutcome};
use super::slot::{RunBody, Shared};
use crate::config::{MeditationMode, SessionConfig, SessionPlan};
use crate::error::ConfigError;

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// Snapshot of a running meditation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// The run this snapshot belongs to.
    pub run: RunId,
    /// Mode the session runs in.
    pub mode: MeditationMode,
    /// Whole seconds left on the countdown.
    pub remaining_seconds: u64,
}

/// Mutable state of one meditation run.
#[derive(Debug)]
pub(crate) struct CountdownState {
    mode: MeditationMode,
    remaining_seconds: u64,
    rotation_text: String,
}

impl CountdownState {
    fn new(plan: SessionPlan) -> Self {
        Self {
            mode: plan.mode,
            remaining_seconds: plan.total_seconds,
            rotation_text: plan.script.rotation,
        }
    }

    /// Decrements the countdown and returns the new value.
    const fn tick(&mut self) -> u64 {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.remaining_seconds
    }
}

/// The meditation engine.
///
/// Obtained from
/// [`SessionEngine::session_controller`](super::SessionEngine::session_controller).
#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub(crate) const fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Starts a session counting down from `config.total_duration_seconds`
    /// (fractions round up to the next whole second).
    ///
    /// Any breathing or meditation run is torn down first. The mode's
    /// initial instruction is emitted before this returns.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an invalid total or rotation
    /// length. The running session, if any, is left untouched.
    pub fn start(&self, config: &SessionConfig) -> Result<RunHandle, ConfigError> {
        let plan = config.validate()?;
        let shared = &self.shared;

        let handle = shared.transact(|slot| {
            shared.teardown(slot, RunOutcome::Superseded);

            let handle = slot.mint(RunKind::Meditation);
            let id = handle.id();
            slot.emit(
                id,
                SessionEvent::InstructionChanged {
                    text: plan.script.initial.clone(),
                },
            );

            let countdown = shared.scheduler().every(
                COUNTDOWN_PERIOD,
                shared.callback(handle, move |shared, slot| {
                    let Some(RunBody::Meditation(state)) = slot.body_mut(handle) else {
                        return;
                    };
                    let remaining_seconds = state.tick();
                    slot.emit(id, SessionEvent::SessionTick { remaining_seconds });
                    if remaining_seconds == 0 {
                        shared.teardown(slot, RunOutcome::Completed);
                        slot.emit(id, SessionEvent::SessionComplete);
                    }
                }),
            );
            let rotation = shared.scheduler().every(
                plan.rotation,
                shared.callback(handle, move |_, slot| {
                    let Some(RunBody::Meditation(state)) = slot.body(handle) else {
                        return;
                    };
                    let text = state.rotation_text.clone();
                    slot.emit(id, SessionEvent::InstructionChanged { text });
                }),
            );

            info!(
                run = %id,
                mode = %plan.mode,
                total_seconds = plan.total_seconds,
                rotation_ms = plan.rotation.as_millis(),
                "meditation started"
            );
            shared.install(
                slot,
                handle,
                vec![countdown, rotation],
                RunBody::Meditation(CountdownState::new(plan)),
            );
            handle
        });
        Ok(handle)
    }

    /// Stops the session. Returns `false`, doing nothing, if `handle` is not
    /// the active meditation run; in particular after natural completion.
    pub fn stop(&self, handle: RunHandle) -> bool {
        self.shared.stop(handle, RunKind::Meditation)
    }

    /// Countdown state of `handle`, if it is still running.
    #[must_use]
    pub fn state(&self, handle: RunHandle) -> Option<SessionState> {
        match self.shared.lock().body(handle) {
            Some(RunBody::Meditation(state)) => Some(SessionState {
                run: handle.id(),
                mode: state.mode,
                remaining_seconds: state.remaining_seconds,
            }),
            _ => None,
        }
    }

    /// Whether a meditation run currently owns the slot.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared
            .lock()
            .current()
            .is_some_and(|run| run.kind() == RunKind::Meditation)
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
