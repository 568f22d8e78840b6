//! Timed session engine
//!
//! Two engines share one active-run slot:
//!
//! - [`PhaseCycle`]: endless inhale → hold → exhale breathing cycle
//! - [`SessionController`]: finite meditation countdown with rotating
//!   instructions
//!
//! Starting either one tears down whatever run currently owns the slot.
//! Every run gets a fresh [`RunId`]; each timer callback checks it against
//! the slot before doing anything, and teardown also cancels every timer the
//! run armed. Once `stop()` returns, the stopped run emits nothing more.
//!
//! ```no_run
//! use std::sync::Arc;
//! use stillwater::config::{EngineOptions, PhaseConfig};
//! use stillwater::session::SessionEngine;
//! use stillwater::timer::TokioScheduler;
//!
//! # async fn demo() -> Result<(), stillwater::error::ConfigError> {
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let engine = SessionEngine::new(
//!     Arc::new(TokioScheduler::new()),
//!     Arc::new(tx),
//!     EngineOptions::default(),
//! )?;
//! let run = engine.phase_cycle().start(&PhaseConfig::default())?;
//! while let Some(event) = rx.recv().await {
//!     println!("{event:?}");
//! }
//! engine.phase_cycle().stop(run);
//! # Ok(())
//! # }
//! ```

pub mod breathing;
pub mod events;
pub mod meditation;
pub mod run;
mod slot;

use std::fmt;
use std::sync::Arc;

use crate::config::EngineOptions;
use crate::error::ConfigError;
use crate::timer::Scheduler;

pub use breathing::{Phase, PhaseCycle, PhaseState};
pub use events::{EventSink, RunEvent, SessionEvent};
pub use meditation::{SessionController, SessionState};
pub use run::{RunHandle, RunId, RunKind, RunOutcome};

use slot::Shared;

/// Owner of the active-run slot and factory for both engines.
///
/// Cloning is cheap; clones share the slot. Dropping the last clone (and
/// every engine obtained from it) cancels the active run's timers.
#[derive(Clone)]
pub struct SessionEngine {
    shared: Arc<Shared>,
}

impl SessionEngine {
    /// Creates an engine that arms timers on `scheduler` and delivers events
    /// to `sink`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `options` is invalid.
    pub fn new(
        scheduler: Arc<dyn Scheduler>,
        sink: Arc<dyn EventSink>,
        options: EngineOptions,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            shared: Arc::new(Shared::new(scheduler, sink, options)),
        })
    }

    /// The breathing engine bound to this slot.
    #[must_use]
    pub fn phase_cycle(&self) -> PhaseCycle {
        PhaseCycle::new(Arc::clone(&self.shared))
    }

    /// The meditation engine bound to this slot.
    #[must_use]
    pub fn session_controller(&self) -> SessionController {
        SessionController::new(Arc::clone(&self.shared))
    }

    /// The run currently owning the slot.
    #[must_use]
    pub fn active(&self) -> Option<RunHandle> {
        self.shared.lock().current()
    }

    /// Stops whatever run owns the slot and returns it.
    pub fn stop_active(&self) -> Option<RunHandle> {
        self.shared
            .transact(|slot| self.shared.teardown(slot, RunOutcome::Stopped))
    }
}

impl fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEngine")
            .field("active", &self.active())
            .field("options", self.shared.options())
            .finish_non_exhaustive()
    }
}
