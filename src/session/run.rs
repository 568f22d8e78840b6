//! Run identity.
//!
//! Every `start()` mints a fresh [`RunId`]. Timer callbacks carry the id of
//! the run that armed them and compare it against the slot's occupant before
//! touching any state.

use std::fmt;

use serde::Serialize;

/// Opaque, monotonically increasing run token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RunId(u64);

impl RunId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Which engine owns a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// A [`PhaseCycle`](super::PhaseCycle) run.
    Breathing,
    /// A [`SessionController`](super::SessionController) run.
    Meditation,
}

impl RunKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Breathing => "breathing",
            Self::Meditation => "meditation",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by `start()`; only useful for stopping or inspecting that run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunHandle {
    id: RunId,
    kind: RunKind,
}

impl RunHandle {
    pub(crate) const fn new(id: RunId, kind: RunKind) -> Self {
        Self { id, kind }
    }

    /// The run token.
    #[must_use]
    pub const fn id(&self) -> RunId {
        self.id
    }

    /// The engine that owns the run.
    #[must_use]
    pub const fn kind(&self) -> RunKind {
        self.kind
    }
}

/// How a run left the active slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    /// A meditation countdown reached zero.
    Completed,
    /// `stop()` was called with the run's handle.
    Stopped,
    /// Another `start()` took over the slot.
    Superseded,
}

impl RunOutcome {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Superseded => "superseded",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
