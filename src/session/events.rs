//! Engine events and the sink they are delivered to.

use serde::Serialize;
use tokio::sync::mpsc;

use super::breathing::Phase;
use super::run::RunId;

/// Something the presentation layer should react to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A breathing phase began.
    PhaseChanged {
        /// The phase that began.
        phase: Phase,
        /// Its configured length, for driving the scale animation.
        duration_seconds: f64,
    },
    /// Breathing countdown update, rounded up to whole seconds.
    PhaseTick {
        /// The current phase.
        phase: Phase,
        /// Seconds left in the phase; reaches 0 before the next phase.
        remaining_seconds: u64,
    },
    /// Meditation countdown update.
    SessionTick {
        /// Seconds left in the session.
        remaining_seconds: u64,
    },
    /// New instruction text to display.
    InstructionChanged {
        /// The instruction.
        text: String,
    },
    /// The meditation countdown reached zero. Always the run's last event.
    SessionComplete,
}

impl SessionEvent {
    /// Event name used in logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::PhaseChanged { .. } => "phase_changed",
            Self::PhaseTick { .. } => "phase_tick",
            Self::SessionTick { .. } => "session_tick",
            Self::InstructionChanged { .. } => "instruction_changed",
            Self::SessionComplete => "session_complete",
        }
    }
}

/// An event tagged with the run that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEvent {
    /// The producing run.
    pub run: RunId,
    /// The event payload.
    #[serde(flatten)]
    pub event: SessionEvent,
}

/// Receives engine events.
///
/// Called with the slot unlocked, so an implementation may query, stop or
/// start runs on the same engine. Deliveries are serialized per engine;
/// blocking here holds up every timer callback and `stop()`.
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    fn emit(&self, event: RunEvent);
}

impl EventSink for mpsc::UnboundedSender<RunEvent> {
    fn emit(&self, event: RunEvent) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag_and_run() {
        let event = RunEvent {
            run: RunId::new(2),
            event: SessionEvent::PhaseTick {
                phase: Phase::Hold,
                remaining_seconds: 3,
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"run": 2, "type": "phase_tick", "phase": "hold", "remaining_seconds": 3})
        );
    }

    #[test]
    fn completion_has_no_payload() {
        let event = RunEvent {
            run: RunId::new(1),
            event: SessionEvent::SessionComplete,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"run": 1, "type": "session_complete"}));
    }

    #[test]
    fn channel_sink_ignores_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        tx.emit(RunEvent {
            run: RunId::new(1),
            event: SessionEvent::SessionComplete,
        });
    }
}
