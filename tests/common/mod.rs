//! Shared integration-test helpers: running the `stillwater` binary and
//! building engines on the virtual-time scheduler.

#![allow(dead_code)]

use std::io::Write;
use std::process::{Command, Output};
use std::sync::Arc;

use stillwater::config::EngineOptions;
use stillwater::session::{Phase, RunEvent, SessionEngine, SessionEvent};
use stillwater::timer::ManualScheduler;
use tokio::sync::mpsc;

/// Runs the `stillwater` binary to completion with a clean environment.
#[allow(clippy::missing_panics_doc)]
pub fn stillwater(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stillwater"))
        .args(args)
        .env_remove("STILLWATER_CONFIG")
        .env_remove("STILLWATER_LOG_LEVEL")
        .env_remove("STILLWATER_METRICS_PORT")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run stillwater")
}

/// Stdout of a finished process as a string.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Stderr of a finished process as a string.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Writes `content` to a temporary `.yaml` file.
#[allow(clippy::missing_panics_doc)]
pub fn settings_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("failed to write settings");
    file
}

/// An engine on a virtual clock with its event stream.
pub struct VirtualEngine {
    pub engine: SessionEngine,
    pub clock: Arc<ManualScheduler>,
    events: mpsc::UnboundedReceiver<RunEvent>,
}

impl VirtualEngine {
    #[allow(clippy::missing_panics_doc)]
    pub fn new() -> Self {
        Self::on(ManualScheduler::new())
    }

    /// A clock whose cancelled timers keep firing, as if already queued.
    pub fn with_queued_callbacks() -> Self {
        Self::on(ManualScheduler::ignoring_cancellation())
    }

    fn on(clock: ManualScheduler) -> Self {
        let clock = Arc::new(clock);
        let (tx, events) = mpsc::unbounded_channel();
        let engine = SessionEngine::new(clock.clone(), Arc::new(tx), EngineOptions::default())
            .expect("default options are valid");
        Self {
            engine,
            clock,
            events,
        }
    }

    /// Everything emitted since the last call.
    pub fn drain(&mut self) -> Vec<RunEvent> {
        std::iter::from_fn(|| self.events.try_recv().ok()).collect()
    }
}

/// Phases announced by `PhaseChanged`, in order.
pub fn announced_phases(events: &[RunEvent]) -> Vec<Phase> {
    events
        .iter()
        .filter_map(|e| match e.event {
            SessionEvent::PhaseChanged { phase, .. } => Some(phase),
            _ => None,
        })
        .collect()
}
