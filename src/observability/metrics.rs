//! Metrics collection.
//!
//! Prometheus-compatible metrics for run lifecycle and event delivery.
//! Every label value comes from a closed enum, so label cardinality is fixed.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::StillwaterError;
use crate::session::{RunKind, RunOutcome};

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

const RUN_KINDS: [RunKind; 2] = [RunKind::Breathing, RunKind::Meditation];

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `StillwaterError::Io` if the recorder or HTTP listener cannot be
/// installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), StillwaterError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| StillwaterError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!("stillwater_runs_started_total", "Runs started by kind");
    describe_counter!(
        "stillwater_runs_ended_total",
        "Runs ended by kind and outcome"
    );
    describe_counter!(
        "stillwater_stale_callbacks_total",
        "Timer callbacks dropped because their run was no longer active"
    );
    describe_counter!("stillwater_events_total", "Engine events emitted by type");
    describe_gauge!(
        "stillwater_active_run",
        "Currently active run kind (1 = active)"
    );
}

/// Records a run entering the active slot.
pub fn record_run_started(kind: RunKind) {
    counter!("stillwater_runs_started_total", "kind" => kind.as_str()).increment(1);
}

/// Records a run leaving the active slot.
pub fn record_run_ended(kind: RunKind, outcome: RunOutcome) {
    counter!(
        "stillwater_runs_ended_total",
        "kind" => kind.as_str(),
        "outcome" => outcome.as_str(),
    )
    .increment(1);
}

/// Records a timer callback swallowed by the run id check.
pub fn record_stale_callback(kind: RunKind) {
    counter!("stillwater_stale_callbacks_total", "kind" => kind.as_str()).increment(1);
}

/// Records one emitted engine event.
pub fn record_event(name: &'static str) {
    counter!("stillwater_events_total", "event" => name).increment(1);
}

/// Sets the active-run gauge; `None` when the slot is empty.
///
/// Every kind is written so no stale label keeps reporting `1.0`.
pub fn set_active_run(active: Option<RunKind>) {
    for kind in RUN_KINDS {
        let value = if active == Some(kind) { 1.0 } else { 0.0 };
        gauge!("stillwater_active_run", "kind" => kind.as_str()).set(value);
    }
}
