//! Observability module
//!
//! Logging, metrics, and the JSONL event recorder.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::EventEmitter;
pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
