//! JSONL event recorder.
//!
//! Engine events are written as newline-delimited JSON, each line carrying a
//! monotonically increasing sequence number and a UTC timestamp next to the
//! run id and the event fields.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::RunEvent;

/// One recorded line.
#[derive(Debug, Serialize)]
struct EventEnvelope<'a> {
    /// Zero-based, monotonically increasing sequence counter.
    sequence: u64,
    /// When the event was recorded.
    timestamp: DateTime<Utc>,
    /// The engine event (flattened into the same JSON object).
    #[serde(flatten)]
    event: &'a RunEvent,
}

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are dropped: recording must never stop a
/// session.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Appends one event as a single JSONL line.
    pub fn record(&self, event: &RunEvent) {
        let envelope = EventEnvelope {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
            }
        }
    }

    /// Flushes buffered lines to the underlying writer.
    pub fn flush(&self) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = w.flush();
        }
    }
}

impl Drop for EventEmitter {
    fn drop(&mut self) {
        if let Ok(w) = self.writer.get_mut() {
            let _ = w.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Phase, RunEvent, RunId, SessionEvent};
    use std::sync::Arc;

    /// Writer that appends into a shared buffer for inspection.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn lines(buf: &SharedBuf) -> Vec<serde_json::Value> {
        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn sample(run: u64) -> RunEvent {
        RunEvent {
            run: RunId::new(run),
            event: SessionEvent::PhaseChanged {
                phase: Phase::Inhale,
                duration_seconds: 4.0,
            },
        }
    }

    #[test]
    fn sequence_timestamp_and_fields() {
        let buf = SharedBuf::default();
        let emitter = EventEmitter::new(Box::new(buf.clone()));
        emitter.record(&sample(1));
        emitter.record(&sample(2));
        emitter.flush();

        let lines = lines(&buf);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[0]["run"], 1);
        assert_eq!(lines[1]["run"], 2);
        assert_eq!(lines[0]["type"], "phase_changed");
        assert_eq!(lines[0]["phase"], "inhale");
        assert!(lines[0]["timestamp"].is_string());
    }

    #[test]
    fn drop_flushes() {
        let buf = SharedBuf::default();
        let emitter = EventEmitter::new(Box::new(buf.clone()));
        emitter.record(&sample(1));
        drop(emitter);
        assert_eq!(lines(&buf).len(), 1);
    }

    #[test]
    fn from_file_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        {
            let emitter = EventEmitter::from_file(&path).unwrap();
            emitter.record(&sample(1));
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
