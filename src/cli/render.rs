//! Terminal rendering of engine events.
//!
//! The engine reports remaining time as plain numbers; formatting as a
//! clock face and suppressing repeated phase readouts happens here.

use std::io::{self, Write};

use crate::session::{Phase, SessionEvent};

/// Formats whole seconds as `mm:ss`, or `h:mm:ss` from one hour up.
#[must_use]
pub fn format_clock(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Formats a phase length, dropping a zero fraction (`4s`, `2.5s`).
fn format_seconds(seconds: f64) -> String {
    if seconds.fract().abs() < f64::EPSILON {
        format!("{seconds:.0}s")
    } else {
        format!("{seconds}s")
    }
}

/// Writes human-readable lines for engine events.
///
/// Phase ticks arrive several times per second; only changes of the
/// displayed whole-second value are written.
pub struct Renderer<W> {
    out: W,
    shown: Option<(Phase, u64)>,
}

impl<W: Write> Renderer<W> {
    /// Creates a renderer writing to `out`.
    pub const fn new(out: W) -> Self {
        Self { out, shown: None }
    }

    /// Writes the line for `event`, if it has one.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn render(&mut self, event: &SessionEvent) -> io::Result<()> {
        match event {
            SessionEvent::PhaseChanged {
                phase,
                duration_seconds,
            } => {
                self.shown = None;
                writeln!(self.out, "{phase} ({})", format_seconds(*duration_seconds))
            }
            SessionEvent::PhaseTick {
                phase,
                remaining_seconds,
            } => {
                let reading = (*phase, *remaining_seconds);
                if self.shown == Some(reading) {
                    return Ok(());
                }
                self.shown = Some(reading);
                writeln!(self.out, "  {remaining_seconds}")
            }
            SessionEvent::SessionTick { remaining_seconds } => {
                writeln!(self.out, "  {}", format_clock(*remaining_seconds))
            }
            SessionEvent::InstructionChanged { text } => writeln!(self.out, "» {text}"),
            SessionEvent::SessionComplete => writeln!(self.out, "Session complete"),
        }
    }

    /// Writes a free-form line.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")
    }

    /// Flushes the underlying writer.
    ///
    /// # Errors
    ///
    /// Propagates flush failures.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(events: &[SessionEvent]) -> String {
        let mut renderer = Renderer::new(Vec::new());
        for event in events {
            renderer.render(event).unwrap();
        }
        String::from_utf8(renderer.into_inner()).unwrap()
    }

    #[test]
    fn clock_format() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(65), "01:05");
        assert_eq!(format_clock(600), "10:00");
        assert_eq!(format_clock(3661), "1:01:01");
    }

    #[test]
    fn phase_ticks_are_deduplicated() {
        let tick = |remaining_seconds| SessionEvent::PhaseTick {
            phase: Phase::Inhale,
            remaining_seconds,
        };
        let out = rendered(&[
            SessionEvent::PhaseChanged {
                phase: Phase::Inhale,
                duration_seconds: 2.0,
            },
            tick(2),
            tick(2),
            tick(1),
            tick(1),
            tick(0),
            SessionEvent::PhaseChanged {
                phase: Phase::Hold,
                duration_seconds: 2.5,
            },
        ]);
        assert_eq!(out, "Inhale (2s)\n  2\n  1\n  0\nHold (2.5s)\n");
    }

    #[test]
    fn meditation_lines() {
        let out = rendered(&[
            SessionEvent::InstructionChanged {
                text: "Breathe".into(),
            },
            SessionEvent::SessionTick {
                remaining_seconds: 61,
            },
            SessionEvent::SessionComplete,
        ]);
        assert_eq!(out, "» Breathe\n  01:01\nSession complete\n");
    }
}
