//! `modes` command handler.

use super::Output;
use crate::cli::render::format_clock;
use crate::config::{Settings, list_modes};
use crate::error::StillwaterError;

/// Print every meditation mode with its effective duration and aliases.
///
/// # Errors
///
/// Returns an I/O error if output cannot be written.
pub fn run(settings: &Settings, out: &mut Output) -> Result<(), StillwaterError> {
    for preset in list_modes() {
        let config = settings.session_config(preset.mode.as_str());
        // Validated settings keep every duration within one day.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total = config.total_duration_seconds.ceil() as u64;
        let aliases = if preset.aliases.is_empty() {
            String::new()
        } else {
            format!(" (alias: {})", preset.aliases.join(", "))
        };
        out.line(&format!(
            "{:<6} {}{aliases}\n       {}",
            preset.mode.as_str(),
            format_clock(total),
            config.script().initial,
        ))?;
    }
    Ok(())
}
