//! `validate` command handler.

use super::Output;
use crate::cli::args::ValidateArgs;
use crate::config::load_settings;
use crate::error::StillwaterError;

/// Load and validate a settings file without running a session.
///
/// # Errors
///
/// Returns the loader's configuration error when the file is missing,
/// malformed, or holds an invalid duration.
pub fn run(args: &ValidateArgs, out: &mut Output) -> Result<(), StillwaterError> {
    tracing::info!(file = %args.path.display(), "validating settings");
    load_settings(&args.path)?;
    tracing::info!(file = %args.path.display(), "settings valid");
    out.line(&format!("{}: ok", args.path.display()))?;
    Ok(())
}
