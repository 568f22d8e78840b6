//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod breathe;
pub mod meditate;
pub mod modes;
pub mod runner;
pub mod validate;

use std::io::Write;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use crate::cli::args::{Cli, Commands};
use crate::cli::render::Renderer;
use crate::config::{Settings, load_settings};
use crate::error::StillwaterError;

/// Where command output goes; a sink under `--quiet`.
pub type Output = Renderer<Box<dyn Write + Send>>;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// `cancel` is triggered by Ctrl-C / SIGTERM; running sessions stop
/// cleanly when it fires.
///
/// # Errors
///
/// Returns an error if the settings file is invalid or the dispatched
/// command handler fails.
pub async fn dispatch(cli: Cli, cancel: CancellationToken) -> Result<(), StillwaterError> {
    if let Some(port) = cli.metrics_port {
        crate::observability::init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let writer: Box<dyn Write + Send> = if cli.quiet {
        Box::new(std::io::sink())
    } else {
        Box::new(std::io::stdout())
    };
    let mut out = Renderer::new(writer);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Breathe(args) => {
            let settings = settings(config)?;
            breathe::run(&args, &settings, &mut out, &cancel).await
        }
        Commands::Meditate(args) => {
            let settings = settings(config)?;
            meditate::run(&args, &settings, &mut out, &cancel).await
        }
        Commands::Modes => modes::run(&settings(config)?, &mut out),
        Commands::Validate(args) => validate::run(&args, &mut out),
    };

    out.flush()?;
    result
}

/// Loads the `--config` settings file, or the built-in defaults.
fn settings(path: Option<&Path>) -> Result<Settings, StillwaterError> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    tracing::info!(config = %path.display(), "loading settings");
    Ok(load_settings(path)?)
}
