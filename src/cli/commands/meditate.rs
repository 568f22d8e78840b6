//! `meditate` command handler.

use std::ops::ControlFlow;

use tokio_util::sync::CancellationToken;

use super::Output;
use super::runner::{Finish, Runner};
use crate::cli::args::MeditateArgs;
use crate::cli::render::format_clock;
use crate::config::{SessionConfig, Settings};
use crate::error::StillwaterError;
use crate::session::SessionEvent;

/// Resolves the session: mode preset, settings file, then flags.
fn session_config(args: &MeditateArgs, settings: &Settings) -> SessionConfig {
    let mut config = settings.session_config(&args.mode);
    if let Some(total) = args.duration {
        config.total_duration_seconds = total.as_secs_f64();
    }
    if let Some(rotation) = args.rotation {
        config.instruction_rotation_seconds = rotation.as_secs_f64();
    }
    config
}

/// Run one meditation session to completion or until a signal.
///
/// # Errors
///
/// Returns a configuration error for invalid durations, or an I/O error if
/// output cannot be written.
pub async fn run(
    args: &MeditateArgs,
    settings: &Settings,
    out: &mut Output,
    cancel: &CancellationToken,
) -> Result<(), StillwaterError> {
    let config = session_config(args, settings);

    let mut runner = Runner::new(&args.run, settings.engine_options())?;
    let controller = runner.engine().session_controller();
    let run = controller.start(&config)?;

    let total = controller
        .state(run)
        .map_or(0, |state| state.remaining_seconds);
    out.line(&format!("Meditation: {} ({})", config.mode, format_clock(total)))?;

    let mut write_error = None;
    let finish = runner
        .run(cancel, |event| {
            if let Err(e) = out.render(&event.event) {
                write_error = Some(e);
                return ControlFlow::Break(());
            }
            if event.event == SessionEvent::SessionComplete {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .await;

    let stopped = controller.stop(run);
    if let Some(e) = write_error {
        return Err(e.into());
    }

    tracing::info!(run = %run.id(), ?finish, stopped, "meditation finished");
    if finish == Finish::Interrupted {
        out.line("Session stopped")?;
    }
    Ok(())
}
