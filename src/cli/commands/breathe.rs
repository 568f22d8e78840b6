//! `breathe` command handler.

use std::ops::ControlFlow;

use tokio_util::sync::CancellationToken;

use super::Output;
use super::runner::{Finish, Runner};
use crate::cli::args::BreatheArgs;
use crate::config::{PhaseConfig, Settings};
use crate::error::StillwaterError;
use crate::session::{Phase, SessionEvent};

/// Resolves phase lengths: command-line flags over the settings file.
fn phase_config(args: &BreatheArgs, settings: &Settings) -> PhaseConfig {
    let defaults = settings.breathing.phases();
    PhaseConfig::new(
        args.inhale.unwrap_or(defaults.inhale_seconds),
        args.hold.unwrap_or(defaults.hold_seconds),
        args.exhale.unwrap_or(defaults.exhale_seconds),
    )
}

/// Cycle limit; a simulation without any limit runs a single cycle.
fn cycle_limit(args: &BreatheArgs) -> Option<u64> {
    let unbounded = args.duration.is_none() && args.cycles.is_none();
    args.cycles
        .or_else(|| (args.run.simulate && unbounded).then_some(1))
}

/// Run the breathing cycle until the cycle or time limit, or a signal.
///
/// # Errors
///
/// Returns a configuration error for invalid phase lengths, or an I/O
/// error if output cannot be written.
pub async fn run(
    args: &BreatheArgs,
    settings: &Settings,
    out: &mut Output,
    cancel: &CancellationToken,
) -> Result<(), StillwaterError> {
    let config = phase_config(args, settings);
    let cycles = cycle_limit(args);

    let mut runner = Runner::new(&args.run, settings.engine_options())?;
    let cycle = runner.engine().phase_cycle();
    let run = cycle.start(&config)?;

    let _deadline = args.duration.map(|limit| {
        let finish = runner.finish();
        let cycle = cycle.clone();
        runner.scheduler().after(
            limit,
            Box::new(move || {
                cycle.stop(run);
                finish.cancel();
            }),
        )
    });

    out.line(&format!(
        "Breathing: inhale {}s, hold {}s, exhale {}s",
        config.inhale_seconds, config.hold_seconds, config.exhale_seconds
    ))?;

    let mut inhales: u64 = 0;
    let mut write_error = None;
    let finish = runner
        .run(cancel, |event| {
            if let SessionEvent::PhaseChanged {
                phase: Phase::Inhale,
                ..
            } = event.event
            {
                inhales += 1;
                if cycles.is_some_and(|limit| inhales > limit) {
                    return ControlFlow::Break(());
                }
            }
            match out.render(&event.event) {
                Ok(()) => ControlFlow::Continue(()),
                Err(e) => {
                    write_error = Some(e);
                    ControlFlow::Break(())
                }
            }
        })
        .await;

    cycle.stop(run);
    if let Some(e) = write_error {
        return Err(e.into());
    }

    let completed = inhales.saturating_sub(1);
    tracing::info!(run = %run.id(), ?finish, cycles = completed, "breathing finished");
    let summary = match finish {
        Finish::Interrupted => format!("Stopped after {completed} full cycle(s)"),
        Finish::Done | Finish::Idle => format!("Completed {completed} full cycle(s)"),
    };
    out.line(&summary)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::RunOptions;

    fn args() -> BreatheArgs {
        BreatheArgs {
            inhale: None,
            hold: Some(2.0),
            exhale: None,
            cycles: None,
            duration: None,
            run: RunOptions::default(),
        }
    }

    #[test]
    fn flags_override_settings() {
        let mut settings = Settings::default();
        settings.breathing.inhale = 3.0;
        let config = phase_config(&args(), &settings);
        assert_eq!(config, PhaseConfig::new(3.0, 2.0, 6.0));
    }

    #[test]
    fn simulation_defaults_to_one_cycle() {
        let mut a = args();
        assert_eq!(cycle_limit(&a), None);
        a.run.simulate = true;
        assert_eq!(cycle_limit(&a), Some(1));
        a.duration = Some(std::time::Duration::from_secs(30));
        assert_eq!(cycle_limit(&a), None);
        a.cycles = Some(4);
        assert_eq!(cycle_limit(&a), Some(4));
    }
}
