//! CLI argument definitions
//!
//! All Clap derive structs for `stillwater` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Guided breathing and meditation timers.
#[derive(Parser, Debug)]
#[command(name = "stillwater", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a YAML settings file.
    #[arg(long, global = true, env = "STILLWATER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "STILLWATER_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "STILLWATER_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Serve Prometheus metrics on `127.0.0.1:<port>`.
    #[arg(long, global = true, env = "STILLWATER_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the inhale / hold / exhale breathing cycle.
    Breathe(BreatheArgs),

    /// Run a guided meditation countdown.
    Meditate(MeditateArgs),

    /// List meditation modes and their presets.
    Modes,

    /// Validate a settings file without running anything.
    Validate(ValidateArgs),
}

/// Options shared by the session-running commands.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Run instantly in virtual time instead of waiting in real time.
    #[arg(long)]
    pub simulate: bool,

    /// Append every engine event as JSON lines to this file.
    #[arg(long, value_name = "FILE")]
    pub events: Option<PathBuf>,
}

/// Arguments for `breathe`.
#[derive(Args, Debug, Clone)]
pub struct BreatheArgs {
    /// Inhale length in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub inhale: Option<f64>,

    /// Hold length in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub hold: Option<f64>,

    /// Exhale length in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub exhale: Option<f64>,

    /// Stop after this many full cycles.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub cycles: Option<u64>,

    /// Stop after this much time (e.g. `90s`, `2m`).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Shared run options.
    #[command(flatten)]
    pub run: RunOptions,
}

/// Arguments for `meditate`.
#[derive(Args, Debug, Clone)]
pub struct MeditateArgs {
    /// Mode name (`relax`, `calm`, `focus`); unknown names fall back to relax.
    #[arg(default_value = "relax")]
    pub mode: String,

    /// Session length overriding the mode preset (e.g. `3m`).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Interval between rotating instructions (e.g. `5s`).
    #[arg(long, value_parser = humantime::parse_duration)]
    pub rotation: Option<Duration>,

    /// Shared run options.
    #[command(flatten)]
    pub run: RunOptions,
}

/// Arguments for `validate`.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Settings file to check.
    pub path: PathBuf,
}

// ============================================================================
// Value Enums
// ============================================================================

/// Color output choice.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}
