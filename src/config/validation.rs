//! Configuration validation
//!
//! Converts caller-supplied seconds into millisecond-resolution durations.
//! A start request is validated completely before the engine touches any
//! state, so a rejected configuration never disturbs a running session.

use std::time::Duration;

use crate::error::{ConfigError, ValidationIssue};

use super::modes::{MeditationMode, ModeScript};
use super::schema::{EngineOptions, PhaseConfig, SessionConfig, Settings};

/// Upper bound for any configured duration (one day).
pub const MAX_DURATION_SECONDS: f64 = 86_400.0;

/// Validated breathing phase lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    /// Inhale length.
    pub inhale: Duration,
    /// Hold length.
    pub hold: Duration,
    /// Exhale length.
    pub exhale: Duration,
}

/// Validated meditation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    /// Mode the session runs in.
    pub mode: MeditationMode,
    /// Countdown start value in whole seconds.
    pub total_seconds: u64,
    /// Interval between rotating instructions.
    pub rotation: Duration,
    /// Instruction text for the mode.
    pub script: ModeScript,
}

/// Converts a number of seconds into a [`Duration`].
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if `value` is NaN, infinite,
/// not positive, rounds to zero milliseconds, or exceeds
/// [`MAX_DURATION_SECONDS`].
pub fn seconds(field: &str, value: f64) -> Result<Duration, ConfigError> {
    let invalid = |expected: &str| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    };

    if !value.is_finite() {
        return Err(invalid("a finite number of seconds"));
    }
    if value <= 0.0 {
        return Err(invalid("a positive number of seconds"));
    }
    if value > MAX_DURATION_SECONDS {
        return Err(invalid("at most 86400 seconds"));
    }

    let millis = (value * 1000.0).round();
    if millis < 1.0 {
        return Err(invalid("at least one millisecond"));
    }

    // Bounded above by MAX_DURATION_SECONDS, so the cast is exact.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    Ok(Duration::from_millis(millis as u64))
}

impl PhaseConfig {
    /// Validates all three phase lengths.
    ///
    /// # Errors
    ///
    /// Returns the first invalid phase as `ConfigError::InvalidValue`.
    pub fn validate(&self) -> Result<PhaseDurations, ConfigError> {
        Ok(PhaseDurations {
            inhale: seconds("inhale", self.inhale_seconds)?,
            hold: seconds("hold", self.hold_seconds)?,
            exhale: seconds("exhale", self.exhale_seconds)?,
        })
    }
}

impl SessionConfig {
    /// Validates the countdown and rotation lengths and resolves the script.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an invalid duration.
    pub fn validate(&self) -> Result<SessionPlan, ConfigError> {
        let total = seconds("total_duration_seconds", self.total_duration_seconds)?;
        let rotation = seconds(
            "instruction_rotation_seconds",
            self.instruction_rotation_seconds,
        )?;

        // At most one day, so whole seconds always fit.
        #[allow(clippy::cast_possible_truncation)]
        let total_seconds = total.as_millis().div_ceil(1000) as u64;

        Ok(SessionPlan {
            mode: self.mode,
            total_seconds,
            rotation,
            script: self.script(),
        })
    }
}

impl EngineOptions {
    /// Validates the engine-wide options.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the phase tick is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phase_tick.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "phase_tick".to_string(),
                value: "0ms".to_string(),
                expected: "a positive interval".to_string(),
            });
        }
        Ok(())
    }
}

/// Collects every problem in a settings document.
///
/// Unlike the `validate` methods this does not stop at the first issue.
#[must_use]
pub fn validate_settings(settings: &Settings) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut check = |path: String, value: f64| {
        if let Err(ConfigError::InvalidValue { expected, .. }) = seconds(&path, value) {
            issues.push(ValidationIssue {
                path,
                message: format!("expected {expected}, got {value}"),
            });
        }
    };

    let breathing = &settings.breathing;
    check("breathing.inhale".to_string(), breathing.inhale);
    check("breathing.hold".to_string(), breathing.hold);
    check("breathing.exhale".to_string(), breathing.exhale);
    check(
        "meditation.rotation_seconds".to_string(),
        settings.meditation.rotation_seconds,
    );
    for (mode, over) in &settings.meditation.modes {
        if let Some(minutes) = over.duration_minutes {
            check(
                format!("meditation.modes.{mode}.duration_minutes"),
                minutes * 60.0,
            );
        }
    }

    if breathing.tick_interval_ms == 0 {
        issues.push(ValidationIssue {
            path: "breathing.tick_interval_ms".to_string(),
            message: "expected a positive interval, got 0".to_string(),
        });
    }

    issues
}

// ============================================================================
// Tests
// ============================================================================
