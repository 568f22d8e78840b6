//! Configuration schema types
//!
//! Caller-supplied session configuration ([`PhaseConfig`],
//! [`SessionConfig`]), engine-wide [`EngineOptions`], and the optional YAML
//! [`Settings`] file that overrides the built-in defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::modes::{MeditationMode, ModeScript};

/// Default inhale length in seconds.
pub const DEFAULT_INHALE_SECONDS: f64 = 4.0;

/// Default hold length in seconds.
pub const DEFAULT_HOLD_SECONDS: f64 = 4.0;

/// Default exhale length in seconds.
pub const DEFAULT_EXHALE_SECONDS: f64 = 6.0;

/// Default interval between instruction rotations.
pub const DEFAULT_ROTATION_SECONDS: f64 = 5.0;

/// Default cadence of breathing tick events.
pub const DEFAULT_PHASE_TICK: Duration = Duration::from_millis(100);

// ============================================================================
// Breathing
// ============================================================================

/// Breathing phase lengths, in seconds.
///
/// Immutable for the lifetime of one cycle run. Validated by
/// [`PhaseConfig::validate`] when the run starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseConfig {
    /// Inhale length.
    #[serde(rename = "inhale", default = "default_inhale")]
    pub inhale_seconds: f64,

    /// Hold length.
    #[serde(rename = "hold", default = "default_hold")]
    pub hold_seconds: f64,

    /// Exhale length.
    #[serde(rename = "exhale", default = "default_exhale")]
    pub exhale_seconds: f64,
}

impl PhaseConfig {
    /// Creates a config from explicit phase lengths.
    #[must_use]
    pub const fn new(inhale_seconds: f64, hold_seconds: f64, exhale_seconds: f64) -> Self {
        Self {
            inhale_seconds,
            hold_seconds,
            exhale_seconds,
        }
    }
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_INHALE_SECONDS,
            DEFAULT_HOLD_SECONDS,
            DEFAULT_EXHALE_SECONDS,
        )
    }
}

const fn default_inhale() -> f64 {
    DEFAULT_INHALE_SECONDS
}

const fn default_hold() -> f64 {
    DEFAULT_HOLD_SECONDS
}

const fn default_exhale() -> f64 {
    DEFAULT_EXHALE_SECONDS
}

// ============================================================================
// Meditation
// ============================================================================

/// Configuration for one guided meditation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Selected mode.
    pub mode: MeditationMode,

    /// Countdown length. Fractional values round up to whole seconds.
    pub total_duration_seconds: f64,

    /// Interval between rotating instructions.
    pub instruction_rotation_seconds: f64,

    /// Instruction text per mode.
    pub instructions_by_mode: BTreeMap<MeditationMode, ModeScript>,
}

impl SessionConfig {
    /// Builds the preset configuration for a mode name.
    ///
    /// Unknown names fall back to `relax`, so `for_mode("bogus")` equals
    /// `for_mode("relax")`.
    #[must_use]
    pub fn for_mode(name: &str) -> Self {
        Self::preset(MeditationMode::resolve(name))
    }

    /// Builds the preset configuration for a mode.
    #[must_use]
    pub fn preset(mode: MeditationMode) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let total_duration_seconds = (mode.preset().minutes * 60) as f64;
        Self {
            mode,
            total_duration_seconds,
            instruction_rotation_seconds: DEFAULT_ROTATION_SECONDS,
            instructions_by_mode: MeditationMode::ALL
                .into_iter()
                .map(|m| (m, m.default_script()))
                .collect(),
        }
    }

    /// Returns a copy with a different countdown length.
    #[must_use]
    pub const fn with_total_seconds(mut self, seconds: f64) -> Self {
        self.total_duration_seconds = seconds;
        self
    }

    /// Returns a copy with a different rotation interval.
    #[must_use]
    pub const fn with_rotation_seconds(mut self, seconds: f64) -> Self {
        self.instruction_rotation_seconds = seconds;
        self
    }

    /// Returns the instruction script for the selected mode.
    ///
    /// Missing entries fall back to the `relax` script, then to the
    /// built-in text of the selected mode.
    #[must_use]
    pub fn script(&self) -> ModeScript {
        self.instructions_by_mode
            .get(&self.mode)
            .or_else(|| self.instructions_by_mode.get(&MeditationMode::Relax))
            .cloned()
            .unwrap_or_else(|| self.mode.default_script())
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Engine-wide options shared by every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Cadence of breathing tick events.
    pub phase_tick: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            phase_tick: DEFAULT_PHASE_TICK,
        }
    }
}

// ============================================================================
// Settings File
// ============================================================================

/// Root of the optional YAML settings file.
///
/// ```yaml
/// breathing:
///   inhale: 4
///   hold: 7
///   exhale: 8
///   tick_interval_ms: 100
/// meditation:
///   rotation_seconds: 5
///   modes:
///     focus:
///       duration_minutes: 3
///       initial: "Settle in…"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Breathing defaults.
    #[serde(default)]
    pub breathing: BreathingSettings,

    /// Meditation overrides.
    #[serde(default)]
    pub meditation: MeditationSettings,
}

/// Breathing section of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreathingSettings {
    /// Default inhale length in seconds.
    #[serde(default = "default_inhale")]
    pub inhale: f64,

    /// Default hold length in seconds.
    #[serde(default = "default_hold")]
    pub hold: f64,

    /// Default exhale length in seconds.
    #[serde(default = "default_exhale")]
    pub exhale: f64,

    /// Tick cadence in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl BreathingSettings {
    /// Phase lengths configured by this section.
    #[must_use]
    pub const fn phases(&self) -> PhaseConfig {
        PhaseConfig::new(self.inhale, self.hold, self.exhale)
    }
}

impl Default for BreathingSettings {
    fn default() -> Self {
        Self {
            inhale: DEFAULT_INHALE_SECONDS,
            hold: DEFAULT_HOLD_SECONDS,
            exhale: DEFAULT_EXHALE_SECONDS,
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn default_tick_interval_ms() -> u64 {
    DEFAULT_PHASE_TICK.as_millis() as u64
}

/// Meditation section of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeditationSettings {
    /// Interval between rotating instructions.
    #[serde(default = "default_rotation_seconds")]
    pub rotation_seconds: f64,

    /// Per-mode overrides.
    #[serde(default)]
    pub modes: BTreeMap<MeditationMode, ModeOverride>,
}

impl Default for MeditationSettings {
    fn default() -> Self {
        Self {
            rotation_seconds: DEFAULT_ROTATION_SECONDS,
            modes: BTreeMap::new(),
        }
    }
}

const fn default_rotation_seconds() -> f64 {
    DEFAULT_ROTATION_SECONDS
}

/// Override for a single meditation mode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeOverride {
    /// Session length in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<f64>,

    /// Instruction shown at start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,

    /// Instruction shown on rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<String>,
}

impl Settings {
    /// Engine options derived from these settings.
    #[must_use]
    pub const fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            phase_tick: Duration::from_millis(self.breathing.tick_interval_ms),
        }
    }

    /// Builds the session configuration for a mode name, applying overrides.
    ///
    /// Unknown names fall back to `relax` exactly as
    /// [`SessionConfig::for_mode`] does.
    #[must_use]
    pub fn session_config(&self, name: &str) -> SessionConfig {
        let mut config = SessionConfig::for_mode(name)
            .with_rotation_seconds(self.meditation.rotation_seconds);

        for (mode, over) in &self.meditation.modes {
            if let Some(script) = config.instructions_by_mode.get_mut(mode) {
                if let Some(initial) = &over.initial {
                    script.initial.clone_from(initial);
                }
                if let Some(rotation) = &over.rotation {
                    script.rotation.clone_from(rotation);
                }
            }
        }

        if let Some(minutes) = self
            .meditation
            .modes
            .get(&config.mode)
            .and_then(|o| o.duration_minutes)
        {
            config.total_duration_seconds = minutes * 60.0;
        }

        config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_config_defaults() {
        let config = PhaseConfig::default();
        assert!((config.inhale_seconds - 4.0).abs() < f64::EPSILON);
        assert!((config.hold_seconds - 4.0).abs() < f64::EPSILON);
        assert!((config.exhale_seconds - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn phase_config_partial_yaml_uses_defaults() {
        let config: PhaseConfig = serde_yaml::from_str("hold: 7").unwrap();
        assert!((config.inhale_seconds - 4.0).abs() < f64::EPSILON);
        assert!((config.hold_seconds - 7.0).abs() < f64::EPSILON);
        assert!((config.exhale_seconds - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn session_presets() {
        let relax = SessionConfig::preset(MeditationMode::Relax);
        assert!((relax.total_duration_seconds - 600.0).abs() < f64::EPSILON);
        let calm = SessionConfig::preset(MeditationMode::Calm);
        assert!((calm.total_duration_seconds - 900.0).abs() < f64::EPSILON);
        let focus = SessionConfig::preset(MeditationMode::Focus);
        assert!((focus.total_duration_seconds - 300.0).abs() < f64::EPSILON);
        assert!((focus.instruction_rotation_seconds - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_mode_equals_relax() {
        assert_eq!(SessionConfig::for_mode("bogus"), SessionConfig::for_mode("relax"));
    }

    #[test]
    fn script_falls_back_to_relax_entry() {
        let mut config = SessionConfig::preset(MeditationMode::Focus);
        config.instructions_by_mode.remove(&MeditationMode::Focus);
        assert_eq!(config.script(), MeditationMode::Relax.default_script());
    }

    #[test]
    fn script_falls_back_to_builtin_when_map_empty() {
        let mut config = SessionConfig::preset(MeditationMode::Calm);
        config.instructions_by_mode.clear();
        assert_eq!(config.script(), MeditationMode::Calm.default_script());
    }

    #[test]
    fn settings_empty_document_is_default() {
        let settings: Settings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.engine_options(), EngineOptions::default());
    }

    #[test]
    fn settings_reject_unknown_fields() {
        let result: Result<Settings, _> = serde_yaml::from_str("breathing:\n  inhail: 4\n");
        assert!(result.is_err());
    }

    #[test]
    fn settings_override_mode() {
        let yaml = r#"
meditation:
  rotation_seconds: 8
  modes:
    focus:
      duration_minutes: 2
      rotation: "Back to the breath"
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        let config = settings.session_config("focus");
        assert_eq!(config.mode, MeditationMode::Focus);
        assert!((config.total_duration_seconds - 120.0).abs() < f64::EPSILON);
        assert!((config.instruction_rotation_seconds - 8.0).abs() < f64::EPSILON);
        let script = config.script();
        assert_eq!(script.initial, "Bring attention to your breath…");
        assert_eq!(script.rotation, "Back to the breath");
    }

    #[test]
    fn settings_override_applies_to_fallback() {
        let yaml = r"
meditation:
  modes:
    relax:
      duration_minutes: 1
";
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.session_config("bogus"), settings.session_config("relax"));
    }

    #[test]
    fn settings_tick_interval() {
        let settings: Settings =
            serde_yaml::from_str("breathing:\n  tick_interval_ms: 250\n").unwrap();
        assert_eq!(
            settings.engine_options().phase_tick,
            Duration::from_millis(250)
        );
    }
}
