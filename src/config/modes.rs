//! Built-in meditation modes
//!
//! Each mode carries a preset duration and the instruction text shown when
//! the session starts and on every rotation. Mode names are resolved
//! leniently: legacy aliases are accepted and anything unknown falls back
//! to [`MeditationMode::Relax`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// Types
// ============================================================================

/// A guided meditation mode.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MeditationMode {
    /// Ten minutes of body relaxation. The fallback for unknown names.
    #[default]
    Relax,
    /// Fifteen minutes of letting thoughts pass.
    Calm,
    /// Five minutes of breath-focused attention.
    Focus,
}

/// Instruction text for one mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeScript {
    /// Shown as soon as the session starts.
    pub initial: String,
    /// Shown on every rotation tick.
    pub rotation: String,
}

impl ModeScript {
    /// Uses the same text for the initial and the rotating instruction.
    #[must_use]
    pub fn repeating(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            initial: text.clone(),
            rotation: text,
        }
    }
}

/// A built-in mode definition.
pub struct ModePreset {
    /// The mode this preset describes.
    pub mode: MeditationMode,

    /// Default session length in minutes.
    pub minutes: u64,

    /// Instruction shown at start and on rotation.
    pub instruction: &'static str,

    /// Legacy names that resolve to this mode.
    pub aliases: &'static [&'static str],
}

// ============================================================================
// Registry
// ============================================================================

static BUILTIN_MODES: [ModePreset; 3] = [
    ModePreset {
        mode: MeditationMode::Relax,
        minutes: 10,
        instruction: "Release tension… Let your body soften…",
        aliases: &["stress"],
    },
    ModePreset {
        mode: MeditationMode::Calm,
        minutes: 15,
        instruction: "Allow thoughts to pass… Stay present…",
        aliases: &["sleep"],
    },
    ModePreset {
        mode: MeditationMode::Focus,
        minutes: 5,
        instruction: "Bring attention to your breath…",
        aliases: &[],
    },
];

// ============================================================================
// Public API
// ============================================================================

impl MeditationMode {
    /// All modes in display order.
    pub const ALL: [Self; 3] = [Self::Relax, Self::Calm, Self::Focus];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relax => "relax",
            Self::Calm => "calm",
            Self::Focus => "focus",
        }
    }

    /// Returns the built-in preset for this mode.
    #[must_use]
    pub fn preset(self) -> &'static ModePreset {
        // The registry holds one entry per variant, in declaration order.
        &BUILTIN_MODES[self as usize]
    }

    /// Parses a mode name or legacy alias, case-insensitively.
    ///
    /// Returns `None` for unknown names; see [`Self::resolve`] for the
    /// lenient variant used when starting a session.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        BUILTIN_MODES
            .iter()
            .find(|p| p.mode.as_str() == name || p.aliases.contains(&name.as_str()))
            .map(|p| p.mode)
    }

    /// Resolves a mode name, falling back to [`Self::Relax`] when unknown.
    ///
    /// The fallback is logged, never reported as an error.
    #[must_use]
    pub fn resolve(name: &str) -> Self {
        Self::parse(name).unwrap_or_else(|| {
            let suggestion = suggest_mode(name);
            warn!(
                mode = name,
                suggestion = suggestion.unwrap_or("<none>"),
                "unknown meditation mode; falling back to relax"
            );
            Self::Relax
        })
    }

    /// Preset instruction script.
    #[must_use]
    pub fn default_script(self) -> ModeScript {
        ModeScript::repeating(self.preset().instruction)
    }
}

impl fmt::Display for MeditationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns every built-in preset in display order.
#[must_use]
pub fn list_modes() -> &'static [ModePreset] {
    &BUILTIN_MODES
}

/// Suggest a similar mode name for typo correction.
///
/// Returns the closest canonical name or alias if its Damerau-Levenshtein
/// distance is ≤ 2.
#[must_use]
pub fn suggest_mode(input: &str) -> Option<&'static str> {
    let input = input.trim().to_ascii_lowercase();
    BUILTIN_MODES
        .iter()
        .flat_map(|p| std::iter::once(p.mode.as_str()).chain(p.aliases.iter().copied()))
        .map(|name| (name, strsim::damerau_levenshtein(&input, name)))
        .filter(|(_, dist)| *dist <= 2)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_follow_variant_order() {
        for mode in MeditationMode::ALL {
            assert_eq!(mode.preset().mode, mode);
        }
    }

    #[test]
    fn preset_durations() {
        assert_eq!(MeditationMode::Relax.preset().minutes, 10);
        assert_eq!(MeditationMode::Calm.preset().minutes, 15);
        assert_eq!(MeditationMode::Focus.preset().minutes, 5);
    }

    #[test]
    fn parse_canonical_names() {
        assert_eq!(MeditationMode::parse("relax"), Some(MeditationMode::Relax));
        assert_eq!(MeditationMode::parse("calm"), Some(MeditationMode::Calm));
        assert_eq!(MeditationMode::parse("focus"), Some(MeditationMode::Focus));
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        assert_eq!(MeditationMode::parse("  Focus "), Some(MeditationMode::Focus));
    }

    #[test]
    fn parse_legacy_aliases() {
        assert_eq!(MeditationMode::parse("stress"), Some(MeditationMode::Relax));
        assert_eq!(MeditationMode::parse("sleep"), Some(MeditationMode::Calm));
    }

    #[test]
    fn parse_unknown_is_none() {
        assert_eq!(MeditationMode::parse("bogus"), None);
    }

    #[test]
    fn resolve_unknown_falls_back_to_relax() {
        assert_eq!(MeditationMode::resolve("bogus"), MeditationMode::Relax);
        assert_eq!(MeditationMode::resolve(""), MeditationMode::Relax);
    }

    #[test]
    fn suggest_close_typo() {
        assert_eq!(suggest_mode("focsu"), Some("focus"));
        assert_eq!(suggest_mode("clam"), Some("calm"));
    }

    #[test]
    fn suggest_nothing_for_distant_input() {
        assert_eq!(suggest_mode("transcendental"), None);
    }

    #[test]
    fn default_script_repeats_instruction() {
        let script = MeditationMode::Focus.default_script();
        assert_eq!(script.initial, "Bring attention to your breath…");
        assert_eq!(script.initial, script.rotation);
    }

    #[test]
    fn mode_serializes_lowercase() {
        let json = serde_json::to_string(&MeditationMode::Calm).unwrap();
        assert_eq!(json, "\"calm\"");
    }
}
