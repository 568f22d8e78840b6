//! Configuration module
//!
//! Session configuration types, built-in meditation modes, validation, and
//! loading of the optional YAML settings file.

pub mod loader;
pub mod modes;
pub mod schema;
pub mod validation;

pub use loader::{load_settings, parse_settings};
pub use modes::{MeditationMode, ModePreset, ModeScript, list_modes, suggest_mode};
pub use schema::*;
pub use validation::{PhaseDurations, SessionPlan, validate_settings};
