//! Settings file loader
//!
//! Pipeline:
//! 1. Size check
//! 2. YAML parsing (UTF-8 BOM tolerated)
//! 3. Deserialization to typed [`Settings`]
//! 4. Validation of every duration

use std::path::Path;

use serde_yaml::Value;

use crate::config::schema::Settings;
use crate::config::validation::validate_settings;
use crate::error::ConfigError;

/// Maximum settings file size in bytes.
pub const MAX_SETTINGS_SIZE: u64 = 64 * 1024;

/// Loads and validates a settings file.
///
/// # Errors
///
/// - `ConfigError::MissingFile` if the file cannot be read
/// - `ConfigError::InvalidValue` if it exceeds [`MAX_SETTINGS_SIZE`]
/// - `ConfigError::ParseError` for malformed or empty YAML and unknown fields
/// - `ConfigError::ValidationError` listing every invalid duration
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;

    if metadata.len() > MAX_SETTINGS_SIZE {
        return Err(ConfigError::InvalidValue {
            field: "file_size".to_string(),
            value: metadata.len().to_string(),
            expected: format!("at most {MAX_SETTINGS_SIZE} bytes"),
        });
    }

    let raw_content = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
        path: path.to_path_buf(),
    })?;
    let raw_content = raw_content.strip_prefix('\u{feff}').unwrap_or(&raw_content);

    let settings = parse_settings(path, raw_content)?;
    tracing::debug!(path = %path.display(), "settings loaded");
    Ok(settings)
}

/// Parses and validates settings from YAML text.
///
/// `path` is only used for error reporting.
///
/// # Errors
///
/// See [`load_settings`].
pub fn parse_settings(path: &Path, yaml: &str) -> Result<Settings, ConfigError> {
    let root: Value = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })?;

    if root.is_null() {
        return Err(ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: "Settings file is empty".to_string(),
        });
    }

    let settings: Settings =
        serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: format!("Failed to deserialize settings: {e}"),
        })?;

    let errors = validate_settings(&settings);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationError {
            path: path.display().to_string(),
            errors,
        });
    }

    Ok(settings)
}
