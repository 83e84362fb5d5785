//! Error types for configuration loading.
//!
//! The simulation itself never fails: degenerate inputs are handled where
//! they are computed. Only reading and validating settings can go wrong.

use std::fmt;

/// Errors that can occur while loading or validating [`Settings`](crate::Settings).
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read or write the settings file.
    Io(std::io::Error),
    /// Settings file is not valid JSON for the settings schema.
    Parse(serde_json::Error),
    /// Settings parsed but hold an out-of-range value.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to access settings file: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse settings: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid settings: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}
