//! Error types for bringup-core

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
///
/// All of these are fatal: a session never retries a bad configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Configuration file exists but could not be read
    #[error("Failed to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON or has the wrong shape
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required key is absent (dotted path, e.g. `communication.baudrate`)
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// A key is present but its value is out of range
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
