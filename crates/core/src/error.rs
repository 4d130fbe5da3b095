//! Error types for droid-release
//!
//! Centralized error handling using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type shared by the configuration and identifier layers
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid package identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },
}

/// Result type alias for droid-release core operations
pub type Result<T> = std::result::Result<T, ReleaseError>;
