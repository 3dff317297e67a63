//! Error types for the tanglit engine.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tangle operations.
#[derive(Error, Debug)]
pub enum TangleError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to open file ({}): {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Code block {name} not located in file {}", .path.display())]
    BlockNotFound { name: String, path: PathBuf },

    #[error("Maximum recursion level ({limit}) exceeded while expanding {name}")]
    RecursionLimitExceeded { name: String, limit: usize },

    #[error("codepause inside block {name} in file {}", .path.display())]
    PauseInsideBlock { name: String, path: PathBuf },

    #[error("Malformed {name} command: {reason}")]
    MalformedCommand { name: String, reason: String },
}

/// Result type alias for tangle operations.
pub type Result<T> = std::result::Result<T, TangleError>;
