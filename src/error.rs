//! Error types for fmtd
//!
//! Crate-level operations return `FmtdResult<T>`. Resolution and formatting
//! failures have their own enums (`ResolutionError`, `FormatFailure`) because
//! the service hands them back to clients as data rather than aborting.

use crate::service::FailureKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fmtd operations
pub type FmtdResult<T> = Result<T, FmtdError>;

/// All errors that can surface from the CLI and daemon settings layer
#[derive(Error, Debug)]
pub enum FmtdError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Service errors
    #[error("{message}")]
    FormatFailed { kind: FailureKind, message: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FmtdError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::FormatFailed { kind, .. } => match kind {
                FailureKind::MalformedConfig => {
                    Some("Fix the config file or retry with --no-config")
                }
                FailureKind::UnsupportedInput => {
                    Some("Supported extensions: js, mjs, cjs, jsx, ts, mts, cts, tsx, css, scss, less, json")
                }
                FailureKind::FormatterUnavailable => {
                    Some("Relax `require_version` in the project config")
                }
                FailureKind::InvalidRequest => Some("Usage: fmtd format <FILE> [OPTIONS] < source"),
                _ => None,
            },
            Self::ConfigInvalid { .. } => Some("Run: fmtd config init --force"),
            _ => None,
        }
    }
}
