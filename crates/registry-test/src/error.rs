//! Error types for test fixtures.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for fixture operations.
pub type Result<T> = std::result::Result<T, TestError>;

/// Errors that can occur while loading fixtures.
#[derive(Error, Debug)]
pub enum TestError {
    /// Failed to read a fixture file.
    #[error("Failed to read fixture file {path}: {source}")]
    FileReadError {
        /// Path to the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a fixture file.
    #[error("Failed to parse fixtures: {message}")]
    FixtureParseError {
        /// Error message.
        message: String,
    },
}

impl From<serde_json::Error> for TestError {
    fn from(err: serde_json::Error) -> Self {
        Self::FixtureParseError {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for TestError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::FixtureParseError {
            message: err.to_string(),
        }
    }
}
