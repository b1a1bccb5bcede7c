//! Error types for registry operations.

use std::path::PathBuf;

use registry_core::CodecError;
use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A required field was not set before insert.
    #[error("{field} of {entity} not provided")]
    MissingField {
        /// Entity label, e.g. `<Dataset ns/n:v1>`.
        entity: String,
        /// Missing field.
        field: String,
    },

    /// Failed to connect to registry.
    #[error("Failed to connect to registry at {url}: {source}")]
    ConnectionFailed {
        /// Registry URL.
        url: String,
        /// Underlying error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP status outside the 2xx range.
    #[error("HTTP error from registry: {status} - {message}")]
    HttpError {
        /// HTTP status code.
        status: u16,
        /// Response body or transport message.
        message: String,
    },

    /// The registry answered with a non-zero application code.
    #[error("Registry rejected request (code {code}): {message}")]
    ServerError {
        /// Application code from the response body.
        code: i64,
        /// Server-supplied error message.
        message: String,
    },

    /// A record could not be encoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A local reference needs uploading but no blob store is configured.
    #[error("No blob store configured to upload {}", path.display())]
    NoBlobStore {
        /// Pending local path.
        path: PathBuf,
    },

    /// Upload to the blob store failed.
    #[error("Failed to upload {}: {message}", path.display())]
    UploadFailed {
        /// Local path being uploaded.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Fetching referenced content failed.
    #[error("Failed to download {reference}: {message}")]
    DownloadFailed {
        /// Reference being fetched.
        reference: String,
        /// Error message.
        message: String,
    },

    /// The response body did not have the expected layout.
    #[error("Malformed registry response: {message}")]
    MalformedResponse {
        /// Error message.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {source}")]
    JsonError {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error at {path}: {source}")]
    IoError {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid URL.
    #[error("Invalid URL: {url}")]
    InvalidUrl {
        /// URL string.
        url: String,
    },
}

impl RegistryError {
    /// Wraps an I/O error with the path it occurred at.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            Self::ConnectionFailed {
                url: err
                    .url()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string),
                source: err,
            }
        } else if err.is_status() {
            let status = err.status().map_or(0, |s| s.as_u16());
            Self::HttpError {
                status,
                message: err.to_string(),
            }
        } else {
            Self::HttpError {
                status: 0,
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError { source: err }
    }
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}
