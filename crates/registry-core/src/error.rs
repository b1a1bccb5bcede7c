//! Error types for the reference codec and entity records.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`CodecError`] as the error type.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while converting references and entities to or from the wire.
#[derive(Error, Debug)]
pub enum CodecError {
    /// A local path reached the encoder before it was uploaded.
    #[error("Field '{field}' holds local path {} that has not been uploaded", path.display())]
    UnresolvedLocal {
        /// Field holding the reference.
        field: String,
        /// Local path awaiting upload.
        path: PathBuf,
    },

    /// A field holds a reference kind it does not accept.
    #[error("Field '{field}' does not support {kind} values")]
    Unsupported {
        /// Field holding the reference.
        field: String,
        /// Kind of the offending value.
        kind: String,
    },

    /// A recognized envelope tag carried an unusable body.
    #[error("Malformed '{tag}' envelope: {reason}")]
    Malformed {
        /// Envelope discriminator key.
        tag: String,
        /// Why the body could not be read.
        reason: String,
    },

    /// A wire record could not be turned into an entity.
    #[error("Invalid {entity} record: {reason}")]
    InvalidRecord {
        /// Entity kind being decoded.
        entity: String,
        /// Reason the record was rejected.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
