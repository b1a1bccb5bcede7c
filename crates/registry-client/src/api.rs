//! Registry REST response envelope.
//!
//! Every registry endpoint answers with the same outer layout:
//!
//! ```text
//! {"code": 0, "error": "...", "data": {...}}
//! ```
//!
//! A non-zero `code` signals an application-level failure even when the
//! HTTP status is 2xx.

use registry_core::EntityKind;
use serde::Deserialize;
use serde_json::Value;

use crate::error::RegistryError;
use crate::transport::RawResponse;

/// Message used when the server reports a failure without explaining it.
pub const UNSPECIFIED_ERROR: &str = "got error but no error set";

/// Outer layout of every registry response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    /// Application status; zero means success. Missing counts as failure.
    #[serde(default = "missing_code")]
    pub code: i64,

    /// Server-supplied error, usually a string.
    #[serde(default)]
    pub error: Value,

    /// Payload.
    #[serde(default)]
    pub data: Value,
}

const fn missing_code() -> i64 {
    1
}

impl ApiResponse {
    /// Validates a raw response and returns its `data` payload.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::HttpError`] for a non-2xx status,
    /// [`RegistryError::MalformedResponse`] for a body that is not a
    /// response envelope, and [`RegistryError::ServerError`] for a non-zero
    /// `code`.
    pub fn check(response: RawResponse) -> Result<Value, RegistryError> {
        if !response.is_success() {
            return Err(RegistryError::HttpError {
                status: response.status,
                message: response.body,
            });
        }

        let envelope: Self =
            serde_json::from_str(&response.body).map_err(|e| RegistryError::MalformedResponse {
                message: e.to_string(),
            })?;

        if envelope.code != 0 {
            return Err(RegistryError::ServerError {
                code: envelope.code,
                message: envelope.error_message(),
            });
        }

        Ok(envelope.data)
    }

    /// Server error rendered as text.
    #[must_use]
    pub fn error_message(&self) -> String {
        match &self.error {
            Value::Null => UNSPECIFIED_ERROR.to_string(),
            Value::String(s) if s.is_empty() => UNSPECIFIED_ERROR.to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Extracts the id assigned by an insert.
///
/// # Errors
///
/// Returns [`RegistryError::MalformedResponse`] if `data.id` is missing.
pub fn inserted_id(data: &Value) -> Result<String, RegistryError> {
    match data.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(RegistryError::MalformedResponse {
            message: "insert response carries no id".to_string(),
        }),
    }
}

/// Extracts the raw record list of a query response.
///
/// A missing or `null` list is an empty result.
///
/// # Errors
///
/// Returns [`RegistryError::MalformedResponse`] if the list has another type.
pub fn records(data: &Value, kind: EntityKind) -> Result<&[Value], RegistryError> {
    match data.get(kind.collection()) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(RegistryError::MalformedResponse {
            message: format!("'{}' is not a list: {other}", kind.collection()),
        }),
    }
}
