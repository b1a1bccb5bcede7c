//! Structured documents attached to models and datasets.

use serde_json::Value;

use crate::error::{CodecError, Result};
use crate::reference::Reference;

/// Value of a `parameters` or `spec` field.
///
/// Either the JSON document itself or a reference to where it is stored.
/// A document given as a local file is uploaded on insert and travels as an
/// object-store envelope afterwards.
///
/// Only `null` and the string `"null"` mean the field is unset; `{}` and `""`
/// are kept as inline content. An inline object whose single key is `http`,
/// `git`, `s3` or `oss` with a well-formed body is indistinguishable from a
/// stored envelope on the wire and decodes as [`Document::Stored`].
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    /// Document carried inline.
    Inline(Value),
    /// Document stored as an artifact.
    Stored(Reference),
}

impl Document {
    /// Creates a document that still has to be uploaded from `path`.
    #[must_use]
    pub fn local(path: impl Into<std::path::PathBuf>) -> Self {
        Self::Stored(Reference::local(path))
    }

    /// Returns the stored reference, if any.
    #[must_use]
    pub const fn reference(&self) -> Option<&Reference> {
        match self {
            Self::Stored(reference) => Some(reference),
            Self::Inline(_) => None,
        }
    }

    /// Mutable access to the stored reference, if any.
    pub fn reference_mut(&mut self) -> Option<&mut Reference> {
        match self {
            Self::Stored(reference) => Some(reference),
            Self::Inline(_) => None,
        }
    }

    pub(crate) fn encode(&self, field: &str) -> Result<Value> {
        match self {
            Self::Inline(value) => Ok(value.clone()),
            Self::Stored(reference) if reference.is_link() => Err(CodecError::Unsupported {
                field: field.to_string(),
                kind: reference.kind_name().to_string(),
            }),
            Self::Stored(reference) => reference.encode(field),
        }
    }

    /// Anything that is not a recognized artifact envelope is inline content.
    pub(crate) fn decode(value: &Value) -> Option<Self> {
        match value {
            Value::Null => return None,
            Value::String(s) if s == "null" => return None,
            _ => {}
        }
        match Reference::decode(value) {
            Ok(Some(reference)) if !reference.is_link() => Some(Self::Stored(reference)),
            _ => Some(Self::Inline(value.clone())),
        }
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self::Inline(value)
    }
}

pub(crate) fn encode_optional(field: &str, document: Option<&Document>) -> Result<Value> {
    document.map_or(Ok(Value::Null), |d| d.encode(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inline_passes_through() {
        let doc = Document::from(json!({"lr": 0.001, "epochs": 10}));
        assert_eq!(doc.encode("parameters").unwrap(), json!({"lr": 0.001, "epochs": 10}));
        assert_eq!(Document::decode(&json!({"lr": 0.001, "epochs": 10})), Some(doc));
    }

    #[test]
    fn test_stored_document_round_trip() {
        let doc = Document::Stored(Reference::http("http://x/params.json"));
        let wire = doc.encode("parameters").unwrap();
        assert_eq!(Document::decode(&wire), Some(doc));
    }

    #[test]
    fn test_local_document_must_be_uploaded() {
        assert!(Document::local("params.json").encode("parameters").is_err());
    }

    #[test]
    fn test_link_document_is_inline() {
        let wire = json!({"model": {"id": "m1"}});
        assert_eq!(Document::decode(&wire), Some(Document::Inline(wire.clone())));
    }

    #[test]
    fn test_absent_document() {
        assert_eq!(Document::decode(&json!("null")), None);
        assert_eq!(Document::decode(&Value::Null), None);
    }

    #[test]
    fn test_empty_inline_document_is_kept() {
        assert_eq!(Document::decode(&json!({})), Some(Document::Inline(json!({}))));
        assert_eq!(Document::decode(&json!("")), Some(Document::Inline(json!(""))));
    }

    #[test]
    fn test_inline_envelope_shape_decodes_as_stored() {
        let wire = json!({"http": {"url": "http://cfg"}});
        assert_eq!(
            Document::decode(&wire),
            Some(Document::Stored(Reference::http("http://cfg")))
        );
    }
}
