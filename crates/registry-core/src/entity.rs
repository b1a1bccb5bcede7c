//! Entity kinds, shared metadata and the [`Entity`] trait.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{CodecError, Result};
use crate::reference::Reference;

/// The four kinds of records the registry stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Trained model.
    Model,
    /// Dataset.
    Dataset,
    /// Workflow definition.
    Workflow,
    /// Workflow operator.
    Op,
}

impl EntityKind {
    /// All kinds.
    pub const ALL: [Self; 4] = [Self::Model, Self::Dataset, Self::Workflow, Self::Op];

    /// Path segment under `/api/v1/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_core::EntityKind;
    ///
    /// assert_eq!(EntityKind::Dataset.endpoint(), "data");
    /// assert_eq!(EntityKind::Op.endpoint(), "OP");
    /// ```
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Dataset => "data",
            Self::Workflow => "workflow",
            Self::Op => "OP",
        }
    }

    /// Key of the record list inside a query response's `data` object.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Model => "models",
            Self::Dataset => "data",
            Self::Workflow => "workflows",
            Self::Op => "OPs",
        }
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Model => "Model",
            Self::Dataset => "Dataset",
            Self::Workflow => "Workflow",
            Self::Op => "OP",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fields every registry record carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Namespace; queries accept glob patterns such as `qsar-*`.
    pub namespace: String,

    /// Record name, unique within a namespace.
    pub name: String,

    /// Version string. `"latest"` is reserved as a query filter.
    pub version: String,

    /// Server-assigned id, absent until the first successful insert.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,

    /// Short description.
    #[serde(default)]
    pub description: Option<String>,

    /// Long-form description.
    #[serde(default)]
    pub readme: Option<String>,

    /// Author.
    #[serde(default)]
    pub author: Option<String>,

    /// Free-form labels.
    #[serde(default)]
    pub labels: Option<BTreeMap<String, String>>,

    /// Lifecycle status.
    #[serde(default)]
    pub status: Option<String>,
}

impl Metadata {
    /// Creates metadata for `namespace/name:version`.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub(crate) fn to_wire_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(CodecError::InvalidRecord {
                entity: "metadata".to_string(),
                reason: format!("serialized to {other}"),
            }),
        }
    }
}

/// Accepts ids sent either as strings or as numbers.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn label(f: &mut fmt::Formatter<'_>, kind: EntityKind, meta: &Metadata) -> fmt::Result {
    write!(f, "<{kind} {}/{}:{}>", meta.namespace, meta.name, meta.version)
}

/// A registry record that can be inserted and queried.
pub trait Entity: Clone + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Which endpoint and response collection this record uses.
    const KIND: EntityKind;

    /// Shared metadata.
    fn metadata(&self) -> &Metadata;

    /// Mutable shared metadata.
    fn metadata_mut(&mut self) -> &mut Metadata;

    /// Serializes the record into its wire payload.
    ///
    /// # Errors
    ///
    /// Fails if a reference-bearing field cannot be encoded, e.g. because it
    /// still holds a local path.
    fn to_wire(&self) -> Result<Value>;

    /// Rebuilds a record from a wire payload, ignoring unknown keys.
    ///
    /// # Errors
    ///
    /// Fails if required metadata is missing or a field is malformed.
    fn from_wire(payload: &Value) -> Result<Self>;

    /// Name of a field that must be set before insert but is not.
    fn missing_required(&self) -> Option<&'static str> {
        None
    }

    /// Every reference held by the record, with its field name.
    fn references(&self) -> Vec<(&'static str, &Reference)> {
        Vec::new()
    }

    /// Mutable access to every reference held by the record.
    fn references_mut(&mut self) -> Vec<(&'static str, &mut Reference)> {
        Vec::new()
    }

    /// Server-assigned id.
    fn id(&self) -> Option<&str> {
        self.metadata().id.as_deref()
    }

    /// Sets the description.
    #[must_use]
    fn with_description(mut self, description: impl Into<String>) -> Self {
        self.metadata_mut().description = Some(description.into());
        self
    }

    /// Sets the readme.
    #[must_use]
    fn with_readme(mut self, readme: impl Into<String>) -> Self {
        self.metadata_mut().readme = Some(readme.into());
        self
    }

    /// Sets the author.
    #[must_use]
    fn with_author(mut self, author: impl Into<String>) -> Self {
        self.metadata_mut().author = Some(author.into());
        self
    }

    /// Sets the status.
    #[must_use]
    fn with_status(mut self, status: impl Into<String>) -> Self {
        self.metadata_mut().status = Some(status.into());
        self
    }

    /// Adds a label.
    #[must_use]
    fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata_mut()
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

pub(crate) fn invalid_record(kind: EntityKind, err: &serde_json::Error) -> CodecError {
    CodecError::InvalidRecord {
        entity: kind.name().to_string(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_paths() {
        let endpoints: Vec<_> = EntityKind::ALL.iter().map(|k| k.endpoint()).collect();
        assert_eq!(endpoints, ["model", "data", "workflow", "OP"]);
        let collections: Vec<_> = EntityKind::ALL.iter().map(|k| k.collection()).collect();
        assert_eq!(collections, ["models", "data", "workflows", "OPs"]);
    }

    #[test]
    fn test_metadata_serializes_nulls() {
        let wire = Metadata::new("ns", "n", "v1").to_wire_map().unwrap();
        assert_eq!(wire["namespace"], "ns");
        assert_eq!(wire["id"], Value::Null);
        assert_eq!(wire["labels"], Value::Null);
    }

    #[test]
    fn test_metadata_numeric_id() {
        let meta: Metadata =
            serde_json::from_value(json!({"namespace": "ns", "name": "n", "version": "v", "id": 17}))
                .unwrap();
        assert_eq!(meta.id.as_deref(), Some("17"));
    }

    #[test]
    fn test_metadata_requires_name() {
        let result: std::result::Result<Metadata, _> =
            serde_json::from_value(json!({"namespace": "ns", "version": "v"}));
        assert!(result.is_err());
    }
}
