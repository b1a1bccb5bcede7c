//! Envelope codec for reference-bearing fields.
//!
//! A reference-bearing field holds nothing, a single [`Reference`], a keyed
//! map of references or an ordered list of them. The shape is part of the
//! value and survives a round trip:
//!
//! | In memory                  | Wire                                  |
//! |----------------------------|---------------------------------------|
//! | `None`                     | `null`                                |
//! | `Single(r)`                | `envelope(r)`                         |
//! | `Map({k: r})`              | `{"dict": {k: envelope(r)}}`          |
//! | `List([r])`                | `{"list": [envelope(r)]}`             |

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{CodecError, Result};
use crate::reference::{tag, Reference};

/// The value of a reference-bearing field.
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceSet {
    /// One reference.
    Single(Reference),
    /// References addressed by key.
    Map(BTreeMap<String, Reference>),
    /// References in order.
    List(Vec<Reference>),
}

impl ReferenceSet {
    /// Builds a keyed set.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_core::{Reference, ReferenceSet};
    ///
    /// let set = ReferenceSet::map([
    ///     ("train.csv", Reference::local("train.csv")),
    ///     ("test.csv", Reference::local("test.csv")),
    /// ]);
    /// assert_eq!(set.len(), 2);
    /// ```
    #[must_use]
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Reference)>,
    {
        Self::Map(entries.into_iter().map(|(k, r)| (k.into(), r)).collect())
    }

    /// Builds an ordered set.
    #[must_use]
    pub fn list<I>(references: I) -> Self
    where
        I: IntoIterator<Item = Reference>,
    {
        Self::List(references.into_iter().collect())
    }

    /// Number of references held.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Map(map) => map.len(),
            Self::List(list) => list.len(),
        }
    }

    /// Returns true for an empty map or list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// References held, in key or list order.
    #[must_use]
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            Self::Single(reference) => vec![reference],
            Self::Map(map) => map.values().collect(),
            Self::List(list) => list.iter().collect(),
        }
    }

    /// Mutable access to every reference held.
    pub fn references_mut(&mut self) -> Vec<&mut Reference> {
        match self {
            Self::Single(reference) => vec![reference],
            Self::Map(map) => map.values_mut().collect(),
            Self::List(list) => list.iter_mut().collect(),
        }
    }
}

impl From<Reference> for ReferenceSet {
    fn from(reference: Reference) -> Self {
        Self::Single(reference)
    }
}

impl From<Vec<Reference>> for ReferenceSet {
    fn from(references: Vec<Reference>) -> Self {
        Self::List(references)
    }
}

impl From<BTreeMap<String, Reference>> for ReferenceSet {
    fn from(references: BTreeMap<String, Reference>) -> Self {
        Self::Map(references)
    }
}

/// Which entity back-references a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPolicy {
    /// Artifact references only.
    Artifacts,
    /// Artifacts and dataset links.
    Datasets,
    /// Artifacts, model links and dataset links.
    Any,
}

impl LinkPolicy {
    /// Returns true if `reference` may be stored under this policy.
    #[must_use]
    pub const fn allows(self, reference: &Reference) -> bool {
        match (self, reference) {
            (Self::Artifacts, Reference::Model(_) | Reference::Dataset(_))
            | (Self::Datasets, Reference::Model(_)) => false,
            _ => true,
        }
    }
}

/// Returns true for the values the wire uses to mean "no value".
///
/// Older servers stringified nulls, so `""` and `"null"` count as absent
/// alongside `null` and `{}`.
#[must_use]
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == "null",
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Encodes a single reference for `field`, enforcing `policy`.
///
/// # Errors
///
/// Returns [`CodecError::Unsupported`] if the policy rejects the reference
/// kind, or [`CodecError::UnresolvedLocal`] for a pending local path.
pub fn encode_reference(field: &str, reference: &Reference, policy: LinkPolicy) -> Result<Value> {
    if !policy.allows(reference) {
        return Err(CodecError::Unsupported {
            field: field.to_string(),
            kind: reference.kind_name().to_string(),
        });
    }
    reference.encode(field)
}

/// Encodes a reference-bearing field.
///
/// # Errors
///
/// Fails if any contained reference cannot be encoded for `field`.
///
/// # Examples
///
/// ```
/// use registry_core::{encode_field, LinkPolicy, Reference, ReferenceSet};
/// use serde_json::json;
///
/// let source = ReferenceSet::map([("a", Reference::model("m1"))]);
/// let wire = encode_field("source", Some(&source), LinkPolicy::Any).unwrap();
/// assert_eq!(wire, json!({"dict": {"a": {"model": {"id": "m1"}}}}));
/// ```
pub fn encode_field(field: &str, value: Option<&ReferenceSet>, policy: LinkPolicy) -> Result<Value> {
    let Some(set) = value else {
        return Ok(Value::Null);
    };

    let wire = match set {
        ReferenceSet::Single(reference) => encode_reference(field, reference, policy)?,
        ReferenceSet::Map(map) => {
            let mut entries = Map::with_capacity(map.len());
            for (key, reference) in map {
                entries.insert(key.clone(), encode_reference(field, reference, policy)?);
            }
            wrap(tag::DICT, Value::Object(entries))
        }
        ReferenceSet::List(list) => {
            let items = list
                .iter()
                .map(|reference| encode_reference(field, reference, policy))
                .collect::<Result<Vec<_>>>()?;
            wrap(tag::LIST, Value::Array(items))
        }
    };
    Ok(wire)
}

/// Decodes a reference-bearing field.
///
/// Entries of a map or list that do not decode to a known reference are
/// dropped.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if a `dict`/`list` wrapper has the
/// wrong JSON type or a contained envelope is malformed.
pub fn decode_field(value: &Value) -> Result<Option<ReferenceSet>> {
    if is_absent(value) {
        return Ok(None);
    }

    if let Some(entries) = value.get(tag::DICT) {
        let Value::Object(entries) = entries else {
            return Err(wrong_wrapper(tag::DICT, "an object"));
        };
        let mut map = BTreeMap::new();
        for (key, envelope) in entries {
            match Reference::decode(envelope)? {
                Some(reference) => {
                    map.insert(key.clone(), reference);
                }
                None => tracing::debug!(key = %key, "Dropping unrecognized dict entry"),
            }
        }
        return Ok(Some(ReferenceSet::Map(map)));
    }

    if let Some(items) = value.get(tag::LIST) {
        let Value::Array(items) = items else {
            return Err(wrong_wrapper(tag::LIST, "an array"));
        };
        let mut list = Vec::with_capacity(items.len());
        for (index, envelope) in items.iter().enumerate() {
            match Reference::decode(envelope)? {
                Some(reference) => list.push(reference),
                None => tracing::debug!(index, "Dropping unrecognized list entry"),
            }
        }
        return Ok(Some(ReferenceSet::List(list)));
    }

    Ok(Reference::decode(value)?.map(ReferenceSet::Single))
}

/// Decodes a field that only ever holds one reference.
///
/// # Errors
///
/// Returns [`CodecError::Unsupported`] if the wire value is a `dict` or
/// `list` collection.
pub fn decode_single(field: &str, value: &Value) -> Result<Option<Reference>> {
    match decode_field(value)? {
        None => Ok(None),
        Some(ReferenceSet::Single(reference)) => Ok(Some(reference)),
        Some(ReferenceSet::Map(_)) => Err(collection_in_single(field, tag::DICT)),
        Some(ReferenceSet::List(_)) => Err(collection_in_single(field, tag::LIST)),
    }
}

fn wrap(tag: &str, body: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(tag.to_string(), body);
    Value::Object(map)
}

fn wrong_wrapper(tag: &str, expected: &str) -> CodecError {
    CodecError::Malformed {
        tag: tag.to_string(),
        reason: format!("expected {expected}"),
    }
}

fn collection_in_single(field: &str, tag: &str) -> CodecError {
    CodecError::Unsupported {
        field: field.to_string(),
        kind: tag.to_string(),
    }
}
