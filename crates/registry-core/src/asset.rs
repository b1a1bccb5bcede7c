//! Models and datasets.
//!
//! Both kinds share one record layout; they differ in their endpoint and in
//! which back-references `source` and `resources` accept. [`Asset`] is the
//! shared implementation, [`Model`] and [`Dataset`] are its two instances.

use std::fmt;
use std::marker::PhantomData;

use serde::Deserialize;
use serde_json::Value;

use crate::document::{encode_optional, Document};
use crate::entity::{invalid_record, label, Entity, EntityKind, Metadata};
use crate::envelope::{decode_field, decode_single, encode_field, encode_reference, LinkPolicy, ReferenceSet};
use crate::error::Result;
use crate::reference::Reference;

/// Marker trait distinguishing models from datasets.
pub trait AssetKind:
    Clone + Copy + Default + fmt::Debug + PartialEq + Send + Sync + 'static
{
    /// Registry kind.
    const KIND: EntityKind;
    /// Back-references accepted by `source` and `resources`.
    const LINKS: LinkPolicy;
}

/// Marker for [`Model`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModelKind;

impl AssetKind for ModelKind {
    const KIND: EntityKind = EntityKind::Model;
    const LINKS: LinkPolicy = LinkPolicy::Datasets;
}

/// Marker for [`Dataset`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetKind;

impl AssetKind for DatasetKind {
    const KIND: EntityKind = EntityKind::Dataset;
    const LINKS: LinkPolicy = LinkPolicy::Any;
}

/// A model registered in the registry.
pub type Model = Asset<ModelKind>;

/// A dataset registered in the registry.
pub type Dataset = Asset<DatasetKind>;

/// A stored artifact record with reference-bearing fields.
///
/// # Examples
///
/// ```
/// use registry_core::{Dataset, Entity, Reference, ReferenceSet};
///
/// let dataset = Dataset::new("qsar-benchmark", "bace", "v1.0.0")
///     .with_location(ReferenceSet::map([
///         ("train.csv", Reference::local("train.csv")),
///         ("test.csv", Reference::local("test.csv")),
///     ]))
///     .with_description("BACE split");
///
/// assert_eq!(dataset.to_string(), "<Dataset qsar-benchmark/bace:v1.0.0>");
/// assert!(dataset.missing_required().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Asset<K: AssetKind> {
    /// Shared metadata.
    pub meta: Metadata,

    /// Artifact size in bytes.
    pub size: Option<u64>,

    /// Where the artifact content lives. Required for insert.
    pub location: Option<ReferenceSet>,

    /// Code that produced the artifact.
    pub code: Option<Reference>,

    /// Inputs the artifact was derived from.
    pub source: Option<ReferenceSet>,

    /// Parameters used to produce the artifact.
    pub parameters: Option<Document>,

    /// Specification of the artifact.
    pub spec: Option<Document>,

    /// Related artifacts.
    pub resources: Option<ReferenceSet>,

    kind: PhantomData<K>,
}

/// Wire layout of an asset record. Unknown keys are ignored.
#[derive(Deserialize)]
struct AssetRecord {
    #[serde(flatten)]
    meta: Metadata,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    location: Value,
    #[serde(default)]
    code: Value,
    #[serde(default)]
    source: Value,
    #[serde(default)]
    parameters: Value,
    #[serde(default)]
    spec: Value,
    #[serde(default)]
    resources: Value,
}

impl<K: AssetKind> Asset<K> {
    /// Creates a record for `namespace/name:version` with no references.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self::from_metadata(Metadata::new(namespace, name, version))
    }

    /// Creates a record from existing metadata.
    #[must_use]
    pub fn from_metadata(meta: Metadata) -> Self {
        Self {
            meta,
            size: None,
            location: None,
            code: None,
            source: None,
            parameters: None,
            spec: None,
            resources: None,
            kind: PhantomData,
        }
    }

    /// Sets the artifact size.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets the location.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<ReferenceSet>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the code reference.
    #[must_use]
    pub fn with_code(mut self, code: Reference) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the source references.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<ReferenceSet>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the parameters document.
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl Into<Document>) -> Self {
        self.parameters = Some(parameters.into());
        self
    }

    /// Sets the spec document.
    #[must_use]
    pub fn with_spec(mut self, spec: impl Into<Document>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    /// Sets the related resources.
    #[must_use]
    pub fn with_resources(mut self, resources: impl Into<ReferenceSet>) -> Self {
        self.resources = Some(resources.into());
        self
    }
}

impl<K: AssetKind> fmt::Display for Asset<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        label(f, K::KIND, &self.meta)
    }
}

impl<K: AssetKind> Entity for Asset<K> {
    const KIND: EntityKind = K::KIND;

    fn metadata(&self) -> &Metadata {
        &self.meta
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    fn to_wire(&self) -> Result<Value> {
        let mut map = self.meta.to_wire_map()?;
        map.insert("size".to_string(), serde_json::to_value(self.size)?);
        map.insert(
            "location".to_string(),
            encode_field("location", self.location.as_ref(), LinkPolicy::Artifacts)?,
        );
        let code = match &self.code {
            Some(code) => encode_reference("code", code, LinkPolicy::Artifacts)?,
            None => Value::Null,
        };
        map.insert("code".to_string(), code);
        map.insert(
            "source".to_string(),
            encode_field("source", self.source.as_ref(), K::LINKS)?,
        );
        map.insert(
            "parameters".to_string(),
            encode_optional("parameters", self.parameters.as_ref())?,
        );
        map.insert("spec".to_string(), encode_optional("spec", self.spec.as_ref())?);
        map.insert(
            "resources".to_string(),
            encode_field("resources", self.resources.as_ref(), K::LINKS)?,
        );
        Ok(Value::Object(map))
    }

    fn from_wire(payload: &Value) -> Result<Self> {
        let record: AssetRecord =
            serde_json::from_value(payload.clone()).map_err(|e| invalid_record(K::KIND, &e))?;

        Ok(Self {
            meta: record.meta,
            size: record.size,
            location: decode_field(&record.location)?,
            code: decode_single("code", &record.code)?,
            source: decode_field(&record.source)?,
            parameters: Document::decode(&record.parameters),
            spec: Document::decode(&record.spec),
            resources: decode_field(&record.resources)?,
            kind: PhantomData,
        })
    }

    fn missing_required(&self) -> Option<&'static str> {
        self.location.is_none().then_some("location")
    }

    fn references(&self) -> Vec<(&'static str, &Reference)> {
        let mut refs = Vec::new();
        collect("location", self.location.as_ref(), &mut refs);
        if let Some(code) = &self.code {
            refs.push(("code", code));
        }
        collect("source", self.source.as_ref(), &mut refs);
        if let Some(reference) = self.parameters.as_ref().and_then(Document::reference) {
            refs.push(("parameters", reference));
        }
        if let Some(reference) = self.spec.as_ref().and_then(Document::reference) {
            refs.push(("spec", reference));
        }
        collect("resources", self.resources.as_ref(), &mut refs);
        refs
    }

    fn references_mut(&mut self) -> Vec<(&'static str, &mut Reference)> {
        let mut refs = Vec::new();
        collect_mut("location", self.location.as_mut(), &mut refs);
        if let Some(code) = &mut self.code {
            refs.push(("code", code));
        }
        collect_mut("source", self.source.as_mut(), &mut refs);
        if let Some(reference) = self.parameters.as_mut().and_then(Document::reference_mut) {
            refs.push(("parameters", reference));
        }
        if let Some(reference) = self.spec.as_mut().and_then(Document::reference_mut) {
            refs.push(("spec", reference));
        }
        collect_mut("resources", self.resources.as_mut(), &mut refs);
        refs
    }
}

fn collect<'a>(
    field: &'static str,
    set: Option<&'a ReferenceSet>,
    out: &mut Vec<(&'static str, &'a Reference)>,
) {
    if let Some(set) = set {
        out.extend(set.references().into_iter().map(|r| (field, r)));
    }
}

fn collect_mut<'a>(
    field: &'static str,
    set: Option<&'a mut ReferenceSet>,
    out: &mut Vec<(&'static str, &'a mut Reference)>,
) {
    if let Some(set) = set {
        out.extend(set.references_mut().into_iter().map(|r| (field, r)));
    }
}
