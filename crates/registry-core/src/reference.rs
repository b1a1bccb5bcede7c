//! Artifact references and their tagged wire envelopes.
//!
//! A [`Reference`] points at artifact content stored outside the registry
//! (HTTP, Git, an object store), at a local path that still has to be
//! uploaded, or at another registry entity by id. On the wire every
//! reference is a single-key JSON object whose key names its kind:
//!
//! ```text
//! {"http": {"url": "https://example.com/weights.bin"}}
//! {"git":  {"repo": "https://github.com/org/repo", "revision": "main"}}
//! {"s3":   {"endpoint": "...", "bucket": "...", "key": "..."}}
//! {"model": {"id": "m1"}}
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::asset::{Dataset, Model};
use crate::error::{CodecError, Result};

/// Envelope discriminator keys.
pub mod tag {
    /// HTTP artifact.
    pub const HTTP: &str = "http";
    /// Git artifact.
    pub const GIT: &str = "git";
    /// S3-compatible object.
    pub const S3: &str = "s3";
    /// OSS-compatible object.
    pub const OSS: &str = "oss";
    /// Back-reference to a model.
    pub const MODEL: &str = "model";
    /// Back-reference to a dataset.
    pub const DATASET: &str = "dataset";
    /// Keyed collection wrapper.
    pub const DICT: &str = "dict";
    /// Ordered collection wrapper.
    pub const LIST: &str = "list";
}

/// Content reachable over plain HTTP(S).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HttpArtifact {
    /// Download URL.
    pub url: String,
}

/// A revision of a git repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GitArtifact {
    /// Repository URL.
    pub repo: String,
    /// Branch, tag or commit.
    pub revision: String,
}

/// Object store flavour. Both share one body layout and differ only by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectProvider {
    /// S3-compatible store.
    S3,
    /// OSS-compatible store.
    Oss,
}

impl ObjectProvider {
    /// Returns the envelope tag for this provider.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::S3 => tag::S3,
            Self::Oss => tag::OSS,
        }
    }
}

impl fmt::Display for ObjectProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Address of an object inside an object store.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLocation {
    /// Store endpoint.
    #[serde(default)]
    pub endpoint: String,

    /// Bucket name.
    #[serde(default)]
    pub bucket: String,

    /// Object key.
    pub key: String,

    /// Access key, when the object is not publicly readable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,

    /// Secret matching `access_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

impl ObjectLocation {
    /// Creates a location without credentials.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_core::ObjectLocation;
    ///
    /// let loc = ObjectLocation::new("https://oss.example.com", "artifacts", "qsar/train.csv");
    /// assert_eq!(loc.key, "qsar/train.csv");
    /// assert!(loc.access_key.is_none());
    /// ```
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            key: key.into(),
            access_key: None,
            secret_key: None,
        }
    }

    /// Attaches access credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }
}

impl fmt::Debug for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectLocation")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Back-reference to another registry entity.
///
/// Only the id travels on the wire. After a query the client fills in the
/// records the registry returned for that id.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityLink<E> {
    id: String,
    records: Vec<E>,
}

impl<E> EntityLink<E> {
    /// Creates an unresolved link to the entity with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            records: Vec::new(),
        }
    }

    /// Returns the linked entity id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the records hydrated for this link.
    #[must_use]
    pub fn records(&self) -> &[E] {
        &self.records
    }

    /// Returns the first hydrated record, if any.
    #[must_use]
    pub fn record(&self) -> Option<&E> {
        self.records.first()
    }

    /// Returns true once records have been attached.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.records.is_empty()
    }

    /// Attaches hydrated records.
    pub fn resolve(&mut self, records: Vec<E>) {
        self.records = records;
    }
}

/// A pointer to artifact content or to another registry entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// HTTP(S) download.
    Http(HttpArtifact),

    /// Git repository revision.
    Git(GitArtifact),

    /// Object in an S3- or OSS-compatible store.
    ObjectStore {
        /// Which wire tag to use.
        provider: ObjectProvider,
        /// Object address.
        location: ObjectLocation,
    },

    /// Local file or directory awaiting upload. Never serialized.
    Local(PathBuf),

    /// Back-reference to a model.
    Model(EntityLink<Model>),

    /// Back-reference to a dataset.
    Dataset(EntityLink<Dataset>),
}

impl Reference {
    /// Creates an HTTP reference.
    #[must_use]
    pub fn http(url: impl Into<String>) -> Self {
        Self::Http(HttpArtifact { url: url.into() })
    }

    /// Creates a git reference.
    #[must_use]
    pub fn git(repo: impl Into<String>, revision: impl Into<String>) -> Self {
        Self::Git(GitArtifact {
            repo: repo.into(),
            revision: revision.into(),
        })
    }

    /// Creates an S3 object reference.
    #[must_use]
    pub const fn s3(location: ObjectLocation) -> Self {
        Self::ObjectStore {
            provider: ObjectProvider::S3,
            location,
        }
    }

    /// Creates an OSS object reference.
    #[must_use]
    pub const fn oss(location: ObjectLocation) -> Self {
        Self::ObjectStore {
            provider: ObjectProvider::Oss,
            location,
        }
    }

    /// Creates a pending local reference.
    #[must_use]
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::Local(path.into())
    }

    /// Creates an unresolved link to a model.
    #[must_use]
    pub fn model(id: impl Into<String>) -> Self {
        Self::Model(EntityLink::new(id))
    }

    /// Creates an unresolved link to a dataset.
    #[must_use]
    pub fn dataset(id: impl Into<String>) -> Self {
        Self::Dataset(EntityLink::new(id))
    }

    /// Human-readable kind, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Http(_) => "http",
            Self::Git(_) => "git",
            Self::ObjectStore {
                provider: ObjectProvider::S3,
                ..
            } => "s3",
            Self::ObjectStore {
                provider: ObjectProvider::Oss,
                ..
            } => "oss",
            Self::Local(_) => "local path",
            Self::Model(_) => "model link",
            Self::Dataset(_) => "dataset link",
        }
    }

    /// Returns the pending path if this reference still needs an upload.
    #[must_use]
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            _ => None,
        }
    }

    /// Returns true for model and dataset back-references.
    #[must_use]
    pub const fn is_link(&self) -> bool {
        matches!(self, Self::Model(_) | Self::Dataset(_))
    }

    /// Encodes this reference as a tagged envelope.
    ///
    /// `field` names the record field being encoded and is only used for
    /// error reporting.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnresolvedLocal`] for a [`Reference::Local`].
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_core::Reference;
    /// use serde_json::json;
    ///
    /// let envelope = Reference::http("http://x/y").encode("location").unwrap();
    /// assert_eq!(envelope, json!({"http": {"url": "http://x/y"}}));
    /// ```
    pub fn encode(&self, field: &str) -> Result<Value> {
        let envelope = match self {
            Self::Http(artifact) => tagged(tag::HTTP, serde_json::to_value(artifact)?),
            Self::Git(artifact) => tagged(tag::GIT, serde_json::to_value(artifact)?),
            Self::ObjectStore { provider, location } => {
                tagged(provider.tag(), serde_json::to_value(location)?)
            }
            Self::Local(path) => {
                return Err(CodecError::UnresolvedLocal {
                    field: field.to_string(),
                    path: path.clone(),
                })
            }
            Self::Model(link) => tagged(tag::MODEL, link_body(link.id())),
            Self::Dataset(link) => tagged(tag::DATASET, link_body(link.id())),
        };
        Ok(envelope)
    }

    /// Decodes a tagged envelope.
    ///
    /// Values that are not objects, empty objects and objects without a
    /// known discriminator decode to `None`, so payloads from newer servers
    /// do not break older clients. Links decode unresolved.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] when a known tag carries a body that
    /// does not match its layout.
    pub fn decode(value: &Value) -> Result<Option<Self>> {
        let Value::Object(map) = value else {
            return Ok(None);
        };

        if let Some(body) = map.get(tag::HTTP) {
            return body_as(tag::HTTP, body).map(|a| Some(Self::Http(a)));
        }
        if let Some(body) = map.get(tag::GIT) {
            return body_as(tag::GIT, body).map(|a| Some(Self::Git(a)));
        }
        if let Some(body) = map.get(tag::S3) {
            return body_as(tag::S3, body).map(|l| Some(Self::s3(l)));
        }
        if let Some(body) = map.get(tag::OSS) {
            return body_as(tag::OSS, body).map(|l| Some(Self::oss(l)));
        }
        if let Some(body) = map.get(tag::MODEL) {
            return link_id(tag::MODEL, body).map(|id| Some(Self::model(id)));
        }
        if let Some(body) = map.get(tag::DATASET) {
            return link_id(tag::DATASET, body).map(|id| Some(Self::dataset(id)));
        }

        Ok(None)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(artifact) => f.write_str(&artifact.url),
            Self::Git(artifact) => write!(f, "git+{}#{}", artifact.repo, artifact.revision),
            Self::ObjectStore { provider, location } => {
                write!(f, "{provider}://{}/{}", location.bucket, location.key)
            }
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Model(link) => write!(f, "model:{}", link.id()),
            Self::Dataset(link) => write!(f, "dataset:{}", link.id()),
        }
    }
}

impl From<HttpArtifact> for Reference {
    fn from(artifact: HttpArtifact) -> Self {
        Self::Http(artifact)
    }
}

impl From<GitArtifact> for Reference {
    fn from(artifact: GitArtifact) -> Self {
        Self::Git(artifact)
    }
}

fn tagged(tag: &str, body: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(tag.to_string(), body);
    Value::Object(map)
}

fn link_body(id: &str) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert("id".to_string(), Value::String(id.to_string()));
    Value::Object(map)
}

fn body_as<T: DeserializeOwned>(tag: &str, body: &Value) -> Result<T> {
    serde_json::from_value(body.clone()).map_err(|e| CodecError::Malformed {
        tag: tag.to_string(),
        reason: e.to_string(),
    })
}

/// Reads a link id, accepting numeric ids from older servers.
fn link_id(tag: &str, body: &Value) -> Result<String> {
    match body.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(CodecError::Malformed {
            tag: tag.to_string(),
            reason: "missing id".to_string(),
        }),
    }
}
