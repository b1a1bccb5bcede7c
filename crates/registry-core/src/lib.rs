//! # Registry Core
//!
//! Records and wire codec for the artifact registry.
//!
//! The registry catalogs four kinds of versioned records, each identified by
//! a `(namespace, name, version)` triple:
//!
//! - [`Model`] and [`Dataset`] - artifacts whose `location`, `code`,
//!   `source` and `resources` fields hold [`Reference`]s
//! - [`Workflow`] and [`Op`] - definitions carrying scalar fields and opaque
//!   JSON documents
//!
//! A reference-bearing field holds a [`ReferenceSet`]: one reference, a keyed
//! map or an ordered list. The [`envelope`] module converts these to and from
//! their tagged JSON form, keeping the shape intact.
//!
//! ## Example
//!
//! ```rust
//! use registry_core::{Dataset, Entity, Reference, ReferenceSet};
//! use serde_json::json;
//!
//! let dataset = Dataset::new("ns", "n", "v1")
//!     .with_location(Reference::http("http://x/y"))
//!     .with_source(ReferenceSet::map([("a", Reference::model("m1"))]));
//!
//! let wire = dataset.to_wire().unwrap();
//! assert_eq!(wire["location"], json!({"http": {"url": "http://x/y"}}));
//! assert_eq!(wire["source"], json!({"dict": {"a": {"model": {"id": "m1"}}}}));
//!
//! let decoded = Dataset::from_wire(&wire).unwrap();
//! assert_eq!(decoded, dataset);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod asset;
pub mod document;
pub mod entity;
pub mod envelope;
pub mod error;
pub mod reference;
pub mod workflow;


pub use asset::{Asset, AssetKind, Dataset, DatasetKind, Model, ModelKind};
pub use document::Document;
pub use entity::{Entity, EntityKind, Metadata};
pub use envelope::{decode_field, decode_single, encode_field, is_absent, LinkPolicy, ReferenceSet};
pub use error::{CodecError, Result};
pub use reference::{
    EntityLink, GitArtifact, HttpArtifact, ObjectLocation, ObjectProvider, Reference,
};
pub use workflow::{Op, Workflow};
