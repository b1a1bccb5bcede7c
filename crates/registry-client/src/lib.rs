//! # Registry Client
//!
//! Async client for inserting and querying model, dataset, workflow and OP
//! records in an artifact registry.
//!
//! ## Features
//!
//! - **Insert**: uploads local artifacts through a [`BlobStore`], then
//!   registers the record and returns its id
//! - **Query**: filters by namespace glob, name, version (or `latest`) and
//!   id, skipping malformed records
//! - **Link hydration**: model and dataset back-references are fetched once
//!   per query and attached to the returned records
//! - **Downloads**: HTTP and object-store artifacts are fetched into a
//!   local directory
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use registry_client::{ClientConfig, FsBlobStore, FsStoreConfig, Query, RegistryClient};
//! use registry_core::{Dataset, Reference};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = FsBlobStore::new(FsStoreConfig::new("/var/lib/registry/blobs"))?;
//!     let client = RegistryClient::new(ClientConfig::new("http://127.0.0.1:8080"))?
//!         .with_store(Arc::new(store));
//!
//!     let mut dataset = Dataset::new("qsar-benchmark", "bace", "v1.0.0")
//!         .with_location(Reference::local("bace.csv"));
//!     let id = client.insert(&mut dataset).await?;
//!
//!     let found: Vec<Dataset> = client.query(&Query::by_id(id)).await?;
//!     assert_eq!(found.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    RegistryClient                           │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │  Transport  │  │  BlobStore   │  │    LinkContext     │  │
//! │  │   (HTTP)    │  │ (artifacts)  │  │  (back-references) │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │         Registry server  /api/v1/{model,data,workflow,OP}   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod api;
mod client;
mod config;
mod download;
mod error;
mod links;
mod query;
mod resolve;
mod store;
mod transport;

pub use api::{ApiResponse, UNSPECIFIED_ERROR};
pub use client::RegistryClient;
pub use config::{ClientConfig, DEFAULT_MAX_LINK_DEPTH};
pub use download::{http_destination, object_destination, DownloadReport};
pub use error::RegistryError;
pub use query::{Query, VersionSelector};
pub use resolve::LocalResolver;
pub use store::{BlobStore, FsBlobStore, FsStoreConfig, DEFAULT_BUCKET};
pub use transport::{HttpTransport, RawResponse, RegistryTransport};
