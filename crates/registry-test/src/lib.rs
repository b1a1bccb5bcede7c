//! # Registry Test
//!
//! Test doubles for the registry client.
//!
//! This crate provides:
//!
//! - [`MockRegistry`], an in-memory registry server that records requests
//! - [`MemoryBlobStore`], an in-memory artifact store that counts uploads
//! - Sample records and seed files for populating the mock
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use registry_client::{ClientConfig, RegistryClient};
//! use registry_core::Dataset;
//! use registry_test::{sample_dataset, MockRegistry};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = Arc::new(MockRegistry::new());
//! registry.queue_id("d1");
//! let client = RegistryClient::with_transport(ClientConfig::new("http://mock"), registry.clone());
//!
//! let mut dataset = sample_dataset();
//! assert_eq!(client.insert(&mut dataset).await.unwrap(), "d1");
//!
//! let found: Option<Dataset> = client.get("d1").await.unwrap();
//! assert_eq!(found.unwrap().meta.name, "bace");
//! # }
//! ```

pub mod error;
pub mod fixtures;
pub mod mock_registry;
pub mod mock_store;

pub use error::{Result, TestError};
pub use fixtures::{
    sample_dataset, sample_model, sample_op, sample_workflow, RegistrySeed, SAMPLE_NAMESPACE,
};
pub use mock_registry::{MockRegistry, RecordedRequest, RequestMethod};
pub use mock_store::{MemoryBlobStore, MEMORY_ENDPOINT};
