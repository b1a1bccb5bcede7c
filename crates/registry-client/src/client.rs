//! Registry client for inserting and querying records.
//!
//! This module provides the main client interface. Every operation is a
//! sequence of awaited round trips; nothing runs concurrently within one
//! call.

use std::sync::Arc;

use registry_core::Entity;

use crate::api::{self, ApiResponse};
use crate::config::ClientConfig;
use crate::error::RegistryError;
use crate::links::LinkContext;
use crate::query::Query;
use crate::resolve::LocalResolver;
use crate::store::BlobStore;
use crate::transport::{HttpTransport, RegistryTransport};

/// Client for a registry server.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    config: ClientConfig,
    transport: Arc<dyn RegistryTransport>,
    store: Option<Arc<dyn BlobStore>>,
}

impl RegistryClient {
    /// Creates a client talking HTTP to `config.domain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use registry_client::{ClientConfig, RegistryClient};
    ///
    /// let client = RegistryClient::new(ClientConfig::new("http://127.0.0.1:8080"))?;
    /// # Ok::<(), registry_client::RegistryError>(())
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self, RegistryError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client over an explicit transport.
    #[must_use]
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn RegistryTransport>) -> Self {
        Self {
            config,
            transport,
            store: None,
        }
    }

    /// Uploads local artifacts through `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &dyn RegistryTransport {
        self.transport.as_ref()
    }

    pub(crate) fn store(&self) -> Option<&dyn BlobStore> {
        self.store.as_deref()
    }

    /// Inserts a record and returns the id the registry assigned.
    ///
    /// Local-path references are uploaded first and replaced in `entity`
    /// by their object-store locations. On success the id is also written
    /// to `entity`.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::MissingField`] if a required field is unset. No
    ///   upload or request happens in that case.
    /// - Upload, transport, HTTP status or non-zero response code errors.
    pub async fn insert<E: Entity>(&self, entity: &mut E) -> Result<String, RegistryError> {
        if let Some(field) = entity.missing_required() {
            let err = RegistryError::MissingField {
                entity: entity.to_string(),
                field: field.to_string(),
            };
            tracing::warn!(error = %err, "Refusing insert");
            return Err(err);
        }

        let result = self.try_insert(entity).await;
        if let Err(e) = &result {
            tracing::warn!(entity = %entity, error = %e, "Insert failed");
        }
        result
    }

    async fn try_insert<E: Entity>(&self, entity: &mut E) -> Result<String, RegistryError> {
        let mut resolver = LocalResolver::new(self.store());
        resolver.resolve(entity).await?;

        let body = entity.to_wire()?;
        let url = self.config.endpoint(E::KIND);
        let response = self.transport.post_json(&url, &body).await?;
        let data = ApiResponse::check(response)?;
        let id = api::inserted_id(&data)?;

        entity.metadata_mut().id = Some(id.clone());
        tracing::info!(entity = %entity, id = %id, uploads = resolver.uploads(), "Inserted record");
        Ok(id)
    }

    /// Queries records of kind `E`.
    ///
    /// Malformed records are logged and skipped. Model and dataset
    /// back-references are followed and attached to the returned records.
    /// With [`Query::download`] set, referenced artifacts are fetched into
    /// the download directory afterwards; download failures are logged and
    /// do not fail the query.
    ///
    /// # Errors
    ///
    /// Transport, HTTP status, non-zero response code or malformed
    /// response errors for the top-level request.
    pub async fn query<E: Entity>(&self, query: &Query) -> Result<Vec<E>, RegistryError> {
        let mut records = self.fetch::<E>(query).await?;

        let mut links = LinkContext::new(self.config.max_link_depth);
        for record in &mut records {
            self.hydrate(record, &mut links, 0).await;
        }

        if query.download {
            for record in &records {
                let report = self.download(record).await;
                for failure in &report.failed {
                    tracing::warn!(entity = %record, error = %failure, "Download failed");
                }
            }
        }

        tracing::info!(kind = %E::KIND, count = records.len(), "Query complete");
        Ok(records)
    }

    /// Fetches the record with the given id.
    ///
    /// # Errors
    ///
    /// Same as [`RegistryClient::query`].
    pub async fn get<E: Entity>(&self, id: &str) -> Result<Option<E>, RegistryError> {
        Ok(self.query::<E>(&Query::by_id(id)).await?.into_iter().next())
    }

    /// One query round trip without link hydration.
    pub(crate) async fn fetch<E: Entity>(&self, query: &Query) -> Result<Vec<E>, RegistryError> {
        let url = self.config.endpoint(E::KIND);
        let response = self.transport.get_json(&url, &query.params()).await?;
        let data = ApiResponse::check(response)?;
        let raw = api::records(&data, E::KIND)?;

        let mut records = Vec::with_capacity(raw.len());
        for payload in raw {
            match E::from_wire(payload) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(kind = %E::KIND, error = %e, "Skipping malformed record"),
            }
        }
        tracing::debug!(kind = %E::KIND, fetched = records.len(), skipped = raw.len() - records.len(), "Fetched records");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::RawResponse;
    use async_trait::async_trait;
    use registry_core::{Dataset, Reference, Workflow};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Replays canned responses and records request URLs.
    #[derive(Debug, Default)]
    struct Canned {
        responses: Mutex<Vec<RawResponse>>,
        urls: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(bodies: Vec<Value>) -> Self {
            let responses = bodies
                .into_iter()
                .rev()
                .map(|b| RawResponse {
                    status: 200,
                    body: b.to_string(),
                })
                .collect();
            Self {
                responses: Mutex::new(responses),
                urls: Mutex::default(),
            }
        }

        fn next(&self, url: &str) -> Result<RawResponse, RegistryError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| RegistryError::MalformedResponse {
                    message: "no canned response".to_string(),
                })
        }
    }

    #[async_trait]
    impl RegistryTransport for Canned {
        async fn post_json(&self, url: &str, _body: &Value) -> Result<RawResponse, RegistryError> {
            self.next(url)
        }

        async fn get_json(
            &self,
            url: &str,
            _params: &[(&'static str, String)],
        ) -> Result<RawResponse, RegistryError> {
            self.next(url)
        }

        async fn fetch(&self, url: &str) -> Result<Vec<u8>, RegistryError> {
            self.next(url).map(|r| r.body.into_bytes())
        }
    }

    fn client(transport: Canned) -> (RegistryClient, Arc<Canned>) {
        let transport = Arc::new(transport);
        let client = RegistryClient::with_transport(ClientConfig::new("http://r"), transport.clone());
        (client, transport)
    }

    #[tokio::test]
    async fn test_insert_sets_id() {
        let (client, transport) = client(Canned::new(vec![json!({"code": 0, "data": {"id": "w1"}})]));
        let mut workflow = Workflow::new("ns", "wf", "v1");
        let id = client.insert(&mut workflow).await.unwrap();
        assert_eq!(id, "w1");
        assert_eq!(workflow.id(), Some("w1"));
        assert_eq!(transport.urls.lock().unwrap()[0], "http://r/api/v1/workflow");
    }

    #[tokio::test]
    async fn test_insert_without_location_makes_no_calls() {
        let (client, transport) = client(Canned::default());
        let mut dataset = Dataset::new("ns", "d", "v1");
        let err = client.insert(&mut dataset).await.unwrap_err();
        assert_eq!(err.to_string(), "location of <Dataset ns/d:v1> not provided");
        assert!(transport.urls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_local_without_store() {
        let (client, transport) = client(Canned::default());
        let mut dataset = Dataset::new("ns", "d", "v1").with_location(Reference::local("/tmp/a"));
        let err = client.insert(&mut dataset).await.unwrap_err();
        assert!(matches!(err, RegistryError::NoBlobStore { .. }));
        assert!(transport.urls.lock().unwrap().is_empty());
        assert!(dataset.id().is_none());
    }

    #[tokio::test]
    async fn test_query_skips_malformed() {
        let (client, _) = client(Canned::new(vec![json!({
            "code": 0,
            "data": {"workflows": [
                {"namespace": "ns", "name": "a", "version": "v1"},
                {"name": "missing-namespace"}
            ]}
        })]));
        let workflows: Vec<Workflow> = client.query(&Query::new()).await.unwrap();
        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].meta.name, "a");
    }

    #[tokio::test]
    async fn test_get_empty_result() {
        let (client, _) = client(Canned::new(vec![json!({"code": 0, "data": {"workflows": null}})]));
        let found: Option<Workflow> = client.get("nope").await.unwrap();
        assert!(found.is_none());
    }
}
