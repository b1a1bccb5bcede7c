//! HTTP transport seam.
//!
//! [`RegistryClient`](crate::RegistryClient) talks to the registry only
//! through [`RegistryTransport`], so tests can substitute an in-memory
//! registry for the reqwest-backed [`HttpTransport`].

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::RegistryError;

/// Status and body of a registry response, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,

    /// Response body text.
    pub body: String,
}

impl RawResponse {
    /// Returns true for a 2xx status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Request/response plumbing used by the client.
#[async_trait]
pub trait RegistryTransport: Send + Sync + fmt::Debug {
    /// POSTs a JSON body.
    async fn post_json(&self, url: &str, body: &Value) -> Result<RawResponse, RegistryError>;

    /// GETs with query string parameters.
    async fn get_json(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<RawResponse, RegistryError>;

    /// Fetches raw content, failing on a non-2xx status.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RegistryError>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Builds the underlying HTTP client from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ClientConfig) -> Result<Self, RegistryError> {
        let mut builder = reqwest::Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let http = builder.build().map_err(|e| RegistryError::ConnectionFailed {
            url: config.domain.clone(),
            source: e,
        })?;

        Ok(Self { http })
    }

    async fn read(response: reqwest::Response) -> Result<RawResponse, RegistryError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl RegistryTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<RawResponse, RegistryError> {
        debug!(url = %url, "POST");
        let response = self.http.post(url).json(body).send().await?;
        Self::read(response).await
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<RawResponse, RegistryError> {
        debug!(url = %url, params = ?params, "GET");
        let response = self.http.get(url).query(params).send().await?;
        Self::read(response).await
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RegistryError> {
        debug!(url = %url, "Fetching content");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RegistryError::HttpError {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_response_success_range() {
        let ok = RawResponse {
            status: 204,
            body: String::new(),
        };
        let redirect = RawResponse {
            status: 302,
            body: String::new(),
        };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
    }

    #[test]
    fn test_http_transport_builds() {
        let config = ClientConfig::new("http://localhost:8080")
            .with_timeout(std::time::Duration::from_secs(1));
        assert!(HttpTransport::new(&config).is_ok());
    }
}
