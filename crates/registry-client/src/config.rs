//! Configuration types for the registry client.

use std::path::PathBuf;
use std::time::Duration;

use registry_core::EntityKind;

/// Default depth for following entity back-references.
pub const DEFAULT_MAX_LINK_DEPTH: usize = 8;

/// Configuration for the registry client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Registry base URL (e.g., "<http://registry.example.com>").
    pub domain: String,

    /// Request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,

    /// User agent string.
    pub user_agent: String,

    /// Root directory for downloaded artifacts.
    pub download_dir: PathBuf,

    /// How many levels of entity back-references a query follows.
    pub max_link_depth: usize,
}

impl ClientConfig {
    /// Creates a new client configuration for the given registry domain.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_client::ClientConfig;
    ///
    /// let config = ClientConfig::new("http://127.0.0.1:8080/");
    /// assert_eq!(config.domain, "http://127.0.0.1:8080");
    /// assert!(config.timeout.is_none());
    /// ```
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        let domain: String = domain.into();
        Self {
            domain: domain.trim_end_matches('/').to_string(),
            timeout: None,
            user_agent: format!("registry-client/{}", env!("CARGO_PKG_VERSION")),
            download_dir: default_download_dir(),
            max_link_depth: DEFAULT_MAX_LINK_DEPTH,
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the download directory.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Sets how deep back-references are followed.
    #[must_use]
    pub const fn with_max_link_depth(mut self, depth: usize) -> Self {
        self.max_link_depth = depth;
        self
    }

    /// Returns the REST endpoint for an entity kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_client::ClientConfig;
    /// use registry_core::EntityKind;
    ///
    /// let config = ClientConfig::new("http://127.0.0.1:8080");
    /// assert_eq!(config.endpoint(EntityKind::Dataset), "http://127.0.0.1:8080/api/v1/data");
    /// assert_eq!(config.endpoint(EntityKind::Op), "http://127.0.0.1:8080/api/v1/OP");
    /// ```
    #[must_use]
    pub fn endpoint(&self, kind: EntityKind) -> String {
        format!("{}/api/v1/{}", self.domain, kind.endpoint())
    }
}

/// Default download directory.
fn default_download_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("registry")
        .join("artifacts")
}
