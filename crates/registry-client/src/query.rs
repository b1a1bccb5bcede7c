//! Query filters.
//!
//! The registry filters on any combination of:
//! - `namespace` → exact or glob (`qsar-benchmark/*`)
//! - `name` → exact
//! - `version` → exact, or `latest` for the highest version per name
//! - `id` → exact

use std::fmt;

/// Version filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// Highest version of each matching name.
    Latest,

    /// Exact version string.
    Exact(String),
}

impl VersionSelector {
    /// Parses a version filter.
    ///
    /// Only the exact string `latest` selects the latest version; anything
    /// else is sent to the server unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use registry_client::VersionSelector;
    ///
    /// assert_eq!(VersionSelector::parse("latest"), VersionSelector::Latest);
    /// assert_eq!(
    ///     VersionSelector::parse("v1.0.0.2"),
    ///     VersionSelector::Exact("v1.0.0.2".to_string())
    /// );
    /// ```
    #[must_use]
    pub fn parse(input: &str) -> Self {
        if input == "latest" {
            Self::Latest
        } else {
            Self::Exact(input.to_string())
        }
    }

    /// Returns true if this selector asks for the latest version.
    #[must_use]
    pub const fn is_latest(&self) -> bool {
        matches!(self, Self::Latest)
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Exact(v) => f.write_str(v),
        }
    }
}

impl From<&str> for VersionSelector {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// A registry query.
///
/// # Examples
///
/// ```
/// use registry_client::Query;
///
/// let query = Query::new().namespace("test_*").version("latest");
/// assert_eq!(
///     query.params(),
///     vec![("namespace", "test_*".to_string()), ("version", "latest".to_string())]
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// Namespace filter, may contain `*`.
    pub namespace: Option<String>,

    /// Name filter.
    pub name: Option<String>,

    /// Version filter.
    pub version: Option<VersionSelector>,

    /// Id filter.
    pub id: Option<String>,

    /// Download referenced artifacts after the query.
    pub download: bool,
}

impl Query {
    /// Creates a query matching every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for a single id.
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().id(id)
    }

    /// Filters by namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Filters by name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Filters by version.
    #[must_use]
    pub fn version(mut self, version: impl Into<VersionSelector>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Filters by id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Downloads referenced artifacts of every returned record.
    #[must_use]
    pub const fn with_download(mut self) -> Self {
        self.download = true;
        self
    }

    /// Query string parameters, omitting unset filters.
    #[must_use]
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(4);
        if let Some(namespace) = &self.namespace {
            params.push(("namespace", namespace.clone()));
        }
        if let Some(name) = &self.name {
            params.push(("name", name.clone()));
        }
        if let Some(version) = &self.version {
            params.push(("version", version.to_string()));
        }
        if let Some(id) = &self.id {
            params.push(("id", id.clone()));
        }
        params
    }
}
