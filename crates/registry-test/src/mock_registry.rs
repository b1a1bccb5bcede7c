//! In-memory registry server.
//!
//! [`MockRegistry`] implements [`RegistryTransport`] so a
//! [`RegistryClient`](registry_client::RegistryClient) can run against it
//! without a network. It stores inserted records, answers filtered queries
//! the way the real server does, and records every request for assertions.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use registry_client::{ClientConfig, RegistryClient};
//! use registry_core::EntityKind;
//! use registry_test::MockRegistry;
//!
//! let registry = Arc::new(MockRegistry::new());
//! registry.queue_id("abc123");
//! let _client = RegistryClient::with_transport(ClientConfig::new("http://mock"), registry.clone());
//! assert_eq!(registry.request_count(), 0);
//! assert!(registry.records(EntityKind::Model).is_empty());
//! ```

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use registry_client::{RawResponse, RegistryError, RegistryTransport};
use registry_core::EntityKind;
use serde_json::{json, Value};

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    /// Record insert.
    Post,
    /// Record query.
    Get,
    /// Artifact content fetch.
    Fetch,
}

/// A request received by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Request method.
    pub method: RequestMethod,
    /// Full URL.
    pub url: String,
    /// Entity kind addressed, if the URL is a registry endpoint.
    pub kind: Option<EntityKind>,
    /// JSON body of a POST.
    pub body: Option<Value>,
    /// Query string parameters of a GET.
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Default)]
struct State {
    collections: HashMap<EntityKind, Vec<Value>>,
    queued_ids: VecDeque<String>,
    next_id: u64,
    scripted: VecDeque<RawResponse>,
    content: HashMap<String, Vec<u8>>,
    requests: Vec<RecordedRequest>,
}

/// In-memory registry.
#[derive(Debug, Default)]
pub struct MockRegistry {
    state: Mutex<State>,
}

impl MockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next insert return `id`.
    pub fn queue_id(&self, id: impl Into<String>) {
        self.state.lock().queued_ids.push_back(id.into());
    }

    /// Adds a raw record to a collection as if it had been inserted.
    ///
    /// The payload is stored as given, so malformed records can be served.
    pub fn seed(&self, kind: EntityKind, record: Value) {
        self.state
            .lock()
            .collections
            .entry(kind)
            .or_default()
            .push(record);
    }

    /// Answers the next request with `response` instead of handling it.
    pub fn respond_next(&self, response: RawResponse) {
        self.state.lock().scripted.push_back(response);
    }

    /// Answers the next request with an HTTP error status.
    pub fn fail_next_http(&self, status: u16, body: impl Into<String>) {
        self.respond_next(RawResponse {
            status,
            body: body.into(),
        });
    }

    /// Answers the next request with a 200 carrying a non-zero code.
    pub fn fail_next_code(&self, code: i64, error: impl Into<String>) {
        self.respond_next(RawResponse {
            status: 200,
            body: json!({"code": code, "error": error.into()}).to_string(),
        });
    }

    /// Serves `bytes` for fetches of `url`.
    pub fn serve(&self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.state.lock().content.insert(url.into(), bytes.into());
    }

    /// Stored records of a kind.
    #[must_use]
    pub fn records(&self, kind: EntityKind) -> Vec<Value> {
        self.state
            .lock()
            .collections
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().requests.clone()
    }

    /// Number of requests received so far.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.state.lock().requests.len()
    }

    /// Requests with the given method and kind.
    #[must_use]
    pub fn requests_for(&self, method: RequestMethod, kind: EntityKind) -> Vec<RecordedRequest> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|r| r.method == method && r.kind == Some(kind))
            .cloned()
            .collect()
    }

    /// Body of the most recent POST.
    #[must_use]
    pub fn last_insert(&self) -> Option<Value> {
        self.state
            .lock()
            .requests
            .iter()
            .rev()
            .find(|r| r.method == RequestMethod::Post)
            .and_then(|r| r.body.clone())
    }

    fn record(&self, request: RecordedRequest) -> Option<RawResponse> {
        let mut state = self.state.lock();
        state.requests.push(request);
        state.scripted.pop_front()
    }
}

#[async_trait]
impl RegistryTransport for MockRegistry {
    async fn post_json(&self, url: &str, body: &Value) -> Result<RawResponse, RegistryError> {
        let kind = kind_of(url);
        if let Some(response) = self.record(RecordedRequest {
            method: RequestMethod::Post,
            url: url.to_string(),
            kind,
            body: Some(body.clone()),
            params: Vec::new(),
        }) {
            return Ok(response);
        }

        let Some(kind) = kind else {
            return Ok(not_found(url));
        };

        let mut state = self.state.lock();
        let id = match state.queued_ids.pop_front() {
            Some(id) => id,
            None => {
                state.next_id += 1;
                format!("{}-{}", kind.endpoint().to_lowercase(), state.next_id)
            }
        };

        let mut stored = body.clone();
        if let Value::Object(map) = &mut stored {
            map.insert("id".to_string(), Value::String(id.clone()));
        }
        state.collections.entry(kind).or_default().push(stored);
        tracing::debug!(kind = %kind, id = %id, "Mock registry stored record");

        Ok(ok(&json!({"id": id})))
    }

    async fn get_json(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<RawResponse, RegistryError> {
        let kind = kind_of(url);
        let params: Vec<(String, String)> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();
        if let Some(response) = self.record(RecordedRequest {
            method: RequestMethod::Get,
            url: url.to_string(),
            kind,
            body: None,
            params: params.clone(),
        }) {
            return Ok(response);
        }

        let Some(kind) = kind else {
            return Ok(not_found(url));
        };

        let state = self.state.lock();
        let records = state
            .collections
            .get(&kind)
            .map(|records| filter(records, &params))
            .unwrap_or_default();

        let mut data = serde_json::Map::new();
        data.insert(kind.collection().to_string(), Value::Array(records));
        Ok(ok(&Value::Object(data)))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RegistryError> {
        if let Some(response) = self.record(RecordedRequest {
            method: RequestMethod::Fetch,
            url: url.to_string(),
            kind: None,
            body: None,
            params: Vec::new(),
        }) {
            return if response.is_success() {
                Ok(response.body.into_bytes())
            } else {
                Err(RegistryError::HttpError {
                    status: response.status,
                    message: response.body,
                })
            };
        }

        self.state
            .lock()
            .content
            .get(url)
            .cloned()
            .ok_or_else(|| RegistryError::HttpError {
                status: 404,
                message: format!("{url} not found"),
            })
    }
}

fn ok(data: &Value) -> RawResponse {
    RawResponse {
        status: 200,
        body: json!({"code": 0, "data": data}).to_string(),
    }
}

fn not_found(url: &str) -> RawResponse {
    RawResponse {
        status: 404,
        body: format!("no route for {url}"),
    }
}

fn kind_of(url: &str) -> Option<EntityKind> {
    let path = url.split('?').next().unwrap_or(url);
    EntityKind::ALL
        .iter()
        .copied()
        .find(|kind| path.ends_with(&format!("/api/v1/{}", kind.endpoint())))
}

fn field(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn filter(records: &[Value], params: &[(String, String)]) -> Vec<Value> {
    let mut matched: Vec<&Value> = records
        .iter()
        .filter(|record| {
            params.iter().all(|(key, wanted)| match key.as_str() {
                "namespace" => field(record, "namespace").is_some_and(|ns| glob_match(wanted, &ns)),
                "version" if wanted == "latest" => true,
                "name" | "version" | "id" => field(record, key).as_deref() == Some(wanted.as_str()),
                _ => true,
            })
        })
        .collect();

    if params.iter().any(|(k, v)| k == "version" && v == "latest") {
        let mut best: Vec<&Value> = Vec::new();
        for record in matched {
            let key = (field(record, "namespace"), field(record, "name"));
            match best
                .iter_mut()
                .find(|b| (field(b, "namespace"), field(b, "name")) == key)
            {
                Some(current) => {
                    let newer = compare_versions(
                        &field(record, "version").unwrap_or_default(),
                        &field(current, "version").unwrap_or_default(),
                    ) == Ordering::Greater;
                    if newer {
                        *current = record;
                    }
                }
                None => best.push(record),
            }
        }
        matched = best;
    }

    matched.into_iter().cloned().collect()
}

/// Matches `*` wildcards against the whole input.
fn glob_match(pattern: &str, input: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == input;
    }

    let mut rest = input;
    for (i, part) in parts.iter().enumerate() {
        if i == 0 {
            let Some(stripped) = rest.strip_prefix(part) else {
                return false;
            };
            rest = stripped;
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else if let Some(pos) = rest.find(part) {
            rest = &rest[pos + part.len()..];
        } else {
            return false;
        }
    }
    true
}

/// Orders versions by their numeric dot-separated segments.
fn compare_versions(a: &str, b: &str) -> Ordering {
    let segments = |v: &str| -> Vec<u64> {
        v.trim_start_matches(['v', 'V'])
            .split('.')
            .map(|s| s.parse().unwrap_or(0))
            .collect()
    };
    segments(a).cmp(&segments(b)).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("test_*", "test_ns"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a*c*e", "abcde"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("test_*", "prod_ns"));
        assert!(!glob_match("*x", "abc"));
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("v1.10.0", "v1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("v1.0.0", "v1.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("v1.0", "v1.0.1"), Ordering::Less);
    }

    #[test]
    fn test_kind_of() {
        assert_eq!(kind_of("http://x/api/v1/OP"), Some(EntityKind::Op));
        assert_eq!(kind_of("http://x/api/v1/data?id=1"), Some(EntityKind::Dataset));
        assert_eq!(kind_of("http://x/other"), None);
    }

    #[test]
    fn test_filter_latest_per_name() {
        let records = vec![
            json!({"namespace": "ns", "name": "a", "version": "v1.0.0"}),
            json!({"namespace": "ns", "name": "a", "version": "v1.2.0"}),
            json!({"namespace": "ns", "name": "b", "version": "v0.1.0"}),
            json!({"namespace": "other", "name": "a", "version": "v9.0.0"}),
        ];
        let params = vec![
            ("namespace".to_string(), "n*".to_string()),
            ("version".to_string(), "latest".to_string()),
        ];
        let found = filter(&records, &params);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0]["version"], "v1.2.0");
        assert_eq!(found[1]["name"], "b");
    }

    #[tokio::test]
    async fn test_insert_assigns_ids() {
        let registry = MockRegistry::new();
        registry.queue_id("abc123");
        let first = registry
            .post_json("http://m/api/v1/model", &json!({"name": "a"}))
            .await
            .unwrap();
        let second = registry
            .post_json("http://m/api/v1/model", &json!({"name": "b"}))
            .await
            .unwrap();
        assert!(first.body.contains("abc123"));
        assert!(second.body.contains("model-1"));
        assert_eq!(registry.records(EntityKind::Model).len(), 2);
    }

    #[tokio::test]
    async fn test_scripted_response_wins() {
        let registry = MockRegistry::new();
        registry.fail_next_http(500, "boom");
        let response = registry.get_json("http://m/api/v1/workflow", &[]).await.unwrap();
        assert_eq!(response.status, 500);
        let response = registry.get_json("http://m/api/v1/workflow", &[]).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(registry.request_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_served_content() {
        let registry = MockRegistry::new();
        registry.serve("http://files/a.txt", "hello");
        assert_eq!(registry.fetch("http://files/a.txt").await.unwrap(), b"hello");
        assert!(registry.fetch("http://files/missing").await.is_err());
    }
}
