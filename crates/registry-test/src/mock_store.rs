//! In-memory blob store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use registry_client::{BlobStore, RegistryError};
use registry_core::{ObjectLocation, ObjectProvider};

/// Endpoint recorded in locations produced by [`MemoryBlobStore`].
pub const MEMORY_ENDPOINT: &str = "memory://blobs";

#[derive(Debug, Default)]
struct StoreState {
    objects: HashMap<String, Vec<u8>>,
    uploaded: Vec<PathBuf>,
}

/// Blob store keeping uploaded files in memory and counting uploads.
///
/// Only regular files can be uploaded.
///
/// # Examples
///
/// ```rust
/// use registry_core::ObjectProvider;
/// use registry_test::MemoryBlobStore;
///
/// let store = MemoryBlobStore::new("bucket").with_provider(ObjectProvider::Oss);
/// assert_eq!(store.upload_count(), 0);
/// ```
#[derive(Debug)]
pub struct MemoryBlobStore {
    bucket: String,
    provider: ObjectProvider,
    state: Mutex<StoreState>,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new("test-bucket")
    }
}

impl MemoryBlobStore {
    /// Creates an empty store for `bucket`.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            provider: ObjectProvider::S3,
            state: Mutex::default(),
        }
    }

    /// Sets the provider tag of produced references.
    #[must_use]
    pub const fn with_provider(mut self, provider: ObjectProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Number of uploads performed.
    #[must_use]
    pub fn upload_count(&self) -> usize {
        self.state.lock().uploaded.len()
    }

    /// Paths uploaded, in order.
    #[must_use]
    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.state.lock().uploaded.clone()
    }

    /// Puts an object directly, bypassing upload.
    pub fn put(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> ObjectLocation {
        let key = key.into();
        self.state.lock().objects.insert(key.clone(), bytes.into());
        ObjectLocation::new(MEMORY_ENDPOINT, &self.bucket, key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn provider(&self) -> ObjectProvider {
        self.provider
    }

    async fn upload(&self, path: &Path) -> Result<ObjectLocation, RegistryError> {
        let bytes = std::fs::read(path).map_err(|e| RegistryError::UploadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let file_name = path
            .file_name()
            .map_or_else(|| "blob".to_string(), |n| n.to_string_lossy().into_owned());

        let mut state = self.state.lock();
        state.uploaded.push(path.to_path_buf());
        let key = format!("{}/{file_name}", state.uploaded.len());
        state.objects.insert(key.clone(), bytes);
        Ok(ObjectLocation::new(MEMORY_ENDPOINT, &self.bucket, key))
    }

    async fn download(&self, location: &ObjectLocation, dest: &Path) -> Result<(), RegistryError> {
        let bytes = self
            .state
            .lock()
            .objects
            .get(&location.key)
            .cloned()
            .ok_or_else(|| RegistryError::DownloadFailed {
                reference: format!("{}/{}", location.bucket, location.key),
                message: "object not found".to_string(),
            })?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
        }
        std::fs::write(dest, bytes).map_err(|e| RegistryError::io(dest, e))
    }
}
