//! Blob storage for artifact content.
//!
//! Local paths attached to a record are uploaded through a [`BlobStore`]
//! before insert, and object-store references are fetched back through it.
//! [`FsBlobStore`] keeps objects under a local directory using
//! content-addressed keys:
//!
//! ```text
//! {root}/{bucket}/{sha256}/{file name}
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use registry_core::{ObjectLocation, ObjectProvider};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::RegistryError;

/// Default bucket for the filesystem store.
pub const DEFAULT_BUCKET: &str = "artifacts";

/// Storage backend for artifact content.
#[async_trait]
pub trait BlobStore: Send + Sync + fmt::Debug {
    /// Wire tag to use for references this store produces.
    fn provider(&self) -> ObjectProvider;

    /// Uploads a file or directory and returns where it landed.
    async fn upload(&self, path: &Path) -> Result<ObjectLocation, RegistryError>;

    /// Fetches an object into `dest`.
    async fn download(&self, location: &ObjectLocation, dest: &Path) -> Result<(), RegistryError>;
}

/// Configuration for [`FsBlobStore`].
#[derive(Debug, Clone)]
pub struct FsStoreConfig {
    /// Store root directory.
    pub root: PathBuf,

    /// Bucket name recorded in produced locations.
    pub bucket: String,

    /// Wire tag of produced references.
    pub provider: ObjectProvider,
}

impl FsStoreConfig {
    /// Creates a configuration rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            bucket: DEFAULT_BUCKET.to_string(),
            provider: ObjectProvider::S3,
        }
    }

    /// Sets the bucket name.
    #[must_use]
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Sets the provider tag.
    #[must_use]
    pub const fn with_provider(mut self, provider: ObjectProvider) -> Self {
        self.provider = provider;
        self
    }
}

/// Content-addressed object store on the local filesystem.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    config: FsStoreConfig,
}

impl FsBlobStore {
    /// Opens a store, creating the bucket directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket directory cannot be created.
    pub fn new(config: FsStoreConfig) -> Result<Self, RegistryError> {
        let bucket_dir = config.root.join(&config.bucket);
        fs::create_dir_all(&bucket_dir).map_err(|e| RegistryError::io(&bucket_dir, e))?;
        Ok(Self { config })
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &FsStoreConfig {
        &self.config
    }

    /// Endpoint recorded in produced locations.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("file://{}", self.config.root.display())
    }

    /// Filesystem path of an object.
    ///
    /// # Errors
    ///
    /// Rejects keys that would escape the bucket.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, RegistryError> {
        let bucket = if bucket.is_empty() {
            self.config.bucket.as_str()
        } else {
            bucket
        };
        let relative = Path::new(bucket).join(key);
        if key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(RegistryError::DownloadFailed {
                reference: format!("{bucket}/{key}"),
                message: "object key escapes the store".to_string(),
            });
        }
        Ok(self.config.root.join(relative))
    }

    fn upload_blocking(&self, path: &Path) -> Result<ObjectLocation, RegistryError> {
        let metadata = fs::metadata(path).map_err(|e| RegistryError::io(path, e))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RegistryError::UploadFailed {
                path: path.to_path_buf(),
                message: "path has no file name".to_string(),
            })?;

        let digest = if metadata.is_dir() {
            digest_dir(path)?
        } else {
            digest_file(path)?
        };
        let key = format!("{digest}/{file_name}");
        let target = self.object_path(&self.config.bucket, &key)?;

        if target.exists() {
            debug!(path = %path.display(), key = %key, "Object already stored");
        } else {
            store_object(path, &target, metadata.is_dir())?;
        }

        Ok(ObjectLocation::new(self.endpoint(), &self.config.bucket, key))
    }

    fn download_blocking(&self, location: &ObjectLocation, dest: &Path) -> Result<(), RegistryError> {
        let source = self.object_path(&location.bucket, &location.key)?;
        if source.is_dir() {
            copy_tree(&source, dest)
        } else if source.is_file() {
            copy_file(&source, dest)
        } else {
            Err(RegistryError::DownloadFailed {
                reference: format!("{}/{}", location.bucket, location.key),
                message: "object not found".to_string(),
            })
        }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn provider(&self) -> ObjectProvider {
        self.config.provider
    }

    async fn upload(&self, path: &Path) -> Result<ObjectLocation, RegistryError> {
        let store = self.clone();
        let owned = path.to_path_buf();
        let location = tokio::task::spawn_blocking(move || store.upload_blocking(&owned))
            .await
            .map_err(|e| RegistryError::UploadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })??;
        debug!(path = %path.display(), key = %location.key, "Uploaded artifact");
        Ok(location)
    }

    async fn download(&self, location: &ObjectLocation, dest: &Path) -> Result<(), RegistryError> {
        let store = self.clone();
        let owned_location = location.clone();
        let owned_dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || store.download_blocking(&owned_location, &owned_dest))
            .await
            .map_err(|e| RegistryError::DownloadFailed {
                reference: format!("{}/{}", location.bucket, location.key),
                message: e.to_string(),
            })?
    }
}

fn digest_file(path: &Path) -> Result<String, RegistryError> {
    let mut hasher = Sha256::new();
    let mut file = fs::File::open(path).map_err(|e| RegistryError::io(path, e))?;
    io::copy(&mut file, &mut hasher).map_err(|e| RegistryError::io(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Digest over relative paths and contents of every file in a tree.
fn digest_dir(root: &Path) -> Result<String, RegistryError> {
    let mut hasher = Sha256::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| walk_error(root, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        let mut file = fs::File::open(entry.path()).map_err(|e| RegistryError::io(entry.path(), e))?;
        io::copy(&mut file, &mut hasher).map_err(|e| RegistryError::io(entry.path(), e))?;
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Copies into a sibling staging path and renames it into place, so `target`
/// only ever exists complete.
fn store_object(from: &Path, target: &Path, is_dir: bool) -> Result<(), RegistryError> {
    let staging = staging_path(target);
    if staging.is_dir() {
        fs::remove_dir_all(&staging).map_err(|e| RegistryError::io(&staging, e))?;
    } else if staging.exists() {
        fs::remove_file(&staging).map_err(|e| RegistryError::io(&staging, e))?;
    }

    if is_dir {
        copy_tree(from, &staging)?;
    } else {
        copy_file(from, &staging)?;
    }
    fs::rename(&staging, target).map_err(|e| RegistryError::io(target, e))
}

fn staging_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    target.with_file_name(name)
}

fn copy_file(from: &Path, to: &Path) -> Result<(), RegistryError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| RegistryError::io(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| RegistryError::io(from, e))?;
    Ok(())
}

fn copy_tree(from: &Path, to: &Path) -> Result<(), RegistryError> {
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.map_err(|e| walk_error(from, e))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| RegistryError::io(&target, e))?;
        } else if entry.file_type().is_file() {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn walk_error(root: &Path, err: walkdir::Error) -> RegistryError {
    let path = err.path().unwrap_or(root).to_path_buf();
    RegistryError::io(path, err.into())
}
