//! Fetching referenced artifacts to the local filesystem.
//!
//! Files land under the configured download directory:
//! - HTTP → `{download_dir}/{host}/{url path}`
//! - Object store → `{download_dir}/{bucket}/{key}`
//!
//! Git references and entity links are not fetched.

use std::path::{Path, PathBuf};

use registry_core::{Entity, ObjectLocation, Reference};

use crate::client::RegistryClient;
use crate::error::RegistryError;

/// Outcome of downloading the references of one record.
#[derive(Debug, Default)]
pub struct DownloadReport {
    /// Files or directories written.
    pub downloaded: Vec<PathBuf>,

    /// References that were not fetched.
    pub skipped: Vec<String>,

    /// Failures, one per reference.
    pub failed: Vec<RegistryError>,
}

impl DownloadReport {
    /// Returns true if nothing failed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Destination of an HTTP download.
///
/// # Errors
///
/// Returns [`RegistryError::InvalidUrl`] for a URL without a host.
pub fn http_destination(root: &Path, url: &str) -> Result<PathBuf, RegistryError> {
    let parsed = url::Url::parse(url).map_err(|_| RegistryError::InvalidUrl {
        url: url.to_string(),
    })?;
    let host = parsed.host_str().ok_or_else(|| RegistryError::InvalidUrl {
        url: url.to_string(),
    })?;

    let mut dest = root.join(host);
    let mut segments = 0;
    for segment in parsed.path_segments().into_iter().flatten() {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        dest.push(segment);
        segments += 1;
    }
    if segments == 0 {
        dest.push("index");
    }
    Ok(dest)
}

/// Destination of an object-store download.
#[must_use]
pub fn object_destination(root: &Path, location: &ObjectLocation) -> PathBuf {
    let mut dest = root.to_path_buf();
    if !location.bucket.is_empty() {
        dest.push(&location.bucket);
    }
    for segment in location.key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            continue;
        }
        dest.push(segment);
    }
    dest
}

impl RegistryClient {
    /// Downloads every HTTP and object-store reference of `entity`.
    ///
    /// Failures are collected in the report rather than aborting the
    /// remaining downloads.
    pub async fn download<E: Entity>(&self, entity: &E) -> DownloadReport {
        let mut report = DownloadReport::default();
        let root = &self.config().download_dir;

        for (field, reference) in entity.references() {
            let outcome = match reference {
                Reference::Http(artifact) => self.download_http(root, &artifact.url).await,
                Reference::ObjectStore { location, .. } => {
                    self.download_object(root, reference, location).await
                }
                other => {
                    tracing::debug!(field, reference = %other, "Not downloadable");
                    report.skipped.push(other.to_string());
                    continue;
                }
            };

            match outcome {
                Ok(path) => {
                    tracing::debug!(field, path = %path.display(), "Downloaded artifact");
                    report.downloaded.push(path);
                }
                Err(e) => report.failed.push(e),
            }
        }

        tracing::info!(
            entity = %entity,
            downloaded = report.downloaded.len(),
            failed = report.failed.len(),
            "Download finished"
        );
        report
    }

    async fn download_http(&self, root: &Path, url: &str) -> Result<PathBuf, RegistryError> {
        let dest = http_destination(root, url)?;
        let bytes = self
            .transport()
            .fetch(url)
            .await
            .map_err(|e| RegistryError::DownloadFailed {
                reference: url.to_string(),
                message: e.to_string(),
            })?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RegistryError::io(parent, e))?;
        }
        tokio::fs::write(&dest, bytes)
            .await
            .map_err(|e| RegistryError::io(&dest, e))?;
        Ok(dest)
    }

    async fn download_object(
        &self,
        root: &Path,
        reference: &Reference,
        location: &ObjectLocation,
    ) -> Result<PathBuf, RegistryError> {
        let store = self.store().ok_or_else(|| RegistryError::DownloadFailed {
            reference: reference.to_string(),
            message: "no blob store configured".to_string(),
        })?;
        let dest = object_destination(root, location);
        store.download(location, &dest).await?;
        Ok(dest)
    }
}
