//! Replaces local-path references with uploaded object locations.

use std::collections::HashMap;
use std::path::PathBuf;

use registry_core::{Entity, Reference};
use tracing::debug;

use crate::error::RegistryError;
use crate::store::BlobStore;

/// Uploads pending local paths of a record, at most once per path.
#[derive(Debug)]
pub struct LocalResolver<'a> {
    store: Option<&'a dyn BlobStore>,
    uploaded: HashMap<PathBuf, Reference>,
    uploads: usize,
}

impl<'a> LocalResolver<'a> {
    /// Creates a resolver uploading through `store`.
    #[must_use]
    pub fn new(store: Option<&'a dyn BlobStore>) -> Self {
        Self {
            store,
            uploaded: HashMap::new(),
            uploads: 0,
        }
    }

    /// Number of uploads performed so far.
    #[must_use]
    pub const fn uploads(&self) -> usize {
        self.uploads
    }

    /// Rewrites every local reference of `entity` into an object-store
    /// reference. Records without local paths are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoBlobStore`] when a local path is pending
    /// and no store is configured, or the store's upload error.
    pub async fn resolve<E: Entity>(&mut self, entity: &mut E) -> Result<(), RegistryError> {
        for (field, slot) in entity.references_mut() {
            let Some(path) = slot.local_path().map(PathBuf::from) else {
                continue;
            };

            let resolved = if let Some(existing) = self.uploaded.get(&path) {
                existing.clone()
            } else {
                let store = self
                    .store
                    .ok_or_else(|| RegistryError::NoBlobStore { path: path.clone() })?;
                let location = store.upload(&path).await?;
                self.uploads += 1;
                let reference = Reference::ObjectStore {
                    provider: store.provider(),
                    location,
                };
                self.uploaded.insert(path.clone(), reference.clone());
                reference
            };

            debug!(field, path = %path.display(), "Resolved local artifact");
            *slot = resolved;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FsBlobStore, FsStoreConfig};
    use registry_core::{Dataset, ObjectProvider, ReferenceSet};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_same_path_uploaded_once() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("train.csv");
        std::fs::write(&file, "x").unwrap();
        let store = FsBlobStore::new(FsStoreConfig::new(dir.path().join("store"))).unwrap();

        let mut dataset = Dataset::new("ns", "d", "v1")
            .with_location(Reference::local(&file))
            .with_resources(ReferenceSet::map([("copy", Reference::local(&file))]));

        let mut resolver = LocalResolver::new(Some(&store));
        resolver.resolve(&mut dataset).await.unwrap();

        assert_eq!(resolver.uploads(), 1);
        for (_, reference) in dataset.references() {
            assert!(matches!(
                reference,
                Reference::ObjectStore { provider: ObjectProvider::S3, .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_missing_store() {
        let mut dataset = Dataset::new("ns", "d", "v1").with_location(Reference::local("/tmp/x"));
        let err = LocalResolver::new(None)
            .resolve(&mut dataset)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NoBlobStore { .. }));
    }

    #[tokio::test]
    async fn test_non_local_references_untouched() {
        let mut dataset =
            Dataset::new("ns", "d", "v1").with_location(Reference::http("https://x/y.csv"));
        let mut resolver = LocalResolver::new(None);
        resolver.resolve(&mut dataset).await.unwrap();
        assert_eq!(resolver.uploads(), 0);
        assert_eq!(
            dataset.references()[0].1,
            &Reference::http("https://x/y.csv")
        );
    }
}
