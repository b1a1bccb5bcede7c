//! Sample records and registry seed files.
//!
//! A seed file lists raw records per collection, using the same collection
//! names the registry uses in query responses:
//!
//! ```yaml
//! models:
//!   - {namespace: qsar, name: bace-gnn, version: v1, id: m1}
//! data:
//!   - {namespace: qsar, name: bace, version: v1, id: d1}
//! ```

use std::fs;
use std::path::Path;

use registry_core::{
    Dataset, Entity, EntityKind, Model, ObjectLocation, Op, Reference, ReferenceSet, Workflow,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{Result, TestError};
use crate::mock_registry::MockRegistry;

/// Namespace used by the sample records.
pub const SAMPLE_NAMESPACE: &str = "qsar-benchmark";

/// A dataset with an HTTP location.
#[must_use]
pub fn sample_dataset() -> Dataset {
    Dataset::new(SAMPLE_NAMESPACE, "bace", "v1.0.0")
        .with_location(Reference::http("https://data.example.com/bace.csv"))
        .with_description("BACE classification split")
}

/// A model trained on the dataset with id `dataset_id`.
#[must_use]
pub fn sample_model(dataset_id: &str) -> Model {
    Model::new(SAMPLE_NAMESPACE, "bace-gnn", "v1.0.0")
        .with_location(Reference::s3(ObjectLocation::new(
            "https://s3.example.com",
            "models",
            "bace-gnn/v1.0.0/model.pt",
        )))
        .with_code(Reference::git("https://git.example.com/qsar/train.git", "a1b2c3"))
        .with_source(ReferenceSet::map([("train", Reference::dataset(dataset_id))]))
        .with_parameters(json!({"lr": 0.001, "epochs": 30}))
}

/// A workflow with inline code.
#[must_use]
pub fn sample_workflow() -> Workflow {
    Workflow::new(SAMPLE_NAMESPACE, "train-and-eval", "v1")
        .with_code(json!({"steps": ["split", "train", "evaluate"]}))
        .with_docker_image("registry.example.com/qsar/train:1.0")
}

/// An OP with a declared signature.
#[must_use]
pub fn sample_op() -> Op {
    Op::new(SAMPLE_NAMESPACE, "featurize", "v1")
        .with_python_package("qsar-ops==0.3.1")
        .with_signature(json!({"smiles": "str"}), json!({"fingerprint": "list[int]"}))
        .with_execute(json!({"entrypoint": "qsar_ops.featurize:main"}))
}

/// Raw records to load into a [`MockRegistry`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySeed {
    /// Model records.
    #[serde(default)]
    pub models: Vec<Value>,

    /// Dataset records.
    #[serde(default)]
    pub data: Vec<Value>,

    /// Workflow records.
    #[serde(default)]
    pub workflows: Vec<Value>,

    /// OP records.
    #[serde(default, rename = "OPs")]
    pub ops: Vec<Value>,
}

impl RegistrySeed {
    /// Creates an empty seed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an encoded record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be encoded.
    pub fn with_record<E: Entity>(mut self, record: &E) -> Result<Self> {
        let payload = record.to_wire().map_err(|e| TestError::FixtureParseError {
            message: e.to_string(),
        })?;
        self.records_mut(E::KIND).push(payload);
        Ok(self)
    }

    /// Number of records across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len() + self.data.len() + self.workflows.len() + self.ops.len()
    }

    /// Returns true if the seed holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads a seed from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads a seed from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read(path.as_ref())?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Stores every record in `registry`.
    pub fn apply(&self, registry: &MockRegistry) {
        for kind in EntityKind::ALL {
            for record in self.records(kind) {
                registry.seed(kind, record.clone());
            }
        }
    }

    fn records(&self, kind: EntityKind) -> &[Value] {
        match kind {
            EntityKind::Model => &self.models,
            EntityKind::Dataset => &self.data,
            EntityKind::Workflow => &self.workflows,
            EntityKind::Op => &self.ops,
        }
    }

    fn records_mut(&mut self, kind: EntityKind) -> &mut Vec<Value> {
        match kind {
            EntityKind::Model => &mut self.models,
            EntityKind::Dataset => &mut self.data,
            EntityKind::Workflow => &mut self.workflows,
            EntityKind::Op => &mut self.ops,
        }
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| TestError::FileReadError {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_samples_are_insertable() {
        assert!(sample_dataset().missing_required().is_none());
        assert!(sample_model("d1").missing_required().is_none());
        assert!(sample_model("d1").to_wire().is_ok());
        assert!(sample_workflow().to_wire().is_ok());
        assert!(sample_op().to_wire().is_ok());
    }

    #[test]
    fn test_seed_from_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seed.yaml");
        fs::write(
            &path,
            "models:\n  - {namespace: ns, name: m, version: v1, id: m1}\nOPs:\n  - {namespace: ns, name: o, version: v1}\n",
        )
        .unwrap();

        let seed = RegistrySeed::from_yaml_file(&path).unwrap();
        assert_eq!(seed.models.len(), 1);
        assert_eq!(seed.ops.len(), 1);
        assert_eq!(seed.len(), 2);

        let registry = MockRegistry::new();
        seed.apply(&registry);
        assert_eq!(registry.records(EntityKind::Op).len(), 1);
    }

    #[test]
    fn test_seed_from_json_with_records() {
        let seed = RegistrySeed::new()
            .with_record(&sample_workflow())
            .unwrap()
            .with_record(&sample_dataset())
            .unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seed.json");
        fs::write(&path, serde_json::to_string(&seed).unwrap()).unwrap();

        let loaded = RegistrySeed::from_json_file(&path).unwrap();
        assert_eq!(loaded.workflows.len(), 1);
        assert_eq!(loaded.data[0]["location"]["http"]["url"], "https://data.example.com/bace.csv");
    }

    #[test]
    fn test_seed_missing_file() {
        let err = RegistrySeed::from_json_file("/no/such/seed.json").unwrap_err();
        assert!(matches!(err, TestError::FileReadError { .. }));
    }
}
