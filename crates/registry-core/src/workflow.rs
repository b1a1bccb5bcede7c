//! Workflows and operators.
//!
//! These records carry only scalar metadata and opaque JSON documents, so
//! their wire layout is plain serde.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{invalid_record, label, Entity, EntityKind, Metadata};
use crate::error::Result;

/// A workflow definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Shared metadata.
    #[serde(flatten)]
    pub meta: Metadata,

    /// Workflow code, as an opaque document.
    #[serde(default)]
    pub code: Option<Value>,

    /// Python package providing the workflow.
    #[serde(default)]
    pub python_package: Option<String>,

    /// Container image running the workflow.
    #[serde(default)]
    pub docker_image: Option<String>,
}

impl Workflow {
    /// Creates a workflow for `namespace/name:version`.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            meta: Metadata::new(namespace, name, version),
            ..Self::default()
        }
    }

    /// Sets the code document.
    #[must_use]
    pub fn with_code(mut self, code: Value) -> Self {
        self.code = Some(code);
        self
    }

    /// Sets the python package.
    #[must_use]
    pub fn with_python_package(mut self, package: impl Into<String>) -> Self {
        self.python_package = Some(package.into());
        self
    }

    /// Sets the docker image.
    #[must_use]
    pub fn with_docker_image(mut self, image: impl Into<String>) -> Self {
        self.docker_image = Some(image.into());
        self
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        label(f, EntityKind::Workflow, &self.meta)
    }
}

impl Entity for Workflow {
    const KIND: EntityKind = EntityKind::Workflow;

    fn metadata(&self) -> &Metadata {
        &self.meta
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    fn to_wire(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_wire(payload: &Value) -> Result<Self> {
        serde_json::from_value(payload.clone()).map_err(|e| invalid_record(Self::KIND, &e))
    }
}

/// A workflow operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Op {
    /// Shared metadata.
    #[serde(flatten)]
    pub meta: Metadata,

    /// Operator code, as an opaque document.
    #[serde(default)]
    pub code: Option<Value>,

    /// Python package providing the operator.
    #[serde(default)]
    pub python_package: Option<String>,

    /// Container image running the operator.
    #[serde(default)]
    pub docker_image: Option<String>,

    /// Input signature.
    #[serde(default)]
    pub inputs: Option<Value>,

    /// Output signature.
    #[serde(default)]
    pub outputs: Option<Value>,

    /// Execution settings.
    #[serde(default)]
    pub execute: Option<Value>,
}

impl Op {
    /// Creates an operator for `namespace/name:version`.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            meta: Metadata::new(namespace, name, version),
            ..Self::default()
        }
    }

    /// Sets the python package.
    #[must_use]
    pub fn with_python_package(mut self, package: impl Into<String>) -> Self {
        self.python_package = Some(package.into());
        self
    }

    /// Sets the docker image.
    #[must_use]
    pub fn with_docker_image(mut self, image: impl Into<String>) -> Self {
        self.docker_image = Some(image.into());
        self
    }

    /// Sets the input and output signatures.
    #[must_use]
    pub fn with_signature(mut self, inputs: Value, outputs: Value) -> Self {
        self.inputs = Some(inputs);
        self.outputs = Some(outputs);
        self
    }

    /// Sets the execution settings.
    #[must_use]
    pub fn with_execute(mut self, execute: Value) -> Self {
        self.execute = Some(execute);
        self
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        label(f, EntityKind::Op, &self.meta)
    }
}

impl Entity for Op {
    const KIND: EntityKind = EntityKind::Op;

    fn metadata(&self) -> &Metadata {
        &self.meta
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.meta
    }

    fn to_wire(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn from_wire(payload: &Value) -> Result<Self> {
        serde_json::from_value(payload.clone()).map_err(|e| invalid_record(Self::KIND, &e))
    }
}
