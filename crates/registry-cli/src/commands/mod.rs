//! CLI commands and argument parsing.

pub mod insert;
pub mod query;
pub mod refs;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use registry_client::{ClientConfig, FsBlobStore, FsStoreConfig, RegistryClient};
use registry_core::EntityKind;

/// Registry - artifact registry client for models, datasets, workflows and OPs
#[derive(Parser)]
#[command(name = "registry")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Register a record
    Insert(insert::InsertArgs),

    /// Query records
    Query(query::QueryArgs),

    /// Print version information
    Version,
}

/// Record kind selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Trained model
    Model,
    /// Dataset
    Dataset,
    /// Workflow
    Workflow,
    /// Single operation
    Op,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Model => Self::Model,
            KindArg::Dataset => Self::Dataset,
            KindArg::Workflow => Self::Workflow,
            KindArg::Op => Self::Op,
        }
    }
}

/// Connection options shared by every command.
#[derive(Args)]
pub struct RegistryArgs {
    /// Registry base URL (e.g., `<http://127.0.0.1:8080>`)
    #[arg(short, long, env = "REGISTRY_DOMAIN")]
    pub domain: String,

    /// Request timeout in seconds (no timeout when unset)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory-backed blob store for artifact uploads and downloads
    #[arg(long, env = "REGISTRY_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Directory downloaded artifacts are written to
    #[arg(long, env = "REGISTRY_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,
}

impl RegistryArgs {
    /// Builds a client from the connection options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or the blob store cannot be set up.
    pub fn client(&self) -> Result<RegistryClient> {
        let mut config = ClientConfig::new(&self.domain);
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(dir) = &self.download_dir {
            config = config.with_download_dir(dir);
        }

        let mut client = RegistryClient::new(config).context("Failed to create registry client")?;
        if let Some(dir) = &self.store_dir {
            let store = FsBlobStore::new(FsStoreConfig::new(dir))
                .with_context(|| format!("Failed to open blob store at {}", dir.display()))?;
            client = client.with_store(Arc::new(store));
        }
        Ok(client)
    }
}
