//! Insert command implementation.
//!
//! Builds a record from flags, uploads local artifacts through the blob
//! store and registers the record.

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::info;

use registry_client::RegistryClient;
use registry_core::{Asset, AssetKind, Entity, Metadata, Op, Workflow};

use super::refs::{parse_document, parse_label, parse_reference, parse_set};
use super::{KindArg, RegistryArgs};

/// Arguments for the insert command.
#[derive(Args)]
pub struct InsertArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Record kind
    #[arg(short, long, value_enum)]
    pub kind: KindArg,

    /// Namespace
    #[arg(short, long)]
    pub namespace: String,

    /// Record name
    #[arg(long)]
    pub name: String,

    /// Version string
    #[arg(short, long)]
    pub version: String,

    /// Artifact location, `[KEY=]URI` (repeatable; models and datasets)
    #[arg(long)]
    pub location: Vec<String>,

    /// Inputs the artifact was derived from, `[KEY=]URI` (repeatable)
    #[arg(long)]
    pub source: Vec<String>,

    /// Related artifacts, `[KEY=]URI` (repeatable)
    #[arg(long)]
    pub resources: Vec<String>,

    /// Code that produced the artifact, as a URI
    #[arg(long)]
    pub code: Option<String>,

    /// Parameters document, inline JSON or a path/URI (models and datasets)
    #[arg(long)]
    pub parameters: Option<String>,

    /// Spec document, inline JSON or a path/URI (models and datasets)
    #[arg(long)]
    pub spec: Option<String>,

    /// Docker image (workflows and OPs)
    #[arg(long)]
    pub docker_image: Option<String>,

    /// Python package (workflows and OPs)
    #[arg(long)]
    pub python_package: Option<String>,

    /// Short description
    #[arg(long)]
    pub description: Option<String>,

    /// Author
    #[arg(long)]
    pub author: Option<String>,

    /// Label, `KEY=VALUE` (repeatable)
    #[arg(long)]
    pub label: Vec<String>,
}

/// Runs the insert command.
///
/// # Errors
///
/// Returns an error if:
/// - A reference or label cannot be parsed
/// - A flag does not apply to the selected kind
/// - Uploading or registering the record fails
pub async fn execute(args: InsertArgs) -> Result<()> {
    let client = args.registry.client()?;
    let meta = metadata(&args)?;

    let id = match args.kind {
        KindArg::Model | KindArg::Dataset => {
            if args.docker_image.is_some() || args.python_package.is_some() {
                bail!("--docker-image and --python-package apply to workflows and OPs only");
            }
            if args.kind == KindArg::Model {
                insert_asset::<registry_core::ModelKind>(&client, &args, meta).await?
            } else {
                insert_asset::<registry_core::DatasetKind>(&client, &args, meta).await?
            }
        }
        KindArg::Workflow | KindArg::Op => {
            if !args.location.is_empty()
                || !args.source.is_empty()
                || !args.resources.is_empty()
                || args.code.is_some()
                || args.parameters.is_some()
                || args.spec.is_some()
            {
                bail!(
                    "--location, --source, --resources, --code, --parameters and --spec apply to models and datasets only"
                );
            }
            if args.kind == KindArg::Workflow {
                let mut workflow = Workflow {
                    meta,
                    python_package: args.python_package.clone(),
                    docker_image: args.docker_image.clone(),
                    ..Workflow::default()
                };
                insert(&client, &mut workflow).await?
            } else {
                let mut op = Op {
                    meta,
                    python_package: args.python_package.clone(),
                    docker_image: args.docker_image.clone(),
                    ..Op::default()
                };
                insert(&client, &mut op).await?
            }
        }
    };

    println!("{id}");
    Ok(())
}

fn metadata(args: &InsertArgs) -> Result<Metadata> {
    let mut meta = Metadata::new(&args.namespace, &args.name, &args.version);
    meta.description.clone_from(&args.description);
    meta.author.clone_from(&args.author);
    for label in &args.label {
        let (key, value) = parse_label(label)?;
        meta.labels.get_or_insert_with(Default::default).insert(key, value);
    }
    Ok(meta)
}

async fn insert_asset<K: AssetKind>(
    client: &RegistryClient,
    args: &InsertArgs,
    meta: Metadata,
) -> Result<String> {
    let mut asset = Asset::<K>::from_metadata(meta);
    asset.location = parse_set(&args.location).context("Invalid --location")?;
    asset.source = parse_set(&args.source).context("Invalid --source")?;
    asset.resources = parse_set(&args.resources).context("Invalid --resources")?;
    asset.code = args
        .code
        .as_deref()
        .map(parse_reference)
        .transpose()
        .context("Invalid --code")?;
    asset.parameters = args
        .parameters
        .as_deref()
        .map(parse_document)
        .transpose()
        .context("Invalid --parameters")?;
    asset.spec = args
        .spec
        .as_deref()
        .map(parse_document)
        .transpose()
        .context("Invalid --spec")?;
    insert(client, &mut asset).await
}

async fn insert<E: Entity>(client: &RegistryClient, entity: &mut E) -> Result<String> {
    info!(entity = %entity, registry = %client.config().domain, "Inserting record");
    client
        .insert(entity)
        .await
        .with_context(|| format!("Failed to insert {entity}"))
}
