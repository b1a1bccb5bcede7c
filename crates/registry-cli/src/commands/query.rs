//! Query command implementation.

use std::fmt::Write;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::Value;
use tracing::info;

use registry_client::{Query, RegistryClient};
use registry_core::{Dataset, Entity, Model, Op, Workflow};

use super::{KindArg, RegistryArgs};

/// Output format for query results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per record
    #[default]
    Text,
    /// JSON array of wire records
    Json,
    /// YAML list of wire records
    Yaml,
}

/// Arguments for the query command.
#[derive(Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub registry: RegistryArgs,

    /// Record kind
    #[arg(short, long, value_enum)]
    pub kind: KindArg,

    /// Namespace, may contain `*` (e.g., `qsar-*`)
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Record name
    #[arg(long)]
    pub name: Option<String>,

    /// Version, or `latest`
    #[arg(short, long)]
    pub version: Option<String>,

    /// Record id
    #[arg(long)]
    pub id: Option<String>,

    /// Download referenced artifacts
    #[arg(long)]
    pub download: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl QueryArgs {
    fn query(&self) -> Query {
        let mut query = Query::new();
        if let Some(namespace) = &self.namespace {
            query = query.namespace(namespace);
        }
        if let Some(name) = &self.name {
            query = query.name(name);
        }
        if let Some(version) = &self.version {
            query = query.version(version.as_str());
        }
        if let Some(id) = &self.id {
            query = query.id(id);
        }
        if self.download {
            query = query.with_download();
        }
        query
    }
}

/// Runs the query command.
///
/// # Errors
///
/// Returns an error if the registry request fails or the output cannot be
/// rendered.
pub async fn execute(args: QueryArgs) -> Result<()> {
    let client = args.registry.client()?;
    let query = args.query();

    let output = match args.kind {
        KindArg::Model => run::<Model>(&client, &query, args.format).await?,
        KindArg::Dataset => run::<Dataset>(&client, &query, args.format).await?,
        KindArg::Workflow => run::<Workflow>(&client, &query, args.format).await?,
        KindArg::Op => run::<Op>(&client, &query, args.format).await?,
    };

    print!("{output}");
    Ok(())
}

async fn run<E: Entity>(client: &RegistryClient, query: &Query, format: OutputFormat) -> Result<String> {
    let records: Vec<E> = client
        .query(query)
        .await
        .with_context(|| format!("Failed to query {}", E::KIND))?;
    info!(kind = %E::KIND, count = records.len(), "Query returned");
    render(&records, format)
}

/// Renders records in the requested format.
///
/// # Errors
///
/// Returns an error if a record cannot be serialized.
pub fn render<E: Entity>(records: &[E], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for record in records {
                writeln!(out, "{}\t{record}", record.id().unwrap_or("-"))?;
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string_pretty(&wire(records)?)?)),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(&wire(records)?)?),
    }
}

fn wire<E: Entity>(records: &[E]) -> Result<Value> {
    let values = records
        .iter()
        .map(Entity::to_wire)
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to encode records")?;
    Ok(Value::Array(values))
}
