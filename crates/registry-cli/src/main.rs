//! Registry CLI - command-line interface for the artifact registry.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing on stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "registry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Insert(args) => commands::insert::execute(args).await,
        Commands::Query(args) => commands::query::execute(args).await,
        Commands::Version => {
            println!("registry {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
