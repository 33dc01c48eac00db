use anyhow::Context;
use clap::{Parser, Subcommand};
use coursedesk::storage::catalog::Catalog;
use coursedesk::{DeskConfig, EntityStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coursedesk", version, about = "Course administration entity API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the entity API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Snapshot file to restore from and persist to
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// List the entity kinds and their fields
    Kinds,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = DeskConfig::from_env().context("invalid COURSEDESK_* environment")?;

    match cli.command {
        Command::Serve { host, port, snapshot } => {
            if let Some(host) = host {
                config = config.host(&host);
            }
            if let Some(port) = port {
                config = config.port(port);
            }
            if let Some(snapshot) = snapshot {
                config = config.snapshot_path(snapshot);
            }

            let catalog = Catalog::builtin();
            let store = match &config.snapshot_path {
                Some(path) => EntityStore::open(path, &catalog)
                    .await
                    .with_context(|| format!("failed to open snapshot {}", path.display()))?,
                None => EntityStore::with_catalog(&catalog),
            };

            coursedesk::web::serve(&config, Arc::new(store))
                .await
                .context("API server stopped")?;
        }
        Command::Kinds => {
            let catalog = Catalog::builtin();
            for kind in catalog.list_kinds() {
                let schema = catalog.get_schema(kind)?;
                println!("{}", kind);
                for field in schema.fields() {
                    let required = if field.nullable { "" } else { " (required)" };
                    println!("  {}: {}{}", field.name, field.data_type, required);
                }
            }
        }
    }

    Ok(())
}
