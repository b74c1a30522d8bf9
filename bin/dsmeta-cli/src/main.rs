//! dsmeta CLI - Dataset metadata command line interface
//!
//! Runs one dataset operation against the configured working directory and
//! prints the result as JSON.

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use dsmeta_common::{Config, DatasetRecord, SortDirection, SortField};
use dsmeta_store::{CreateOutcome, DatasetManager, SharedRegistry, UpdateOutcome};
use serde_json::json;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "dsmeta")]
#[command(about = "Dataset metadata store CLI")]
#[command(version)]
struct Args {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory for snapshot files
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Workspace (tenant) name; empty for the default workspace
    #[arg(long)]
    workspace: Option<String>,

    /// Log level
    #[arg(long, env = "DSMETA_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a dataset
    Create {
        /// Dataset name (trimmed and lowercased)
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Show a dataset by id
    Get {
        /// Dataset ID
        id: String,
    },
    /// Find a dataset by exact name
    Find {
        /// Dataset name (case-insensitive)
        name: String,
    },
    /// Search datasets whose name contains a keyword
    Search {
        /// Keyword (case-insensitive)
        keyword: String,
    },
    /// List datasets one page at a time
    List {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
        /// created_at, updated_at, name or id
        #[arg(long, default_value = "updated_at")]
        sort_field: String,
        /// asc or desc
        #[arg(long, default_value = "desc")]
        sort_direction: String,
    },
    /// Rename a dataset and replace its description
    Rename {
        /// Dataset ID
        id: String,
        /// New name
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Add a document to a dataset
    AddDoc {
        /// Dataset ID
        id: String,
        /// Document ID
        doc_id: String,
    },
    /// Remove a document from a dataset
    RemoveDoc {
        /// Dataset ID
        id: String,
        /// Document ID
        doc_id: String,
    },
    /// Delete a dataset
    Delete {
        /// Dataset ID
        id: String,
    },
    /// Remove every dataset in the workspace
    Drop,
}

fn dataset_json(id: &str, record: &DatasetRecord) -> serde_json::Value {
    json!({
        "id": id,
        "name": record.name,
        "description": record.description,
        "created_at": record.created_at,
        "updated_at": record.updated_at,
        "docs_count": record.docs_count(),
        "docs": record.docs,
    })
}

fn print(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(dir) = args.working_dir {
        config.storage.working_dir = dir;
    }
    if let Some(workspace) = args.workspace {
        config.storage.workspace = workspace;
    }
    debug!(
        "Using snapshot {}",
        config.storage.snapshot_path(&config.storage.namespace).display()
    );

    let registry = SharedRegistry::global();
    let manager = DatasetManager::open(&config, std::sync::Arc::clone(&registry))?;

    match args.command {
        Commands::Create { name, description } => {
            match manager.create_dataset(&name, description.as_deref()).await? {
                CreateOutcome::Created { id } => print(&json!({ "id": id }))?,
                CreateOutcome::Duplicated { name } => {
                    bail!("dataset '{name}' already exists")
                }
            }
        }
        Commands::Get { id } => {
            let Some(record) = manager.get_dataset(&id).await? else {
                bail!("dataset '{id}' not found");
            };
            print(&dataset_json(&id, &record))?;
        }
        Commands::Find { name } => {
            let Some((id, record)) = manager.find_dataset_by_name(&name).await? else {
                bail!("no dataset named '{name}'");
            };
            print(&dataset_json(&id, &record))?;
        }
        Commands::Search { keyword } => {
            let matches = manager.search_datasets_by_name(&keyword).await?;
            let datasets: Vec<_> = matches
                .iter()
                .map(|(id, record)| dataset_json(id, record))
                .collect();
            print(&json!(datasets))?;
        }
        Commands::List {
            page,
            page_size,
            sort_field,
            sort_direction,
        } => {
            let page_size = page_size.unwrap_or(config.pagination.default_page_size);
            let listing = manager
                .list_page(
                    page,
                    page_size,
                    SortField::parse_or_default(&sort_field),
                    SortDirection::parse_or_default(&sort_direction),
                )
                .await?;
            print(&serde_json::to_value(listing)?)?;
        }
        Commands::Rename {
            id,
            name,
            description,
        } => match manager
            .update_dataset(&id, &name, description.as_deref())
            .await?
        {
            UpdateOutcome::Updated => print(&json!({ "id": id, "status": "updated" }))?,
            UpdateOutcome::NotFound => bail!("dataset '{id}' not found"),
            UpdateOutcome::Duplicated { name } => bail!("dataset '{name}' already exists"),
        },
        Commands::AddDoc { id, doc_id } => {
            manager.add_doc_to_dataset(&id, &doc_id).await?;
            print(&json!({ "id": id, "doc_id": doc_id, "status": "added" }))?;
        }
        Commands::RemoveDoc { id, doc_id } => {
            manager.remove_doc_from_dataset(&id, &doc_id).await?;
            print(&json!({ "id": id, "doc_id": doc_id, "status": "removed" }))?;
        }
        Commands::Delete { id } => {
            manager.delete_dataset(&id).await?;
            print(&json!({ "id": id, "status": "deleted" }))?;
        }
        Commands::Drop => {
            let result = manager.drop_datasets().await;
            print(&serde_json::to_value(&result)?)?;
            if !result.is_success() {
                bail!("drop failed: {}", result.message);
            }
        }
    }

    registry.finalize();
    Ok(())
}
