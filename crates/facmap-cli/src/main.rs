mod ingest;
mod query;

use clap::{Parser, Subcommand};
use facmap_core::{FetchCacheMode, TagField};
use facmap_search::FacilityService;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "facmap-cli")]
#[command(about = "Facility ingestion and spatial search")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Selection arguments shared by `map` and `search`.
#[derive(Debug, Clone, PartialEq, clap::Args)]
pub(crate) struct SelectionArgs {
    /// Viewport as `swlat,swlng,nelat,nelng`
    #[arg(long, allow_hyphen_values = true)]
    bounds: String,
    /// Fuzzy name filter
    #[arg(long)]
    name: Option<String>,
    /// Required card (repeatable)
    #[arg(long = "card")]
    cards: Vec<String>,
    /// Required filter (repeatable)
    #[arg(long = "filter")]
    filters: Vec<String>,
    /// Required service type (repeatable)
    #[arg(long = "service-type")]
    service_types: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch every enabled provider, deduplicate, and replace the store
    Ingest {
        /// Run the full pipeline but leave the store untouched
        #[arg(long)]
        dry_run: bool,
        /// Raw response cache mode: off, read, write, auto
        #[arg(long)]
        cache: Option<FetchCacheMode>,
    },
    /// Map markers for a viewport
    Map {
        #[command(flatten)]
        selection: SelectionArgs,
    },
    /// One page of full records for a viewport, sorted by name
    Search {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: u32,
    },
    /// Name suggestions for free text
    Fuzzy { input: String },
    /// Every value used in one tag field
    Distinct {
        /// service-types, filters, or cards
        field: TagField,
    },
    /// One facility by id
    Show { id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = facmap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("facmap-cli ready; run with --help to list commands");
        return Ok(());
    };

    let store = facmap_db::open_store(&config).await?;
    let output = match command {
        Commands::Ingest { dry_run, cache } => {
            let mode = cache.unwrap_or(config.fetch_cache);
            ingest::run_ingest(&config, store.as_ref(), mode, dry_run).await?
        }
        command => {
            let service = FacilityService::new(store);
            run_query(&service, command).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run_query(service: &FacilityService, command: Commands) -> anyhow::Result<serde_json::Value> {
    match command {
        Commands::Map { selection } => query::run_map(service, &selection).await,
        Commands::Search { selection, page } => query::run_search(service, &selection, page).await,
        Commands::Fuzzy { input } => query::run_fuzzy(service, &input).await,
        Commands::Distinct { field } => query::run_distinct(service, field).await,
        Commands::Show { id } => query::run_show(service, &id).await,
        Commands::Ingest { .. } => anyhow::bail!("ingest is not a query command"),
    }
}

#[cfg(test)]
mod tests;
