mod inspect;
mod snapshot;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "vitrine-cli")]
#[command(about = "Vitrine catalog command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch the live feed and write it out as a chunked snapshot
    Snapshot {
        /// Products per chunk
        #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
        chunk_size: u64,

        /// Write into this directory instead of `VITRINE_SNAPSHOT_DIR`
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Query products from the configured source
    Query {
        /// Case-insensitive substring over id, name, brand, and store
        #[arg(long)]
        query: Option<String>,

        #[arg(long)]
        store: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        brand: Option<String>,

        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show a single product by id
    Product { id: String },
    /// List the store, category, and brand filter values
    Filters,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("vitrine-cli ready; run with --help for commands");
        return Ok(());
    };

    let config = vitrine_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // stdout carries the JSON output.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Snapshot { chunk_size, dir } => {
            let chunk_size = usize::try_from(chunk_size)?;
            snapshot::run_snapshot(&config, chunk_size, dir).await
        }
        Commands::Query {
            query,
            store,
            category,
            brand,
            offset,
            limit,
        } => {
            let request = vitrine_core::ProductQuery {
                offset,
                limit,
                search_term: query.unwrap_or_default(),
                store: store.unwrap_or_default(),
                category: category.unwrap_or_default(),
                brand: brand.unwrap_or_default(),
            };
            inspect::run_query(&config, &request).await
        }
        Commands::Product { id } => inspect::run_product(&config, &id).await,
        Commands::Filters => inspect::run_filters(&config).await,
    }
}

/// Pretty-prints `value` as JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
