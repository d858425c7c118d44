//! Finsearch CLI - operator tooling for the species search engine.

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "finsearch")]
#[command(author, version, about = "Finsearch - fish identification and semantic search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Collection to operate on
    #[arg(long, global = true, default_value = "fish_descriptions")]
    collection: String,

    /// Vector dimension of the collection
    #[arg(long, global = true, default_value = "1024")]
    dimension: usize,

    /// Directory for the persisted index files (defaults to the local data dir)
    #[arg(long, global = true)]
    index_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-load a species dataset into the remote store
    Ingest {
        /// CSV file: name, full_description, then the embedding columns
        csv: String,

        /// Upsert batch size
        #[arg(short, long, default_value = "100")]
        batch_size: usize,
    },

    /// Search the collection by text description
    Search {
        /// Search query
        query: String,

        /// Maximum results to return
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Use a random query vector instead of encoding the query
        #[arg(long)]
        random: bool,
    },

    /// Rebuild the local index from the remote store
    Rebuild,

    /// Show remote/local counts and synchronization state
    Stats,

    /// Benchmark the local index against store-side search
    Bench {
        /// Number of query iterations
        #[arg(short, long, default_value = "5")]
        iterations: usize,

        /// Results per query
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt::init();
    }

    let settings = config::StoreSettings::from_env(
        cli.collection.clone(),
        cli.dimension,
        cli.index_dir.clone(),
    )?;

    match cli.command {
        Commands::Ingest { csv, batch_size } => {
            commands::ingest::run(&settings, &csv, batch_size).await
        }
        Commands::Search { query, top_k, random } => {
            commands::search::run(&settings, &query, top_k, random).await
        }
        Commands::Rebuild => commands::rebuild::run(&settings).await,
        Commands::Stats => commands::stats::run(&settings).await,
        Commands::Bench { iterations, top_k } => {
            commands::bench::run(&settings, iterations, top_k).await
        }
    }
}
