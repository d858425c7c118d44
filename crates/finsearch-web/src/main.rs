//! Finsearch Web - HTTP boundary for the species search engine.

use anyhow::Result;
use clap::Parser;
use finsearch_search::SearchService;
use finsearch_web::factory::{
    qdrant_backend_from_env, CollectionSettings, StoreBackend, WebFactory,
};
use finsearch_web::{routes, AppState};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "finsearch-web")]
#[command(about = "Finsearch - fish identification and semantic search service")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, default_value = "5001")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Use in-memory stores instead of Qdrant (demo/development)
    #[arg(long)]
    in_memory: bool,

    /// Text collection name
    #[arg(long, default_value = "fish_descriptions")]
    text_collection: String,

    /// Text collection vector dimension
    #[arg(long, default_value = "1024")]
    text_dimension: usize,

    /// Image collection name
    #[arg(long, default_value = "fish_images")]
    image_collection: String,

    /// Image collection vector dimension
    #[arg(long, default_value = "512")]
    image_dimension: usize,

    /// Text embedding service URL (hash encoder when omitted)
    #[arg(long)]
    text_encoder_url: Option<String>,

    /// Text embedding model name
    #[arg(long, default_value = "qwen-embedding")]
    text_encoder_model: String,

    /// Image embedding service URL (hash encoder when omitted)
    #[arg(long)]
    image_encoder_url: Option<String>,

    /// Image embedding model name
    #[arg(long, default_value = "siamese-fish")]
    image_encoder_model: String,

    /// Directory for the persisted index files
    #[arg(long, default_value = ".finsearch")]
    index_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let addr = format!("{}:{}", cli.host, cli.port);

    // Missing Qdrant credentials must stop startup, not surface per request
    let backend = if cli.in_memory {
        StoreBackend::InMemory
    } else {
        qdrant_backend_from_env()?
    };

    let factory = WebFactory::new(
        backend,
        CollectionSettings {
            name: cli.text_collection,
            dimension: cli.text_dimension,
            encoder_url: cli.text_encoder_url,
            encoder_model: cli.text_encoder_model,
        },
        CollectionSettings {
            name: cli.image_collection,
            dimension: cli.image_dimension,
            encoder_url: cli.image_encoder_url,
            encoder_model: cli.image_encoder_model,
        },
        cli.index_dir.into(),
    );

    let state = AppState::new(SearchService::new(Arc::new(factory)));
    let app = routes::create_router(state);

    tracing::info!(%addr, "starting finsearch web server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
