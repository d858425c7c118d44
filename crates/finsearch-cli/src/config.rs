//! Environment-driven configuration for the CLI.

use anyhow::{bail, Result};
use colored::Colorize;
use finsearch_search::{MirrorConfig, MirroredIndex};
use finsearch_vectors::{DistanceMetric, QdrantStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Connection and collection settings shared by every command.
pub struct StoreSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub dimension: usize,
    pub index_dir: PathBuf,
}

impl StoreSettings {
    /// Read Qdrant credentials from the environment.
    pub fn from_env(
        collection: String,
        dimension: usize,
        index_dir: Option<String>,
    ) -> Result<Self> {
        let Ok(url) = std::env::var("QDRANT_URL") else {
            bail!(
                "{} is not set. Export your Qdrant endpoint, e.g. {}",
                "QDRANT_URL".yellow(),
                "export QDRANT_URL=https://your-cluster.qdrant.tech".cyan()
            );
        };
        let api_key = std::env::var("QDRANT_API_KEY").ok();

        let index_dir = index_dir.map(PathBuf::from).unwrap_or_else(default_index_dir);

        Ok(Self { url, api_key, collection, dimension, index_dir })
    }

    /// Connect to the configured collection.
    pub async fn connect(&self) -> Result<Arc<QdrantStore>> {
        let store = QdrantStore::connect(
            &self.url,
            self.api_key.as_deref(),
            &self.collection,
            self.dimension,
            DistanceMetric::Cosine,
        )
        .await?;
        Ok(Arc::new(store))
    }

    /// Open the mirrored local index for the collection, rebuilding it if
    /// it is missing or stale.
    pub async fn open_mirror(&self) -> Result<MirroredIndex> {
        let store = self.connect().await?;
        let config = MirrorConfig::new(&self.collection, self.dimension)
            .with_index_dir(&self.index_dir);
        Ok(MirroredIndex::open(store, config).await?)
    }
}

fn default_index_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("finsearch")
}
