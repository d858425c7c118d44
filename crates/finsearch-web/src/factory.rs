//! Production service factory: Qdrant collections, optional API encoders.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use finsearch_embeddings::{
    ApiConfig, ApiEmbedder, ApiImageEncoder, Embedder, EmbeddingError, HashEmbedder,
    HashImageEncoder, ImageEncoder,
};
use finsearch_search::{MirrorConfig, SearchError, ServiceFactory};
use finsearch_vectors::{DistanceMetric, InMemoryStore, QdrantStore, VectorError, VectorStore};

/// Where the collections live.
#[derive(Debug, Clone)]
pub enum StoreBackend {
    /// Qdrant, the production source of truth.
    Qdrant { url: String, api_key: Option<String> },
    /// In-memory stores for demos and development without a Qdrant.
    InMemory,
}

/// Settings for one collection.
#[derive(Debug, Clone)]
pub struct CollectionSettings {
    pub name: String,
    pub dimension: usize,
    /// Embedding-service endpoint; hash encoders are used when absent.
    pub encoder_url: Option<String>,
    pub encoder_model: String,
}

/// Factory wiring the service to its production collaborators.
pub struct WebFactory {
    backend: StoreBackend,
    text: CollectionSettings,
    image: CollectionSettings,
    index_dir: PathBuf,
    /// Dev-mode stores are shared across initializations so ingested data
    /// survives a re-initialize.
    memory_text: Arc<InMemoryStore>,
    memory_image: Arc<InMemoryStore>,
}

impl WebFactory {
    pub fn new(
        backend: StoreBackend,
        text: CollectionSettings,
        image: CollectionSettings,
        index_dir: PathBuf,
    ) -> Self {
        let memory_text = Arc::new(InMemoryStore::new(text.dimension));
        let memory_image = Arc::new(InMemoryStore::new(image.dimension));
        Self { backend, text, image, index_dir, memory_text, memory_image }
    }

    async fn connect(
        &self,
        settings: &CollectionSettings,
        memory: &Arc<InMemoryStore>,
    ) -> Result<Arc<dyn VectorStore>, SearchError> {
        match &self.backend {
            StoreBackend::Qdrant { url, api_key } => {
                let store = QdrantStore::connect(
                    url,
                    api_key.as_deref(),
                    &settings.name,
                    settings.dimension,
                    DistanceMetric::Cosine,
                )
                .await?;
                Ok(Arc::new(store))
            }
            StoreBackend::InMemory => Ok(memory.clone()),
        }
    }
}

#[async_trait]
impl ServiceFactory for WebFactory {
    async fn text_store(&self) -> Result<Arc<dyn VectorStore>, SearchError> {
        self.connect(&self.text, &self.memory_text).await
    }

    async fn image_store(&self) -> Result<Arc<dyn VectorStore>, SearchError> {
        self.connect(&self.image, &self.memory_image).await
    }

    fn text_encoder(&self) -> Result<Box<dyn Embedder>, EmbeddingError> {
        match &self.text.encoder_url {
            Some(url) => {
                let config = ApiConfig::new(url, &self.text.encoder_model, self.text.dimension);
                Ok(Box::new(ApiEmbedder::new(config)?))
            }
            None => Ok(Box::new(HashEmbedder::new(self.text.dimension))),
        }
    }

    fn image_encoder(&self) -> Result<Box<dyn ImageEncoder>, EmbeddingError> {
        match &self.image.encoder_url {
            Some(url) => {
                let config = ApiConfig::new(url, &self.image.encoder_model, self.image.dimension);
                Ok(Box::new(ApiImageEncoder::new(config)?))
            }
            None => Ok(Box::new(HashImageEncoder::new(self.image.dimension))),
        }
    }

    fn text_config(&self) -> MirrorConfig {
        MirrorConfig::new(&self.text.name, self.text.dimension).with_index_dir(&self.index_dir)
    }

    fn image_config(&self) -> MirrorConfig {
        MirrorConfig::new(&self.image.name, self.image.dimension).with_index_dir(&self.index_dir)
    }
}

/// Read the Qdrant backend settings from the environment.
///
/// Missing credentials are a configuration error and abort startup.
pub fn qdrant_backend_from_env() -> Result<StoreBackend, VectorError> {
    let url = std::env::var("QDRANT_URL").map_err(|_| {
        VectorError::Config("QDRANT_URL environment variable must be set".to_string())
    })?;
    let api_key = std::env::var("QDRANT_API_KEY").ok();
    Ok(StoreBackend::Qdrant { url, api_key })
}
