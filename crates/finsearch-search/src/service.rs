//! Mode-aware query router.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use finsearch_embeddings::{
    adjust_dimension, random_query_vector, Embedder, EmbeddingError, ImageEncoder,
};
use finsearch_vectors::{SpeciesRecord, VectorStore};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::{
    MirrorConfig, MirrorStats, MirroredIndex, OperatingMode, RequestedMode, SearchError,
    SearchTiming,
};

/// Constructs the collaborators [`SearchService::initialize`] needs for a
/// given mode: stores for the collections, encoders for the models.
///
/// The production factory builds Qdrant stores and API encoders; tests plug
/// in the in-memory store and hash encoders. Store construction failures
/// propagate (initialization must be loud); encoder failures are degradable
/// and handled by the service.
#[async_trait]
pub trait ServiceFactory: Send + Sync {
    /// Connect to the text-description collection.
    async fn text_store(&self) -> Result<Arc<dyn VectorStore>, SearchError>;

    /// Connect to the image collection.
    async fn image_store(&self) -> Result<Arc<dyn VectorStore>, SearchError>;

    /// Load the text encoder.
    fn text_encoder(&self) -> Result<Box<dyn Embedder>, EmbeddingError>;

    /// Load the image encoder.
    fn image_encoder(&self) -> Result<Box<dyn ImageEncoder>, EmbeddingError>;

    /// Mirror tuning for the text collection.
    fn text_config(&self) -> MirrorConfig;

    /// Mirror tuning for the image collection.
    fn image_config(&self) -> MirrorConfig;
}

/// A search query: a text description or a photograph.
#[derive(Debug, Clone)]
pub enum QueryInput {
    Text(String),
    Image(Vec<u8>),
}

impl QueryInput {
    /// Human-readable label echoed back in the response.
    pub fn label(&self) -> String {
        match self {
            QueryInput::Text(text) => text.clone(),
            QueryInput::Image(bytes) => format!("<image query, {} bytes>", bytes.len()),
        }
    }
}

/// One search request as the serving boundary hands it to the router.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: QueryInput,
    pub top_k: usize,
    pub mode: RequestedMode,
}

/// One ranked species hit in a response.
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesHit {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    /// Description truncated to 200 characters.
    pub description: String,
    pub similarity_score: f32,
}

impl SpeciesHit {
    fn from_scored(record: SpeciesRecord, score: f32) -> Self {
        Self {
            id: record.id,
            description: record.truncated_description(200),
            name: record.name,
            genus: record.genus,
            species: record.species,
            common_name: record.common_name,
            similarity_score: score,
        }
    }
}

/// One search response.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// The mode that actually served the request. Random-vector serving is
    /// labeled by the mode that implies it, never passed off as semantic.
    pub mode_used: OperatingMode,
    pub results: Vec<SpeciesHit>,
    pub timing: SearchTiming,
    pub total_time: f64,
}

/// Aggregate service status for the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub mode: OperatingMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<MirrorStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<MirrorStats>,
    pub text_encoder_loaded: bool,
    pub image_encoder_loaded: bool,
}

/// Everything one initialization produces, replaced wholesale by the next.
struct ServiceState {
    mode: OperatingMode,
    text: Option<Arc<MirroredIndex>>,
    image: Option<Arc<MirroredIndex>>,
    text_encoder: Option<Arc<dyn Embedder>>,
    image_encoder: Option<Arc<dyn ImageEncoder>>,
}

impl ServiceState {
    fn empty() -> Self {
        Self {
            mode: OperatingMode::None,
            text: None,
            image: None,
            text_encoder: None,
            image_encoder: None,
        }
    }
}

/// The mode-aware query router.
///
/// An explicit context object replacing the reference system's process-wide
/// globals: the operating mode, mirrored collections and encoders live
/// behind one `RwLock`, written only by [`SearchService::initialize`] and
/// read by every request.
pub struct SearchService {
    factory: Arc<dyn ServiceFactory>,
    state: RwLock<ServiceState>,
}

impl SearchService {
    /// Create an uninitialized service (mode `none`).
    pub fn new(factory: Arc<dyn ServiceFactory>) -> Self {
        Self { factory, state: RwLock::new(ServiceState::empty()) }
    }

    /// Current operating mode.
    pub async fn mode(&self) -> OperatingMode {
        self.state.read().await.mode
    }

    /// Transition `none → mode`, loading the collections and encoders the
    /// target mode calls for. Re-initialization replaces the state
    /// wholesale.
    ///
    /// Store and index-construction failures propagate — callers must see
    /// a failed initialization. Encoder load failures degrade that
    /// capability to random query vectors and initialization proceeds.
    pub async fn initialize(&self, mode: OperatingMode) -> Result<(), SearchError> {
        if mode == OperatingMode::None {
            return Err(SearchError::InvalidRequest(
                "cannot initialize to mode 'none'".to_string(),
            ));
        }

        info!(%mode, "initializing search service");
        let mut next = ServiceState::empty();
        next.mode = mode;

        if mode.uses_text_collection() {
            let store = self.factory.text_store().await?;
            let mirror = MirroredIndex::open(store, self.factory.text_config()).await?;
            next.text = Some(Arc::new(mirror));
        }
        if mode.uses_image_collection() {
            let store = self.factory.image_store().await?;
            let mirror = MirroredIndex::open(store, self.factory.image_config()).await?;
            next.image = Some(Arc::new(mirror));
        }

        if mode.loads_text_encoder() {
            match self.factory.text_encoder() {
                Ok(encoder) => next.text_encoder = Some(Arc::from(encoder)),
                Err(e) => warn!(
                    error = %e,
                    "text encoder failed to load, text queries degrade to random vectors"
                ),
            }
        }
        if mode.loads_image_encoder() {
            match self.factory.image_encoder() {
                Ok(encoder) => next.image_encoder = Some(Arc::from(encoder)),
                Err(e) => warn!(
                    error = %e,
                    "image encoder failed to load, image queries degrade to random vectors"
                ),
            }
        }

        *self.state.write().await = next;
        info!(%mode, "search service initialized");
        Ok(())
    }

    /// Serve one search request.
    ///
    /// Resolves the requested mode against the current one, obtains a query
    /// vector (encoder output, dimension-adjusted, or a labeled random
    /// fallback) and runs the timed pipeline on the matching collection.
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResponse, SearchError> {
        let total_start = Instant::now();

        if request.top_k == 0 {
            return Err(SearchError::InvalidRequest("top_k must be at least 1".to_string()));
        }

        let state = self.state.read().await;
        if state.mode == OperatingMode::None {
            return Err(SearchError::NotInitialized);
        }

        let requested = match request.mode {
            RequestedMode::Auto => state.mode,
            RequestedMode::Explicit(mode) => mode,
        };

        // The query's input kind decides which collection serves it; the
        // requested mode must cover that collection at all, and the current
        // initialization must actually have it loaded.
        let (mirror, wants_encoder, fallback_mode) = match &request.query {
            QueryInput::Text(_) => {
                if !requested.uses_text_collection() {
                    return Err(SearchError::NotAvailable(format!(
                        "mode '{}' does not serve text queries",
                        requested
                    )));
                }
                let mirror = state.text.as_ref().ok_or_else(|| {
                    SearchError::NotAvailable(format!(
                        "text collection is not loaded in mode '{}'",
                        state.mode
                    ))
                })?;
                (mirror, requested.loads_text_encoder(), OperatingMode::LowResources)
            }
            QueryInput::Image(_) => {
                if !requested.uses_image_collection() {
                    return Err(SearchError::NotAvailable(format!(
                        "mode '{}' does not serve image queries",
                        requested
                    )));
                }
                let mirror = state.image.as_ref().ok_or_else(|| {
                    SearchError::NotAvailable(format!(
                        "image collection is not loaded in mode '{}'",
                        state.mode
                    ))
                })?;
                (mirror, requested.loads_image_encoder(), OperatingMode::RandomPic)
            }
        };

        let dimension = mirror.config().dimension;
        let (vector, embedding_time, mode_used) = if wants_encoder {
            self.encode_query(&state, &request.query, dimension, requested, fallback_mode)
        } else {
            // The requested mode serves random vectors by definition
            (random_query_vector(dimension), None, requested)
        };

        let (results, mut timing) = mirror.search_with_timing(&vector, request.top_k).await;
        timing.embedding = embedding_time;

        Ok(SearchResponse {
            query: request.query.label(),
            mode_used,
            results: results
                .into_iter()
                .map(|(species, score)| SpeciesHit::from_scored(species, score))
                .collect(),
            timing,
            total_time: total_start.elapsed().as_secs_f64(),
        })
    }

    /// Encode the query with the loaded encoder, degrading to a labeled
    /// random vector when the encoder is missing or fails.
    fn encode_query(
        &self,
        state: &ServiceState,
        query: &QueryInput,
        dimension: usize,
        requested: OperatingMode,
        fallback_mode: OperatingMode,
    ) -> (Vec<f32>, Option<f64>, OperatingMode) {
        let start = Instant::now();
        let encoded = match query {
            QueryInput::Text(text) => state.text_encoder.as_ref().map(|encoder| {
                let encoder = Arc::clone(encoder);
                let text = text.clone();
                tokio::task::block_in_place(move || encoder.embed(&text))
            }),
            QueryInput::Image(bytes) => state.image_encoder.as_ref().map(|encoder| {
                let encoder = Arc::clone(encoder);
                let bytes = bytes.clone();
                tokio::task::block_in_place(move || encoder.encode(&bytes))
            }),
        };

        match encoded {
            Some(Ok(vector)) => {
                let elapsed = start.elapsed().as_secs_f64();
                (adjust_dimension(&vector, dimension), Some(elapsed), requested)
            }
            Some(Err(e)) => {
                warn!(error = %e, "query encoding failed, falling back to a random vector");
                (random_query_vector(dimension), None, fallback_mode)
            }
            None => (random_query_vector(dimension), None, fallback_mode),
        }
    }

    /// Trigger a full rebuild of every loaded collection.
    ///
    /// Returns `(collection, vectors_indexed)` per mirror.
    pub async fn rebuild(&self) -> Result<Vec<(String, usize)>, SearchError> {
        let state = self.state.read().await;
        if state.mode == OperatingMode::None {
            return Err(SearchError::NotInitialized);
        }

        let mut report = Vec::new();
        for mirror in [&state.text, &state.image].into_iter().flatten() {
            let indexed = mirror.rebuild().await?;
            report.push((mirror.config().collection.clone(), indexed));
        }
        Ok(report)
    }

    /// Aggregate status of the service.
    pub async fn status(&self) -> ServiceStatus {
        let state = self.state.read().await;

        let text = match &state.text {
            Some(mirror) => Some(mirror.stats().await),
            None => None,
        };
        let image = match &state.image {
            Some(mirror) => Some(mirror.stats().await),
            None => None,
        };

        ServiceStatus {
            mode: state.mode,
            text,
            image,
            text_encoder_loaded: state.text_encoder.is_some(),
            image_encoder_loaded: state.image_encoder.is_some(),
        }
    }
}
