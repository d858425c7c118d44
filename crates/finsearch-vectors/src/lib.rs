//! # Finsearch Vectors
//!
//! Remote vector store adapters for the finsearch species search engine.
//!
//! The remote store is the single source of truth for species embeddings and
//! metadata. Everything else in finsearch (the local approximate index, the
//! search engine) is a derived cache that can be rebuilt from what lives here.
//!
//! ## Backends
//!
//! | Backend | Feature Flag | Description |
//! |---------|--------------|-------------|
//! | In-Memory | (always) | Brute-force search, used by tests and offline dev |
//! | Qdrant | `qdrant` (default) | The authoritative production store |
//!
//! ## Quick Start
//!
//! ```rust
//! use finsearch_vectors::{InMemoryStore, SpeciesPoint, SpeciesRecord, VectorStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryStore::new(4);
//!
//!     store
//!         .upsert(vec![SpeciesPoint::new(
//!             1,
//!             vec![1.0, 0.0, 0.0, 0.0],
//!             SpeciesRecord::named(1, "Esox_lucius_northern_pike"),
//!         )])
//!         .await?;
//!
//!     let hits = store.search(&[1.0, 0.0, 0.0, 0.0], 1).await?;
//!     assert_eq!(hits[0].species.id, 1);
//!     Ok(())
//! }
//! ```

pub mod memory;
mod species;

#[cfg(feature = "qdrant")]
pub mod qdrant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryStore;
pub use species::SpeciesRecord;

#[cfg(feature = "qdrant")]
pub use qdrant::QdrantStore;

/// Errors that can occur when talking to a vector store.
///
/// This is a closed taxonomy: callers match on the variant to decide whether
/// a failure is fatal (construction), retryable with a smaller batch
/// (`Timeout` during a scroll), or reportable per request.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Point not found: {0}")]
    NotFound(u64),

    #[error("Collection error: {0}")]
    Collection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("API error: {0}")]
    Api(String),
}

/// Result type for vector store operations.
pub type VectorResult<T> = Result<T, VectorError>;

/// Distance metric for similarity search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Cosine similarity (normalized dot product).
    Cosine,
    /// Euclidean distance (L2), converted to a similarity for ranking.
    Euclidean,
    /// Dot product (inner product).
    DotProduct,
}

/// One point in the remote store: embedding vector plus species payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesPoint {
    /// Remote point id, assigned at ingestion time.
    pub id: u64,
    /// The embedding vector.
    pub vector: Vec<f32>,
    /// Species metadata stored as the point payload.
    pub species: SpeciesRecord,
}

impl SpeciesPoint {
    /// Create a new point.
    pub fn new(id: u64, vector: Vec<f32>, species: SpeciesRecord) -> Self {
        Self { id, vector, species }
    }

    /// Get the vector dimension.
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// A point as returned by [`VectorStore::scroll`]: id and vector only.
///
/// Scroll pages are consumed by the index rebuild, which has no use for
/// payloads; points that were stored without a vector come back as `None`
/// and are skipped by the caller.
#[derive(Debug, Clone)]
pub struct ScrolledPoint {
    pub id: u64,
    pub vector: Option<Vec<f32>>,
}

/// A ranked hit from a store-side similarity search.
#[derive(Debug, Clone)]
pub struct ScoredSpecies {
    pub id: u64,
    pub score: f32,
    pub species: SpeciesRecord,
}

/// Abstract interface to the authoritative vector store.
///
/// Implementations own all durable data. Connectivity failures are fatal at
/// construction time and recoverable (reported per call) afterwards.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Get the name of this backend.
    fn name(&self) -> &str;

    /// Get the vector dimension of the collection.
    fn dimension(&self) -> usize;

    /// Get the distance metric of the collection.
    fn metric(&self) -> DistanceMetric;

    /// Insert or update points.
    ///
    /// A point with an existing id is replaced.
    async fn upsert(&self, points: Vec<SpeciesPoint>) -> VectorResult<()>;

    /// Store-side similarity search, payloads included.
    ///
    /// Used by the remote-only search path; the fast path searches the local
    /// index instead and only calls [`VectorStore::retrieve`] here.
    async fn search(&self, vector: &[f32], k: usize) -> VectorResult<Vec<ScoredSpecies>>;

    /// Fetch points by id, payloads included. Order is unspecified.
    async fn retrieve(&self, ids: &[u64]) -> VectorResult<Vec<SpeciesPoint>>;

    /// Page through all points in the collection.
    ///
    /// Returns up to `limit` points starting at `offset` (`None` starts from
    /// the beginning) plus the cursor for the next page; a `None` cursor
    /// means the collection is exhausted.
    async fn scroll(
        &self,
        limit: usize,
        offset: Option<u64>,
    ) -> VectorResult<(Vec<ScrolledPoint>, Option<u64>)>;

    /// Total number of points in the collection.
    async fn count(&self) -> VectorResult<usize>;
}

/// Utility functions for vector math shared by the backends.
pub mod util {
    /// Compute cosine similarity between two vectors.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot / (norm_a * norm_b)
        }
    }

    /// Compute Euclidean distance between two vectors.
    pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f32>()
            .sqrt()
    }

    /// Compute dot product between two vectors.
    pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

        a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((util::cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);

        let c = vec![0.0, 1.0, 0.0];
        assert!(util::cosine_similarity(&a, &c).abs() < 1e-6);
    }

    #[test]
    fn test_species_point() {
        let point = SpeciesPoint::new(
            7,
            vec![0.1, 0.2, 0.3],
            SpeciesRecord::named(7, "Salmo_trutta_brown_trout"),
        );
        assert_eq!(point.id, 7);
        assert_eq!(point.dimension(), 3);
    }
}
