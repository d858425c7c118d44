//! Core embedder trait and types.

use thiserror::Error;

/// Embedding error types.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Core trait for text embedding providers.
///
/// Implementors convert text to dense vectors for semantic similarity.
/// Within one process lifetime, identical input must produce an identical
/// vector; the search engine relies on this when labeling a response as a
/// semantic search rather than a random-vector fallback.
pub trait Embedder: Send + Sync {
    /// Embed a single text string.
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Embed multiple texts in a batch (more efficient).
    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        // Default implementation: embed one by one
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;

    /// Compute cosine similarity between two vectors.
    fn similarity(&self, a: &[f32], b: &[f32]) -> EmbeddingResult<f32> {
        if a.len() != b.len() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: a.len(),
                got: b.len(),
            });
        }
        Ok(crate::normalize::cosine_similarity(a, b))
    }
}
