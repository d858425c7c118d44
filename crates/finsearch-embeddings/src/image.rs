//! Image encoder seam.
//!
//! Photograph queries go through the same pipeline as text, but the encoder
//! input is raw image bytes rather than a string. The real model lives
//! behind the `api` feature; the hash-based encoder here exists so the
//! image-mode pipeline can be exercised end to end without one.

use crate::{EmbeddingError, EmbeddingResult};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Trait for image embedding providers.
///
/// Like [`crate::Embedder`], identical input must produce an identical
/// vector within a process lifetime.
pub trait ImageEncoder: Send + Sync {
    /// Encode raw image bytes into a dense vector.
    fn encode(&self, image: &[u8]) -> EmbeddingResult<Vec<f32>>;

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get the model name/identifier.
    fn model_name(&self) -> &str;
}

/// Hash-based image encoder.
///
/// Hashes fixed-size chunks of the image bytes into the embedding space.
/// Carries no visual semantics; it is a deterministic stand-in that lets
/// the image collection and its search path run without a model.
pub struct HashImageEncoder {
    dimension: usize,
    chunk_size: usize,
}

impl HashImageEncoder {
    /// Create a new hash image encoder with the specified dimension.
    pub fn new(dimension: usize) -> Self {
        Self { dimension, chunk_size: 64 }
    }
}

impl ImageEncoder for HashImageEncoder {
    fn encode(&self, image: &[u8]) -> EmbeddingResult<Vec<f32>> {
        if image.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty image".to_string()));
        }

        let mut vector = vec![0.0f32; self.dimension];

        for (chunk_no, chunk) in image.chunks(self.chunk_size).enumerate() {
            let mut hasher = DefaultHasher::new();
            chunk_no.hash(&mut hasher);
            chunk.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dimension;
            let sign = if h & 1 == 0 { 1.0 } else { -1.0 };
            vector[idx] += sign;
        }

        crate::normalize::normalize_l2(&mut vector);

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-image-encoder"
    }
}
