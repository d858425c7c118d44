//! Hash-based text embedder (no external dependencies).
//!
//! Creates fixed-dimension vectors by hashing words into the embedding
//! space. Not as semantically rich as a neural encoder, but deterministic,
//! instant to load, and good enough to exercise the full search pipeline
//! without shipping a model.

use crate::{Embedder, EmbeddingError, EmbeddingResult};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Hash-based text embedder.
///
/// Hashes each token with several seeds and accumulates signed hits into a
/// fixed-dimension vector, then L2-normalizes. Identical text always yields
/// the identical vector.
///
/// # Example
///
/// ```rust
/// use finsearch_embeddings::{Embedder, HashEmbedder};
///
/// let embedder = HashEmbedder::new(128);
/// let vec = embedder.embed("elongated eel-like fish").unwrap();
/// assert_eq!(vec.len(), 128);
/// ```
pub struct HashEmbedder {
    dimension: usize,
    num_hashes: usize,
}

impl HashEmbedder {
    /// Create a new hash embedder with the specified dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            num_hashes: 4, // Multiple hashes for better distribution
        }
    }

    /// Tokenize text into words.
    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|s| s.len() > 1)
            .map(|s| s.to_string())
            .collect()
    }

    /// Hash a word with a seed to get an index.
    fn hash_with_seed(&self, word: &str, seed: u64) -> usize {
        let mut hasher = DefaultHasher::new();
        seed.hash(&mut hasher);
        word.hash(&mut hasher);
        (hasher.finish() as usize) % self.dimension
    }

    /// Hash a word with a seed to get a sign (+1 or -1).
    fn sign_hash(&self, word: &str, seed: u64) -> f32 {
        let mut hasher = DefaultHasher::new();
        (seed + 1000).hash(&mut hasher);
        word.hash(&mut hasher);
        if hasher.finish() % 2 == 0 { 1.0 } else { -1.0 }
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty text".to_string()));
        }

        let tokens = self.tokenize(text);
        if tokens.is_empty() {
            // Return zero vector for text with no valid tokens
            return Ok(vec![0.0; self.dimension]);
        }

        let mut vector = vec![0.0f32; self.dimension];

        for token in &tokens {
            for seed in 0..self.num_hashes as u64 {
                let idx = self.hash_with_seed(token, seed);
                let sign = self.sign_hash(token, seed);
                vector[idx] += sign;
            }
        }

        crate::normalize::normalize_l2(&mut vector);

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let embedder = HashEmbedder::new(128);

        let v1 = embedder.embed("large predatory fish").unwrap();
        let v2 = embedder.embed("large predatory fish").unwrap();
        assert_eq!(v1, v2);
        assert_eq!(v1.len(), 128);
    }

    #[test]
    fn test_related_descriptions_score_higher() {
        let embedder = HashEmbedder::new(256);

        let v1 = embedder.embed("elongated predatory freshwater fish").unwrap();
        let v2 = embedder.embed("predatory elongated fish of freshwater lakes").unwrap();
        let v3 = embedder.embed("tiny colorful coral reef dweller").unwrap();

        let related = embedder.similarity(&v1, &v2).unwrap();
        let unrelated = embedder.similarity(&v1, &v3).unwrap();
        assert!(related > unrelated);
    }

    #[test]
    fn test_empty_input_rejected() {
        let embedder = HashEmbedder::new(64);
        assert!(matches!(
            embedder.embed(""),
            Err(EmbeddingError::InvalidInput(_))
        ));
    }
}
