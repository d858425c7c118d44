//! Deterministic dimension adjustment and the random-vector fallback.
//!
//! Collections have a fixed vector dimension, but encoders do not always
//! match it (a 384-dim text model querying a 1024-dim collection). Shorter
//! vectors are padded with noise drawn from a distribution fitted to the
//! existing values; longer vectors are reduced by systematic sampling.
//!
//! The padding is a compatibility shim, not a semantic operation: the padded
//! tail carries no signal from the input text, and queries adjusted this way
//! should be treated as degraded. It is kept because the reference dataset
//! was ingested with it in place; the generator is seeded with a fixed value
//! so the mapping from input to output is fully deterministic and testable.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Fixed seed for the padding noise, for reproducible adjustment.
const PADDING_SEED: u64 = 42;

/// Adjust an embedding to `target` dimensions.
///
/// - Equal dimensions: returned unchanged.
/// - Shorter: padded with `Normal(mean, 0.1 * std)` noise fitted to the
///   input values, from a fixed-seed generator. The same input always
///   produces the same output.
/// - Longer: reduced by systematic sampling (`index = floor(i * cur / target)`).
pub fn adjust_dimension(embedding: &[f32], target: usize) -> Vec<f32> {
    let current = embedding.len();

    if current == target {
        return embedding.to_vec();
    }

    if current < target {
        let n = current as f32;
        let mean = embedding.iter().sum::<f32>() / n.max(1.0);
        let variance = embedding.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n.max(1.0);
        let std = variance.sqrt();

        let mut out = embedding.to_vec();
        let padding = target - current;
        let mut rng = StdRng::seed_from_u64(PADDING_SEED);
        match Normal::new(mean, std * 0.1) {
            Ok(noise) => out.extend((0..padding).map(|_| noise.sample(&mut rng))),
            // Degenerate spread (all-equal or empty input): pad with the mean
            Err(_) => out.extend(std::iter::repeat(mean).take(padding)),
        }
        out
    } else {
        let step = current as f32 / target as f32;
        (0..target)
            .map(|i| embedding[(i as f32 * step) as usize])
            .collect()
    }
}

/// Draw a uniform random query vector of the given dimension.
///
/// Used whenever a search must be served without an encoder (the
/// `low_resources` family of modes, or an encoder failure). Freshly drawn
/// per request; results from it are explicitly not a semantic search and
/// are labeled as such by the caller.
pub fn random_query_vector(dimension: usize) -> Vec<f32> {
    let mut rng = rand::rng();
    (0..dimension).map(|_| rng.random::<f32>()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_dimensions_match() {
        let v = vec![0.1, 0.2, 0.3];
        assert_eq!(adjust_dimension(&v, 3), v);
    }

    #[test]
    fn test_padding_is_deterministic() {
        let v: Vec<f32> = (0..384).map(|i| (i as f32).sin()).collect();
        let a = adjust_dimension(&v, 1024);
        let b = adjust_dimension(&v, 1024);
        assert_eq!(a.len(), 1024);
        assert_eq!(a, b);
        // The original prefix is preserved untouched
        assert_eq!(&a[..384], v.as_slice());
    }

    #[test]
    fn test_padding_constant_input() {
        let v = vec![0.5; 10];
        let out = adjust_dimension(&v, 16);
        assert_eq!(out.len(), 16);
        // Zero spread pads with the mean
        assert!(out[10..].iter().all(|&x| (x - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_systematic_downsampling() {
        let v: Vec<f32> = (0..2048).map(|i| i as f32).collect();
        let out = adjust_dimension(&v, 1024);
        assert_eq!(out.len(), 1024);
        // step = 2.0, so element i comes from index 2 * i
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 2.0);
        assert_eq!(out[1023], 2046.0);

        // Reproducible as well
        assert_eq!(out, adjust_dimension(&v, 1024));
    }

    #[test]
    fn test_random_query_vector_shape() {
        let v = random_query_vector(512);
        assert_eq!(v.len(), 512);
        assert!(v.iter().all(|&x| (0.0..1.0).contains(&x)));
    }
}
