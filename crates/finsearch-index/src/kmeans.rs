//! Lloyd's k-means for training the coarse quantizer.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};

use crate::{IndexError, IndexResult};

const MAX_ITERATIONS: usize = 25;
const TRAINING_SEED: u64 = 0x5eed;

/// Train `k` centroids over the sample vectors.
///
/// `k` is clamped to the sample count, so small collections end up with one
/// centroid per vector and the index degenerates to an exact search.
/// Initialization picks distinct samples with a fixed seed; empty clusters
/// are re-seeded from a random sample, so every returned centroid is
/// meaningful.
pub fn train_centroids(
    samples: &[Vec<f32>],
    dimension: usize,
    k: usize,
) -> IndexResult<Vec<Vec<f32>>> {
    if samples.is_empty() {
        return Err(IndexError::EmptyTraining);
    }
    for sample in samples {
        if sample.len() != dimension {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: sample.len(),
            });
        }
    }

    let k = k.min(samples.len()).max(1);
    let mut rng = StdRng::seed_from_u64(TRAINING_SEED);

    // Initialize from k distinct samples
    let mut centroids: Vec<Vec<f32>> = sample(&mut rng, samples.len(), k)
        .into_iter()
        .map(|i| samples[i].clone())
        .collect();

    let mut assignment = vec![usize::MAX; samples.len()];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;

        for (i, vector) in samples.iter().enumerate() {
            let nearest = nearest_centroid(vector, &centroids);
            if assignment[i] != nearest {
                assignment[i] = nearest;
                changed = true;
            }
        }

        if !changed {
            break;
        }

        // Recompute centroids as cluster means
        let mut sums = vec![vec![0.0f32; dimension]; k];
        let mut counts = vec![0usize; k];
        for (i, vector) in samples.iter().enumerate() {
            let c = assignment[i];
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(vector) {
                *s += v;
            }
        }

        for (c, sum) in sums.into_iter().enumerate() {
            if counts[c] == 0 {
                // Re-seed an empty cluster from a random sample
                centroids[c] = samples[rng.random_range(0..samples.len())].clone();
                continue;
            }
            let inv = 1.0 / counts[c] as f32;
            centroids[c] = sum.into_iter().map(|s| s * inv).collect();
        }
    }

    Ok(centroids)
}

/// Index of the centroid nearest to `vector` by squared L2 distance.
pub(crate) fn nearest_centroid(vector: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist: f32 = vector
            .iter()
            .zip(centroid)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_clamped_to_sample_count() {
        let samples = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let centroids = train_centroids(&samples, 2, 256).unwrap();
        assert_eq!(centroids.len(), 2);
    }

    #[test]
    fn test_separates_obvious_clusters() {
        let mut samples = Vec::new();
        for i in 0..20 {
            let jitter = i as f32 * 1e-3;
            samples.push(vec![10.0 + jitter, 0.0]);
            samples.push(vec![-10.0 - jitter, 0.0]);
        }

        let centroids = train_centroids(&samples, 2, 2).unwrap();
        let signs: Vec<bool> = centroids.iter().map(|c| c[0] > 0.0).collect();
        assert_ne!(signs[0], signs[1], "centroids should land in opposite clusters");
    }

    #[test]
    fn test_empty_training_rejected() {
        assert!(matches!(
            train_centroids(&[], 4, 8),
            Err(IndexError::EmptyTraining)
        ));
    }

    #[test]
    fn test_dimension_checked() {
        let samples = vec![vec![1.0, 0.0, 0.0]];
        assert!(matches!(
            train_centroids(&samples, 2, 1),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }
}
