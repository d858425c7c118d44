//! Inverted-file flat index over normalized vectors.

use serde::{Deserialize, Serialize};

use crate::kmeans::{nearest_centroid, train_centroids};
use crate::{dot, rank_candidates, IndexError, IndexResult};

/// IVF-flat approximate index, inner-product metric.
///
/// Training partitions the vector space into up to `nlist` coarse clusters;
/// `add` routes each vector to its nearest cluster's inverted list, and
/// `search` scans only the `nprobe` clusters closest to the query.
///
/// Vectors are expected to be L2-normalized by the caller, which makes the
/// inner-product scores cosine similarities.
#[derive(Debug, Serialize, Deserialize)]
pub struct IvfIndex {
    dimension: usize,
    nlist: usize,
    nprobe: usize,
    /// Learned cluster centroids; empty until trained.
    centroids: Vec<Vec<f32>>,
    /// Inverted lists of slot numbers, one per centroid.
    lists: Vec<Vec<u32>>,
    /// Flat slot-major vector storage.
    vectors: Vec<f32>,
}

impl IvfIndex {
    /// Create an untrained index.
    pub fn new(dimension: usize, nlist: usize, nprobe: usize) -> Self {
        Self {
            dimension,
            nlist,
            nprobe,
            centroids: Vec::new(),
            lists: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Whether the coarse quantizer has been trained.
    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    /// Number of indexed vectors.
    pub fn ntotal(&self) -> usize {
        if self.dimension == 0 {
            return 0;
        }
        self.vectors.len() / self.dimension
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of trained clusters (0 until trained).
    pub fn nlist(&self) -> usize {
        self.centroids.len()
    }

    /// Set the number of clusters scanned per query.
    pub fn set_nprobe(&mut self, nprobe: usize) {
        self.nprobe = nprobe.max(1);
    }

    /// Train the coarse quantizer on a representative sample.
    ///
    /// Training happens once per rebuild, on the first batch of vectors;
    /// retraining replaces the centroids and reroutes nothing, so it is
    /// only valid while the index is empty.
    pub fn train(&mut self, samples: &[Vec<f32>]) -> IndexResult<()> {
        let centroids = train_centroids(samples, self.dimension, self.nlist)?;
        self.lists = vec![Vec::new(); centroids.len()];
        self.centroids = centroids;
        Ok(())
    }

    /// Append vectors in insertion order.
    ///
    /// The i-th vector of this call is assigned slot `previous_ntotal + i`
    /// and routed to its nearest cluster's inverted list.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()> {
        if !self.is_trained() {
            return Err(IndexError::NotTrained);
        }

        let mut slot = self.ntotal() as u32;
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
            let list_no = nearest_centroid(vector, &self.centroids);
            self.lists[list_no].push(slot);
            self.vectors.extend_from_slice(vector);
            slot += 1;
        }
        Ok(())
    }

    /// Top-k inner-product search over the `nprobe` nearest clusters.
    ///
    /// Always returns exactly `k` pairs, padded with the invalid-slot
    /// sentinel; an empty or untrained index yields all sentinels rather
    /// than an error.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<(i64, f32)>> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        if self.ntotal() == 0 || !self.is_trained() {
            return Ok(rank_candidates(std::iter::empty(), k));
        }

        // Rank clusters by inner product with the query
        let mut cluster_scores: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (i, dot(query, c)))
            .collect();
        cluster_scores
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let nprobe = self.nprobe.min(cluster_scores.len());
        let candidates = cluster_scores[..nprobe]
            .iter()
            .flat_map(|&(list_no, _)| self.lists[list_no].iter().copied())
            .map(|slot| (slot, dot(query, self.vector_at(slot))));

        Ok(rank_candidates(candidates, k))
    }

    fn vector_at(&self, slot: u32) -> &[f32] {
        let start = slot as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::INVALID_SLOT;

    fn unit(dim: usize, axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[axis] = 1.0;
        v
    }

    #[test]
    fn test_add_requires_training() {
        let mut index = IvfIndex::new(4, 8, 3);
        assert!(matches!(
            index.add(&[unit(4, 0)]),
            Err(IndexError::NotTrained)
        ));
    }

    #[test]
    fn test_slots_follow_insertion_order() {
        let vectors = vec![unit(4, 0), unit(4, 1), unit(4, 2)];
        let mut index = IvfIndex::new(4, 8, 8);
        index.train(&vectors).unwrap();

        index.add(&vectors[..2]).unwrap();
        assert_eq!(index.ntotal(), 2);
        index.add(&vectors[2..]).unwrap();
        assert_eq!(index.ntotal(), 3);

        // Each vector is its own best match
        for (slot, vector) in vectors.iter().enumerate() {
            let hits = index.search(vector, 1).unwrap();
            assert_eq!(hits[0].0, slot as i64);
            assert!((hits[0].1 - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_search_pads_with_sentinels() {
        let vectors = vec![unit(4, 0)];
        let mut index = IvfIndex::new(4, 8, 3);
        index.train(&vectors).unwrap();
        index.add(&vectors).unwrap();

        let hits = index.search(&unit(4, 0), 5).unwrap();
        assert_eq!(hits.len(), 5);
        assert_eq!(hits[0].0, 0);
        assert!(hits[1..].iter().all(|&(slot, _)| slot == INVALID_SLOT));
    }

    #[test]
    fn test_empty_index_search_is_safe() {
        let index = IvfIndex::new(4, 8, 3);
        let hits = index.search(&unit(4, 0), 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|&(slot, _)| slot == INVALID_SLOT));
    }

    #[test]
    fn test_ranking_descends() {
        let vectors = vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.9, 0.1, 0.0, 0.0],
        ];
        let mut index = IvfIndex::new(4, 4, 4);
        index.train(&vectors).unwrap();
        index.add(&vectors).unwrap();

        let hits = index.search(&vec![1.0, 0.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 2);
        assert!(hits[0].1 > hits[1].1);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = IvfIndex::new(4, 8, 3);
        index.train(&[unit(4, 0)]).unwrap();
        assert!(matches!(
            index.add(&[vec![1.0, 0.0]]),
            Err(IndexError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }
}
