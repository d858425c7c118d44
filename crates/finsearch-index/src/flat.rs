//! Exact brute-force inner-product index.

use serde::{Deserialize, Serialize};

use crate::{dot, rank_candidates, IndexResult};

/// Exact inner-product index, the degenerate-case fallback.
///
/// Needs no training, accepts vectors at any point, and a search over zero
/// vectors simply returns sentinels. Published in place of [`crate::IvfIndex`]
/// when the remote store is empty or training fails, so the serving path
/// always has a queryable index.
#[derive(Debug, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index.
    pub fn new(dimension: usize) -> Self {
        Self { dimension, vectors: Vec::new() }
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

    /// Append vectors in insertion order.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(crate::IndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
            self.vectors.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Exact top-k inner-product search over all vectors.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<(i64, f32)>> {
        if query.len() != self.dimension {
            return Err(crate::IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let candidates = (0..self.ntotal() as u32).map(|slot| {
            let start = slot as usize * self.dimension;
            (slot, dot(query, &self.vectors[start..start + self.dimension]))
        });

        Ok(rank_candidates(candidates, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::INVALID_SLOT;

    #[test]
    fn test_empty_search_returns_sentinels() {
        let index = FlatIndex::new(4);
        let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 3).unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|&(slot, _)| slot == INVALID_SLOT));
    }

    #[test]
    fn test_add_then_search_without_training() {
        let mut index = FlatIndex::new(2);
        index
            .add(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]])
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].0, 0);
        assert_eq!(hits[1].0, 2);
    }

    #[test]
    fn test_tie_breaks_by_slot_order() {
        let mut index = FlatIndex::new(2);
        index
            .add(&[vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]])
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 3).unwrap();
        let slots: Vec<i64> = hits.iter().map(|&(slot, _)| slot).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }
}
