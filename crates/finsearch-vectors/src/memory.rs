//! In-memory vector store implementation.
//!
//! Brute-force search over a `BTreeMap`, with deterministic scroll order by
//! ascending point id. Used by the test suites and by offline development
//! where no Qdrant instance is reachable.

use crate::{
    DistanceMetric, ScoredSpecies, ScrolledPoint, SpeciesPoint, VectorError, VectorResult,
    VectorStore,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

/// In-memory vector store using brute-force search.
///
/// Suitable for testing, prototyping, and collections small enough that an
/// exact scan is cheap. Implements the full [`VectorStore`] contract,
/// including cursor paging, so the synchronization engine can be exercised
/// against it without a network.
pub struct InMemoryStore {
    points: RwLock<BTreeMap<u64, SpeciesPoint>>,
    dimension: usize,
    metric: DistanceMetric,
}

impl InMemoryStore {
    /// Create a new in-memory store with the specified dimension.
    ///
    /// Uses cosine similarity by default.
    pub fn new(dimension: usize) -> Self {
        Self::with_metric(dimension, DistanceMetric::Cosine)
    }

    /// Create a new in-memory store with a specific distance metric.
    pub fn with_metric(dimension: usize, metric: DistanceMetric) -> Self {
        Self { points: RwLock::new(BTreeMap::new()), dimension, metric }
    }

    /// Compute a ranking score between two vectors under the store metric.
    fn compute_score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            DistanceMetric::Cosine => crate::util::cosine_similarity(a, b),
            DistanceMetric::Euclidean => {
                // Convert distance to similarity (higher is better)
                let dist = crate::util::euclidean_distance(a, b);
                1.0 / (1.0 + dist)
            }
            DistanceMetric::DotProduct => crate::util::dot_product(a, b),
        }
    }

    fn read_lock(
        &self,
    ) -> VectorResult<std::sync::RwLockReadGuard<'_, BTreeMap<u64, SpeciesPoint>>> {
        self.points
            .read()
            .map_err(|e| VectorError::Connection(format!("Failed to acquire read lock: {}", e)))
    }

    fn write_lock(
        &self,
    ) -> VectorResult<std::sync::RwLockWriteGuard<'_, BTreeMap<u64, SpeciesPoint>>> {
        self.points
            .write()
            .map_err(|e| VectorError::Connection(format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn upsert(&self, points: Vec<SpeciesPoint>) -> VectorResult<()> {
        let mut store = self.write_lock()?;
        for point in points {
            if point.vector.len() != self.dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: self.dimension,
                    actual: point.vector.len(),
                });
            }
            store.insert(point.id, point);
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> VectorResult<Vec<ScoredSpecies>> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let store = self.read_lock()?;

        let mut scored: Vec<_> = store
            .values()
            .map(|point| (point, self.compute_score(vector, &point.vector)))
            .collect();

        // Sort by score (descending)
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(point, score)| ScoredSpecies {
                id: point.id,
                score,
                species: point.species.clone(),
            })
            .collect())
    }

    async fn retrieve(&self, ids: &[u64]) -> VectorResult<Vec<SpeciesPoint>> {
        let store = self.read_lock()?;
        Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
    }

    async fn scroll(
        &self,
        limit: usize,
        offset: Option<u64>,
    ) -> VectorResult<(Vec<ScrolledPoint>, Option<u64>)> {
        let store = self.read_lock()?;

        let start = offset.map_or(Bound::Unbounded, Bound::Included);
        let mut page: Vec<ScrolledPoint> = Vec::with_capacity(limit);
        let mut next_offset = None;

        for (&id, point) in store.range((start, Bound::Unbounded)) {
            if page.len() == limit {
                next_offset = Some(id);
                break;
            }
            page.push(ScrolledPoint { id, vector: Some(point.vector.clone()) });
        }

        Ok((page, next_offset))
    }

    async fn count(&self) -> VectorResult<usize> {
        Ok(self.read_lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SpeciesRecord;

    fn point(id: u64, vector: Vec<f32>) -> SpeciesPoint {
        SpeciesPoint::new(id, vector, SpeciesRecord::named(id, format!("fish_{}", id)))
    }

    #[tokio::test]
    async fn test_upsert_and_search() {
        let store = InMemoryStore::new(3);

        store
            .upsert(vec![
                point(1, vec![1.0, 0.0, 0.0]),
                point(2, vec![0.0, 1.0, 0.0]),
                point(3, vec![0.7, 0.7, 0.0]),
            ])
            .await
            .unwrap();

        let hits = store.search(&[1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, 1);
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_retrieve_preserves_only_known_ids() {
        let store = InMemoryStore::new(2);
        store
            .upsert(vec![point(1, vec![1.0, 0.0]), point(2, vec![0.0, 1.0])])
            .await
            .unwrap();

        let points = store.retrieve(&[2, 99, 1]).await.unwrap();
        assert_eq!(points.len(), 2);
    }

    #[tokio::test]
    async fn test_scroll_pages_whole_collection() {
        let store = InMemoryStore::new(2);
        let points: Vec<_> = (0..250).map(|i| point(i, vec![i as f32, 1.0])).collect();
        store.upsert(points).await.unwrap();

        let mut seen = 0usize;
        let mut pages = 0usize;
        let mut offset = None;
        loop {
            let (page, next) = store.scroll(100, offset).await.unwrap();
            seen += page.len();
            pages += 1;
            match next {
                Some(_) => offset = next,
                None => break,
            }
        }

        assert_eq!(seen, 250);
        assert_eq!(pages, 3); // 100 + 100 + 50
    }

    #[tokio::test]
    async fn test_scroll_empty() {
        let store = InMemoryStore::new(2);
        let (page, next) = store.scroll(100, None).await.unwrap();
        assert!(page.is_empty());
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_dimension_mismatch() {
        let store = InMemoryStore::new(3);

        let result = store.upsert(vec![point(1, vec![1.0, 0.0])]).await;
        assert!(matches!(result, Err(VectorError::DimensionMismatch { .. })));

        let result = store.search(&[1.0, 0.0], 5).await;
        assert!(matches!(result, Err(VectorError::DimensionMismatch { .. })));
    }

    #[tokio::test]
    async fn test_count() {
        let store = InMemoryStore::new(2);
        assert_eq!(store.count().await.unwrap(), 0);

        store
            .upsert(vec![point(1, vec![1.0, 0.0]), point(2, vec![0.0, 1.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        // Upsert with an existing id replaces, not duplicates
        store.upsert(vec![point(2, vec![1.0, 1.0])]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
