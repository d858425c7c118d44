//! Synchronization and timed-search tests against the in-memory store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use finsearch_search::{MirrorConfig, MirroredIndex};
use finsearch_vectors::{
    DistanceMetric, InMemoryStore, ScoredSpecies, ScrolledPoint, SpeciesPoint, SpeciesRecord,
    VectorError, VectorResult, VectorStore,
};

fn point(id: u64, vector: Vec<f32>) -> SpeciesPoint {
    SpeciesPoint::new(
        id,
        vector,
        SpeciesRecord::named(id, format!("fish_{}", id))
            .with_description(format!("description of fish {}", id)),
    )
}

async fn seeded_store(dimension: usize, count: u64) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new(dimension));
    let points: Vec<_> = (1..=count)
        .map(|i| {
            let mut vector = vec![0.0f32; dimension];
            vector[(i as usize) % dimension] = 1.0;
            vector[(i as usize * 3 + 1) % dimension] = 0.5 + (i as f32) * 1e-3;
            point(i, vector)
        })
        .collect();
    store.upsert(points).await.unwrap();
    store
}

fn config(dir: &tempfile::TempDir, dimension: usize) -> MirrorConfig {
    MirrorConfig::new("fish_text", dimension).with_index_dir(dir.path())
}

/// Store wrapper that counts scroll calls and can inject failures.
struct InstrumentedStore {
    inner: Arc<InMemoryStore>,
    scroll_limits: Mutex<Vec<usize>>,
    scroll_offsets: Mutex<Vec<Option<u64>>>,
    timeouts_left: AtomicUsize,
    fail_scrolls: AtomicBool,
    fail_retrieves: bool,
}

impl InstrumentedStore {
    fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            scroll_limits: Mutex::new(Vec::new()),
            scroll_offsets: Mutex::new(Vec::new()),
            timeouts_left: AtomicUsize::new(0),
            fail_scrolls: AtomicBool::new(false),
            fail_retrieves: false,
        }
    }

    fn with_timeouts(mut self, count: usize) -> Self {
        self.timeouts_left = AtomicUsize::new(count);
        self
    }

    fn failing_retrieves(mut self) -> Self {
        self.fail_retrieves = true;
        self
    }

    fn break_scrolls(&self) {
        self.fail_scrolls.store(true, Ordering::SeqCst);
    }

    fn scroll_calls(&self) -> usize {
        self.scroll_limits.lock().unwrap().len()
    }
}

#[async_trait]
impl VectorStore for InstrumentedStore {
    fn name(&self) -> &str {
        "instrumented"
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn metric(&self) -> DistanceMetric {
        self.inner.metric()
    }

    async fn upsert(&self, points: Vec<SpeciesPoint>) -> VectorResult<()> {
        self.inner.upsert(points).await
    }

    async fn search(&self, vector: &[f32], k: usize) -> VectorResult<Vec<ScoredSpecies>> {
        self.inner.search(vector, k).await
    }

    async fn retrieve(&self, ids: &[u64]) -> VectorResult<Vec<SpeciesPoint>> {
        if self.fail_retrieves {
            return Err(VectorError::Api("injected retrieve failure".to_string()));
        }
        self.inner.retrieve(ids).await
    }

    async fn scroll(
        &self,
        limit: usize,
        offset: Option<u64>,
    ) -> VectorResult<(Vec<ScrolledPoint>, Option<u64>)> {
        self.scroll_limits.lock().unwrap().push(limit);
        self.scroll_offsets.lock().unwrap().push(offset);

        if self.fail_scrolls.load(Ordering::SeqCst) {
            return Err(VectorError::Api("injected scroll failure".to_string()));
        }
        if self
            .timeouts_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(VectorError::Timeout("injected scroll timeout".to_string()));
        }

        self.inner.scroll(limit, offset).await
    }

    async fn count(&self) -> VectorResult<usize> {
        self.inner.count().await
    }
}

#[tokio::test]
async fn end_to_end_three_record_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new(4));
    store
        .upsert(vec![
            point(1, vec![1.0, 0.0, 0.0, 0.0]),
            point(2, vec![0.0, 1.0, 0.0, 0.0]),
            point(3, vec![0.9, 0.1, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let mirror = MirroredIndex::open(store, config(&dir, 4)).await.unwrap();
    assert_eq!(mirror.ntotal().await, 3);

    let (results, timing) = mirror.search_with_timing(&[1.0, 0.0, 0.0, 0.0], 2).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.id, 1);
    assert_eq!(results[1].0.id, 3);
    assert!(results[0].1 > results[1].1, "scores must descend");
    assert!((results[0].1 - 1.0).abs() < 1e-3, "self-query similarity should be ~1.0");

    assert_eq!(timing.results_count, 2);
    assert_eq!(timing.vectors_searched, 3);
    assert!(!timing.empty_index);
    assert!(timing.error.is_none());
    assert!(timing.total > 0.0);
}

#[tokio::test]
async fn batch_paging_indexes_every_point() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(8, 250).await;
    let cfg = config(&dir, 8).with_batch_size(100);

    let mirror = MirroredIndex::open(store.clone(), cfg).await.unwrap();

    // 250 points, batch 100: pages of 100, 100, 50
    assert_eq!(mirror.ntotal().await, 250);
    assert_eq!(mirror.ntotal().await, store.count().await.unwrap());
}

#[tokio::test]
async fn rebuild_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(8, 120).await;

    let mirror = MirroredIndex::open(store.clone(), config(&dir, 8).with_batch_size(100))
        .await
        .unwrap();
    assert_eq!(mirror.ntotal().await, 120);

    let indexed = mirror.rebuild().await.unwrap();
    assert_eq!(indexed, 120);
    assert_eq!(mirror.ntotal().await, 120);

    // Retrieval still works after the second rebuild
    let probe = store.retrieve(&[7]).await.unwrap().remove(0);
    let (results, _) = mirror.search_with_timing(&probe.vector, 1).await;
    assert_eq!(results[0].0.id, 7);
}

#[tokio::test]
async fn scroll_timeouts_halve_batch_and_retry_same_offset() {
    let dir = tempfile::tempdir().unwrap();
    let inner = seeded_store(8, 250).await;
    let store = Arc::new(InstrumentedStore::new(inner).with_timeouts(2));
    let cfg = config(&dir, 8).with_batch_size(400);

    let mirror = MirroredIndex::open(store.clone(), cfg).await.unwrap();
    assert_eq!(mirror.ntotal().await, 250);

    let limits = store.scroll_limits.lock().unwrap().clone();
    assert_eq!(&limits[..3], &[400, 200, 100], "each timeout halves the batch");

    let offsets = store.scroll_offsets.lock().unwrap().clone();
    assert_eq!(offsets[0], offsets[1], "retry must hit the same offset");
    assert_eq!(offsets[1], offsets[2]);
}

#[tokio::test]
async fn timeout_at_minimum_batch_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let inner = seeded_store(8, 50).await;
    // Enough injected timeouts to exhaust the halving ladder
    let store = Arc::new(InstrumentedStore::new(inner).with_timeouts(10));
    let cfg = config(&dir, 8).with_batch_size(200);

    let result = MirroredIndex::open(store, cfg).await;
    assert!(result.is_err(), "repeated timeouts at the floor must propagate");
}

#[tokio::test]
async fn failed_rebuild_keeps_published_index() {
    let dir = tempfile::tempdir().unwrap();
    let inner = seeded_store(8, 30).await;
    let store = Arc::new(InstrumentedStore::new(inner.clone()));

    let mirror = MirroredIndex::open(store.clone(), config(&dir, 8)).await.unwrap();
    assert_eq!(mirror.ntotal().await, 30);

    // Non-timeout failure mid-rebuild: the error propagates and the staging
    // pair is discarded
    store.break_scrolls();
    assert!(mirror.rebuild().await.is_err());

    // The previously published index still serves
    assert_eq!(mirror.ntotal().await, 30);
    let probe = inner.retrieve(&[3]).await.unwrap().remove(0);
    let (results, timing) = mirror.search_with_timing(&probe.vector, 1).await;
    assert_eq!(results[0].0.id, 3);
    assert!(timing.error.is_none());
}

#[tokio::test]
async fn unreachable_store_fails_open_loudly() {
    let dir = tempfile::tempdir().unwrap();
    let inner = seeded_store(8, 30).await;

    let store = Arc::new(InstrumentedStore::new(inner));
    store.break_scrolls();

    let result = MirroredIndex::open(store, config(&dir, 8)).await;
    assert!(result.is_err(), "construction failures must be visible");
}

#[tokio::test]
async fn empty_store_publishes_empty_index_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new(4));

    let mirror = MirroredIndex::open(store, config(&dir, 4)).await.unwrap();
    assert_eq!(mirror.ntotal().await, 0);

    let (results, timing) = mirror.search_with_timing(&[1.0, 0.0, 0.0, 0.0], 5).await;
    assert!(results.is_empty());
    assert!(timing.empty_index);
    assert!(timing.total >= 0.0);

    // No companion files for an empty rebuild
    assert!(!dir.path().join("fish_text.ivf").exists());
    assert!(!dir.path().join("fish_text.ids").exists());
}

#[tokio::test]
async fn fresh_persisted_index_is_loaded_without_rescroll() {
    let dir = tempfile::tempdir().unwrap();
    let inner = seeded_store(8, 40).await;

    {
        let store = Arc::new(InstrumentedStore::new(inner.clone()));
        let mirror = MirroredIndex::open(store, config(&dir, 8)).await.unwrap();
        assert_eq!(mirror.ntotal().await, 40);
    }

    // Second open over the same directory: counts match, no paging needed
    let store = Arc::new(InstrumentedStore::new(inner.clone()));
    let mirror = MirroredIndex::open(store.clone(), config(&dir, 8)).await.unwrap();
    assert_eq!(mirror.ntotal().await, 40);
    assert_eq!(store.scroll_calls(), 0, "a fresh persisted index must not trigger paging");

    let probe = inner.retrieve(&[11]).await.unwrap().remove(0);
    let (results, _) = mirror.search_with_timing(&probe.vector, 1).await;
    assert_eq!(results[0].0.id, 11);
}

#[tokio::test]
async fn stale_persisted_index_triggers_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let inner = seeded_store(8, 40).await;

    {
        let mirror = MirroredIndex::open(inner.clone(), config(&dir, 8)).await.unwrap();
        assert_eq!(mirror.ntotal().await, 40);
    }

    // The remote store grows behind our back
    let mut vector = vec![0.0f32; 8];
    vector[1] = 1.0;
    inner.upsert(vec![point(41, vector)]).await.unwrap();

    let store = Arc::new(InstrumentedStore::new(inner));
    let mirror = MirroredIndex::open(store.clone(), config(&dir, 8)).await.unwrap();
    assert_eq!(mirror.ntotal().await, 41);
    assert!(store.scroll_calls() > 0, "a stale index must be rebuilt by paging");
}

#[tokio::test]
async fn corrupt_companion_file_triggers_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let inner = seeded_store(8, 25).await;

    {
        let mirror = MirroredIndex::open(inner.clone(), config(&dir, 8)).await.unwrap();
        assert_eq!(mirror.ntotal().await, 25);
    }

    std::fs::write(dir.path().join("fish_text.ivf"), b"garbage").unwrap();

    let mirror = MirroredIndex::open(inner, config(&dir, 8)).await.unwrap();
    assert_eq!(mirror.ntotal().await, 25, "corrupt files heal by full rebuild");
}

#[tokio::test]
async fn retrieve_failure_is_contained_in_timing() {
    let dir = tempfile::tempdir().unwrap();
    let inner = seeded_store(8, 10).await;
    let store = Arc::new(InstrumentedStore::new(inner.clone()).failing_retrieves());

    let mirror = MirroredIndex::open(store, config(&dir, 8)).await.unwrap();
    assert_eq!(mirror.ntotal().await, 10);

    let probe = inner.retrieve(&[5]).await.unwrap().remove(0);
    let (results, timing) = mirror.search_with_timing(&probe.vector, 3).await;
    assert!(results.is_empty());
    assert!(timing.error.is_some(), "pipeline failure must be recorded, not raised");
    assert!(timing.total > 0.0);
}

#[tokio::test]
async fn remote_search_bypass_ranks_like_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(InMemoryStore::new(4));
    store
        .upsert(vec![
            point(1, vec![1.0, 0.0, 0.0, 0.0]),
            point(2, vec![0.0, 1.0, 0.0, 0.0]),
            point(3, vec![0.9, 0.1, 0.0, 0.0]),
        ])
        .await
        .unwrap();

    let mirror = MirroredIndex::open(store, config(&dir, 4)).await.unwrap();
    let (results, timing) = mirror.search_remote_with_timing(&[1.0, 0.0, 0.0, 0.0], 2).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.id, 1);
    assert_eq!(results[1].0.id, 3);
    assert_eq!(timing.results_count, 2);
    assert!(timing.error.is_none());
}

#[tokio::test]
async fn stats_report_synchronization() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded_store(8, 15).await;

    let mirror = MirroredIndex::open(store.clone(), config(&dir, 8)).await.unwrap();
    let stats = mirror.stats().await;
    assert_eq!(stats.remote_points, Some(15));
    assert_eq!(stats.local_vectors, 15);
    assert!(stats.synchronized);

    // Drift: one more remote point, stats must notice
    let mut vector = vec![0.0f32; 8];
    vector[2] = 1.0;
    store.upsert(vec![point(16, vector)]).await.unwrap();
    let stats = mirror.stats().await;
    assert_eq!(stats.remote_points, Some(16));
    assert!(!stats.synchronized);
}
