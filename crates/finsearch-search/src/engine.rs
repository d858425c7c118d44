//! One remote collection mirrored into a local approximate index.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use finsearch_embeddings::normalize_l2;
use finsearch_index::{persist, AnnIndex, IdMap, IvfIndex, INVALID_SLOT};
use finsearch_vectors::{SpeciesRecord, VectorError, VectorStore};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::{MirrorConfig, RemoteSearchTiming, SearchError, SearchTiming};

/// Upper bound on `top_k` per search.
const MAX_TOP_K: usize = 50;

/// The index/mapping pair readers see. Replaced wholesale on rebuild, so a
/// reader never observes a half-built index.
struct Published {
    index: AnnIndex,
    map: IdMap,
}

impl Published {
    fn empty(dimension: usize) -> Self {
        Self { index: AnnIndex::empty_flat(dimension), map: IdMap::new() }
    }
}

/// Synchronization state and counts for one mirrored collection.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorStats {
    pub collection: String,
    /// Point count reported by the remote store; `None` if it could not be
    /// reached.
    pub remote_points: Option<usize>,
    pub local_vectors: usize,
    pub synchronized: bool,
    pub index_path: PathBuf,
}

/// A remote collection mirrored into an in-process approximate index.
///
/// The remote store owns all durable data; the local index is a derived,
/// rebuildable cache. On open, a persisted index is accepted only when its
/// vector count matches the remote point count — anything else (missing
/// files, corruption, staleness) triggers a full rebuild. Rebuilds page the
/// store into a staging index and publish it atomically, so concurrent
/// readers keep searching the previous index until the new one is complete.
pub struct MirroredIndex {
    store: Arc<dyn VectorStore>,
    config: MirrorConfig,
    published: RwLock<Published>,
}

impl MirroredIndex {
    /// Open the mirror: load the persisted index if it is fresh, rebuild
    /// otherwise.
    ///
    /// Remote-store errors here are construction failures and propagate;
    /// a service that cannot reach its source of truth must not start.
    pub async fn open(
        store: Arc<dyn VectorStore>,
        config: MirrorConfig,
    ) -> Result<Self, SearchError> {
        let remote_count = store.count().await?;

        let mirror = Self {
            published: RwLock::new(Published::empty(config.dimension)),
            store,
            config,
        };

        match persist::load(&mirror.config.index_dir, &mirror.config.collection) {
            Ok((index, map))
                if index.ntotal() == remote_count
                    && index.dimension() == mirror.config.dimension =>
            {
                info!(
                    collection = %mirror.config.collection,
                    vectors = remote_count,
                    "loaded persisted index, in sync with remote store"
                );
                *mirror.published.write().await = Published { index, map };
            }
            Ok((index, _)) => {
                info!(
                    collection = %mirror.config.collection,
                    local = index.ntotal(),
                    remote = remote_count,
                    "persisted index is stale, rebuilding"
                );
                mirror.rebuild().await?;
            }
            Err(reason) => {
                info!(
                    collection = %mirror.config.collection,
                    %reason,
                    "no usable persisted index, rebuilding from remote store"
                );
                mirror.rebuild().await?;
            }
        }

        Ok(mirror)
    }

    /// The mirror configuration.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Number of vectors in the published local index.
    pub async fn ntotal(&self) -> usize {
        self.published.read().await.index.ntotal()
    }

    /// Full rebuild from the remote store.
    ///
    /// Pages through all points, trains the IVF quantizer once on the first
    /// non-empty batch, and extends the staging index/mapping with
    /// monotonically increasing slots. Scroll timeouts halve the batch size
    /// (down to [`MirrorConfig::MIN_BATCH_SIZE`]) and retry the same
    /// offset; any other error aborts, discarding the staging pair and
    /// leaving the published index untouched. A complete pass persists the
    /// companion files and publishes the new pair in one swap — unless the
    /// store was empty, in which case an empty exact index is published and
    /// nothing is written (an empty artifact must not look like a finished
    /// rebuild).
    ///
    /// Returns the number of vectors indexed.
    pub async fn rebuild(&self) -> Result<usize, SearchError> {
        info!(collection = %self.config.collection, "rebuilding local index from remote store");

        let mut staging: Option<AnnIndex> = None;
        let mut map = IdMap::new();
        let mut batch_size = self.config.batch_size;
        let mut offset: Option<u64> = None;
        let mut indexed = 0usize;

        loop {
            let (points, next_offset) = match self.store.scroll(batch_size, offset).await {
                Ok(page) => page,
                Err(VectorError::Timeout(reason)) => {
                    let halved = (batch_size / 2).max(MirrorConfig::MIN_BATCH_SIZE);
                    if halved < batch_size {
                        warn!(
                            %reason,
                            from = batch_size,
                            to = halved,
                            "scroll timed out, retrying offset with smaller batch"
                        );
                        batch_size = halved;
                        continue;
                    }
                    error!(%reason, batch = batch_size, "scroll timed out at minimum batch size, aborting rebuild");
                    return Err(VectorError::Timeout(reason).into());
                }
                Err(e) => {
                    error!(
                        collection = %self.config.collection,
                        error = %e,
                        "rebuild aborted, keeping previously published index"
                    );
                    return Err(e.into());
                }
            };

            let mut vectors = Vec::new();
            let mut ids = Vec::new();
            for point in points {
                // Points without a vector cannot be indexed; skip them
                let Some(mut vector) = point.vector else { continue };
                normalize_l2(&mut vector);
                vectors.push(vector);
                ids.push(point.id);
            }

            if !vectors.is_empty() {
                // Train once, on the first non-empty batch
                let index = staging.get_or_insert_with(|| {
                    let mut ivf =
                        IvfIndex::new(self.config.dimension, self.config.nlist, self.config.nprobe);
                    match ivf.train(&vectors) {
                        Ok(()) => AnnIndex::Ivf(ivf),
                        Err(e) => {
                            warn!(error = %e, "quantizer training failed, falling back to exact index");
                            AnnIndex::empty_flat(self.config.dimension)
                        }
                    }
                });

                index.add(&vectors)?;
                for id in ids {
                    map.record(map.len() as u32, id)?;
                }
                indexed += vectors.len();
                debug!(batch = vectors.len(), total = indexed, "indexed batch");
            }

            match next_offset {
                Some(_) => offset = next_offset,
                None => break,
            }
        }

        let index = match staging {
            Some(index) => {
                persist::save(&self.config.index_dir, &self.config.collection, &index, &map)?;
                info!(
                    collection = %self.config.collection,
                    vectors = indexed,
                    "rebuild complete, index and mapping persisted"
                );
                index
            }
            None => {
                info!(
                    collection = %self.config.collection,
                    "remote store is empty, publishing empty exact index without persisting"
                );
                AnnIndex::empty_flat(self.config.dimension)
            }
        };

        *self.published.write().await = Published { index, map };
        Ok(indexed)
    }

    /// Execute one similarity query end to end, timing every stage.
    ///
    /// Never fails: pipeline errors are logged, recorded in the timing, and
    /// returned as an empty result list. The caller decides how to present
    /// a degraded response.
    pub async fn search_with_timing(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> (Vec<(SpeciesRecord, f32)>, SearchTiming) {
        let top_k = top_k.clamp(1, MAX_TOP_K);
        let mut timing = SearchTiming::default();
        let total_start = Instant::now();

        let published = self.published.read().await;
        timing.vectors_searched = published.index.ntotal();

        if published.index.ntotal() == 0 {
            timing.empty_index = true;
            timing.total = total_start.elapsed().as_secs_f64();
            return (Vec::new(), timing);
        }

        let outcome = self.run_pipeline(&published, query, top_k, &mut timing).await;
        timing.total = total_start.elapsed().as_secs_f64();

        match outcome {
            Ok(results) => {
                timing.results_count = results.len();
                (results, timing)
            }
            Err(e) => {
                error!(
                    collection = %self.config.collection,
                    error = %e,
                    "search pipeline failed, returning empty results"
                );
                timing.error = Some(e.to_string());
                (Vec::new(), timing)
            }
        }
    }

    async fn run_pipeline(
        &self,
        published: &Published,
        query: &[f32],
        top_k: usize,
        timing: &mut SearchTiming,
    ) -> Result<Vec<(SpeciesRecord, f32)>, SearchError> {
        // 1. Normalization: inner product over unit vectors is cosine
        let start = Instant::now();
        let mut prepared = query.to_vec();
        normalize_l2(&mut prepared);
        timing.normalization = start.elapsed().as_secs_f64();

        // 2. Local index search
        let start = Instant::now();
        let hits = published.index.search(&prepared, top_k)?;
        timing.index_search = start.elapsed().as_secs_f64();

        // 3. Slot translation, dropping sentinels and unmapped slots
        let start = Instant::now();
        let mut ranked: Vec<(u64, f32)> = Vec::with_capacity(hits.len());
        for (slot, score) in hits {
            if slot == INVALID_SLOT {
                continue;
            }
            if let Some(id) = published.map.remote_id_for(slot as u32) {
                ranked.push((id, score));
            }
        }
        timing.id_mapping = start.elapsed().as_secs_f64();

        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        // 4. Bulk metadata fetch
        let start = Instant::now();
        let ids: Vec<u64> = ranked.iter().map(|&(id, _)| id).collect();
        let points = self.store.retrieve(&ids).await?;
        timing.metadata_fetch = start.elapsed().as_secs_f64();

        // 5. Assembly, preserving the index's rank order (the bulk fetch
        //    may return points in any order)
        let start = Instant::now();
        let mut by_id: HashMap<u64, SpeciesRecord> =
            points.into_iter().map(|p| (p.id, p.species)).collect();
        let results = ranked
            .into_iter()
            .filter_map(|(id, score)| by_id.remove(&id).map(|species| (species, score)))
            .collect();
        timing.assembly = start.elapsed().as_secs_f64();

        Ok(results)
    }

    /// Store-side search bypassing the local index, with its own timing.
    ///
    /// Kept for benchmarking the local index against the remote store's
    /// built-in search; same containment contract as
    /// [`MirroredIndex::search_with_timing`].
    pub async fn search_remote_with_timing(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> (Vec<(SpeciesRecord, f32)>, RemoteSearchTiming) {
        let top_k = top_k.clamp(1, MAX_TOP_K);
        let mut timing = RemoteSearchTiming::default();
        let total_start = Instant::now();

        let start = Instant::now();
        let hits = match self.store.search(query, top_k).await {
            Ok(hits) => hits,
            Err(e) => {
                error!(
                    collection = %self.config.collection,
                    error = %e,
                    "remote search failed, returning empty results"
                );
                timing.error = Some(e.to_string());
                timing.total = total_start.elapsed().as_secs_f64();
                return (Vec::new(), timing);
            }
        };
        timing.remote_search = start.elapsed().as_secs_f64();

        let start = Instant::now();
        let results: Vec<(SpeciesRecord, f32)> =
            hits.into_iter().map(|hit| (hit.species, hit.score)).collect();
        timing.assembly = start.elapsed().as_secs_f64();

        timing.results_count = results.len();
        timing.total = total_start.elapsed().as_secs_f64();
        (results, timing)
    }

    /// Current synchronization state and counts.
    ///
    /// An unreachable store degrades to `remote_points: None` rather than
    /// failing — the status endpoint must keep answering.
    pub async fn stats(&self) -> MirrorStats {
        let local_vectors = self.ntotal().await;
        let remote_points = match self.store.count().await {
            Ok(count) => Some(count),
            Err(e) => {
                warn!(
                    collection = %self.config.collection,
                    error = %e,
                    "failed to read remote point count"
                );
                None
            }
        };

        MirrorStats {
            collection: self.config.collection.clone(),
            remote_points,
            local_vectors,
            synchronized: remote_points == Some(local_vectors),
            index_path: persist::index_path(&self.config.index_dir, &self.config.collection),
        }
    }
}
