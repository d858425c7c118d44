//! # Finsearch Index
//!
//! In-process approximate nearest-neighbor index over normalized embedding
//! vectors, rebuildable from scratch from the remote store.
//!
//! The workhorse is [`IvfIndex`], an inverted-file flat index: vectors are
//! partitioned into `nlist` coarse clusters by k-means, and a query only
//! scans the `nprobe` clusters nearest to it, trading recall for speed.
//! [`FlatIndex`] is the exact brute-force fallback that is always valid to
//! query and to grow, even with zero vectors — it is what gets published
//! when there is nothing to train on, so startup never fails on an empty
//! or unreachable store.
//!
//! [`IdMap`] carries the bijection between local slots and remote point
//! ids, and [`persist`] writes index and mapping to a pair of companion
//! files that are only ever read or written together.
//!
//! ```rust
//! use finsearch_index::IvfIndex;
//!
//! let mut index = IvfIndex::new(4, 16, 3);
//! index.train(&[vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]]).unwrap();
//! index.add(&[vec![1.0, 0.0, 0.0, 0.0], vec![0.0, 1.0, 0.0, 0.0]]).unwrap();
//!
//! let hits = index.search(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();
//! assert_eq!(hits[0].0, 0); // slot of the first added vector
//! ```

mod flat;
mod ivf;
mod kmeans;
mod mapping;
pub mod persist;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use flat::FlatIndex;
pub use ivf::IvfIndex;
pub use kmeans::train_centroids;
pub use mapping::IdMap;

/// Slot sentinel for unfilled search results, mirroring the FAISS
/// convention. Callers filter these out.
pub const INVALID_SLOT: i64 = -1;

/// Errors from the local index layer.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Index must be trained before adding vectors")]
    NotTrained,

    #[error("Cannot train on an empty sample set")]
    EmptyTraining,

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Slot {0} is already mapped")]
    DuplicateSlot(u32),

    #[error("Remote id {0} is already mapped")]
    DuplicateId(u64),

    #[error("Persisted index is corrupt or inconsistent: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// The published local index: approximate when trained, exact otherwise.
///
/// The flat variant exists for the degenerate cases (zero vectors in the
/// remote store, training failure): it is always safe to query and to add
/// to, so the serving path never has to special-case a missing index.
#[derive(Debug, Serialize, Deserialize)]
pub enum AnnIndex {
    Ivf(IvfIndex),
    Flat(FlatIndex),
}

impl AnnIndex {
    /// An empty exact index of the given dimension.
    pub fn empty_flat(dimension: usize) -> Self {
        AnnIndex::Flat(FlatIndex::new(dimension))
    }

    /// Number of indexed vectors.
    pub fn ntotal(&self) -> usize {
        match self {
            AnnIndex::Ivf(index) => index.ntotal(),
            AnnIndex::Flat(index) => index.ntotal(),
        }
    }

    /// Vector dimension.
    pub fn dimension(&self) -> usize {
        match self {
            AnnIndex::Ivf(index) => index.dimension(),
            AnnIndex::Flat(index) => index.dimension(),
        }
    }

    /// Append vectors in insertion order; the i-th vector of this call gets
    /// slot `previous_ntotal + i`.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> IndexResult<()> {
        match self {
            AnnIndex::Ivf(index) => index.add(vectors),
            AnnIndex::Flat(index) => index.add(vectors),
        }
    }

    /// Top-k search by inner product.
    ///
    /// Returns exactly `k` `(slot, score)` pairs ordered by descending
    /// score, padded with [`INVALID_SLOT`] sentinels when fewer results are
    /// reachable. Never fails on an empty index.
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<(i64, f32)>> {
        match self {
            AnnIndex::Ivf(index) => index.search(query, k),
            AnnIndex::Flat(index) => index.search(query, k),
        }
    }
}

/// Produce the padded top-k list from scored candidate slots.
///
/// Shared by both index variants. Ties on score resolve to the lower slot,
/// which is the insertion order.
pub(crate) fn rank_candidates(
    candidates: impl Iterator<Item = (u32, f32)>,
    k: usize,
) -> Vec<(i64, f32)> {
    let mut scored: Vec<(u32, f32)> = candidates.collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let mut results: Vec<(i64, f32)> = scored
        .into_iter()
        .take(k)
        .map(|(slot, score)| (slot as i64, score))
        .collect();
    results.resize(k, (INVALID_SLOT, f32::NEG_INFINITY));
    results
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
