//! Mirror configuration.

use std::path::PathBuf;

/// Configuration for mirroring one remote collection into a local index.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Remote collection name; also names the persisted companion files.
    pub collection: String,
    /// Vector dimension of the collection.
    pub dimension: usize,
    /// Coarse clusters for the IVF index (clamped to the training sample).
    pub nlist: usize,
    /// Clusters scanned per query.
    pub nprobe: usize,
    /// Scroll page size for rebuilds; halved on timeouts down to
    /// [`MirrorConfig::MIN_BATCH_SIZE`].
    pub batch_size: usize,
    /// Directory holding the persisted index and mapping files.
    pub index_dir: PathBuf,
}

impl MirrorConfig {
    /// Floor for the timeout-halving retry during rebuilds.
    pub const MIN_BATCH_SIZE: usize = 100;

    /// Create a config with the default tuning for a collection.
    pub fn new(collection: impl Into<String>, dimension: usize) -> Self {
        Self {
            collection: collection.into(),
            dimension,
            nlist: 256,
            nprobe: 3,
            batch_size: 1000,
            index_dir: PathBuf::from("."),
        }
    }

    /// Set the index directory.
    pub fn with_index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.index_dir = dir.into();
        self
    }

    /// Set the IVF cluster count.
    pub fn with_nlist(mut self, nlist: usize) -> Self {
        self.nlist = nlist;
        self
    }

    /// Set the clusters scanned per query.
    pub fn with_nprobe(mut self, nprobe: usize) -> Self {
        self.nprobe = nprobe;
        self
    }

    /// Set the rebuild scroll page size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(Self::MIN_BATCH_SIZE);
        self
    }
}
