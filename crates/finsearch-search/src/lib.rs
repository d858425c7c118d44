//! # Finsearch Search
//!
//! The engine room of finsearch: keeps the in-process approximate index
//! faithful to the remote vector store and serves similarity queries over
//! it with a per-stage timing breakdown.
//!
//! Two layers live here:
//!
//! - [`MirroredIndex`] — one remote collection mirrored into a local
//!   [`finsearch_index::AnnIndex`]. Handles the load-or-rebuild consistency
//!   protocol at startup, full rebuilds by paging the store, persistence of
//!   the index/mapping companion files, and the timed search pipeline.
//! - [`SearchService`] — the mode-aware router: resolves each request
//!   against the process's operating mode, obtains a query vector (real
//!   encoder or labeled random fallback), and dispatches to the right
//!   collection's mirror.
//!
//! Errors during construction and initialization propagate — a service that
//! cannot reach its store must fail loudly at startup. Errors inside a
//! single search are contained: the request gets an empty result list and a
//! timing record carrying the error, never a panic.

mod config;
mod engine;
mod mode;
mod service;
mod timing;

use thiserror::Error;

pub use config::MirrorConfig;
pub use engine::{MirrorStats, MirroredIndex};
pub use mode::{OperatingMode, RequestedMode};
pub use service::{
    QueryInput, SearchRequest, SearchResponse, SearchService, ServiceFactory, SpeciesHit,
};
pub use timing::{RemoteSearchTiming, SearchTiming};

use finsearch_embeddings::EmbeddingError;
use finsearch_index::IndexError;
use finsearch_vectors::VectorError;

/// Errors from the search layer.
///
/// `NotInitialized` and `NotAvailable` are request-level conditions the
/// serving boundary maps to "service unavailable"; the transparent variants
/// wrap the lower layers' taxonomies.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Service is not initialized; call initialize first")]
    NotInitialized,

    #[error("Requested capability is not available: {0}")]
    NotAvailable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] VectorError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;
