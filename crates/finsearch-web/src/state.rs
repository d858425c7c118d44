//! Application state for the web server.

use finsearch_search::SearchService;
use std::sync::Arc;

/// Shared application state.
///
/// The search service is `Send + Sync` and internally locked, so the state
/// is a plain handle cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SearchService>,
}

impl AppState {
    /// Wrap a service for the router.
    pub fn new(service: SearchService) -> Self {
        Self { service: Arc::new(service) }
    }
}
