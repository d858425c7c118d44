//! HTTP routes for the search service.

mod api;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/status", get(api::status))
        .route("/initialize", post(api::initialize))
        .route("/search", post(api::search))
        .route("/search/image", post(api::search_image))
        .route("/rebuild", post(api::rebuild))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
