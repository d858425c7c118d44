//! REST API endpoints for the search service.

use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use finsearch_search::{
    MirrorStats, OperatingMode, QueryInput, RequestedMode, SearchError, SearchRequest,
    SearchResponse,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Error body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Wrapper mapping search-layer errors to HTTP statuses.
pub struct ApiError(SearchError);

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SearchError::NotInitialized | SearchError::NotAvailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            SearchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

fn bad_request(message: String) -> ApiError {
    ApiError(SearchError::InvalidRequest(message))
}

/// Liveness check.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "finsearch",
    }))
}

/// Aggregate status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: String,
    pub mode: OperatingMode,
    pub database_loaded: bool,
    pub encoder_loaded: bool,
    pub fish_count: usize,
    pub index_synchronized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<MirrorStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<MirrorStats>,
}

/// Current mode, counts and synchronization state.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.service.status().await;

    let database_loaded = status.text.is_some() || status.image.is_some();
    let fish_count = status
        .text
        .as_ref()
        .and_then(|s| s.remote_points)
        .or_else(|| status.image.as_ref().and_then(|s| s.remote_points))
        .unwrap_or(0);
    let index_synchronized = database_loaded
        && [status.text.as_ref(), status.image.as_ref()]
            .into_iter()
            .flatten()
            .all(|s| s.synchronized);

    let message = match status.mode {
        OperatingMode::None => "Service not initialized; POST /initialize first".to_string(),
        mode => format!("Running in {} mode", mode),
    };

    Json(StatusResponse {
        message,
        mode: status.mode,
        database_loaded,
        encoder_loaded: status.text_encoder_loaded || status.image_encoder_loaded,
        fish_count,
        index_synchronized,
        text: status.text,
        image: status.image,
    })
}

/// Initialize request body.
#[derive(Debug, Deserialize)]
pub struct InitializeRequest {
    pub mode: String,
}

/// Initialize response.
#[derive(Debug, Serialize)]
pub struct InitializeResponse {
    pub message: String,
    pub mode: OperatingMode,
}

/// Set the operating mode.
pub async fn initialize(
    State(state): State<AppState>,
    Json(req): Json<InitializeRequest>,
) -> Result<Json<InitializeResponse>, ApiError> {
    let mode = OperatingMode::from_str(&req.mode).map_err(bad_request)?;
    state.service.initialize(mode).await?;

    Ok(Json(InitializeResponse {
        message: format!("System initialized in {} mode", mode),
        mode,
    }))
}

fn default_top_k() -> usize {
    5
}

fn default_mode() -> String {
    "auto".to_string()
}

/// Text search request body.
#[derive(Debug, Deserialize)]
pub struct TextSearchRequest {
    pub description: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_mode")]
    pub mode: String,
}

/// Search by text description.
pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<TextSearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let mode = RequestedMode::from_str(&req.mode).map_err(bad_request)?;

    let response = state
        .service
        .search(SearchRequest {
            query: QueryInput::Text(req.description),
            top_k: req.top_k,
            mode,
        })
        .await?;

    Ok(Json(response))
}

/// Query parameters for the image search endpoint.
#[derive(Debug, Deserialize)]
pub struct ImageSearchParams {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_mode")]
    pub mode: String,
}

/// Search by photograph; the request body is the raw image.
pub async fn search_image(
    State(state): State<AppState>,
    Query(params): Query<ImageSearchParams>,
    body: Bytes,
) -> Result<Json<SearchResponse>, ApiError> {
    if body.is_empty() {
        return Err(bad_request("image body must not be empty".to_string()));
    }
    let mode = RequestedMode::from_str(&params.mode).map_err(bad_request)?;

    let response = state
        .service
        .search(SearchRequest {
            query: QueryInput::Image(body.to_vec()),
            top_k: params.top_k,
            mode,
        })
        .await?;

    Ok(Json(response))
}

/// Rebuild response.
#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub message: String,
    pub collections: Vec<RebuildReport>,
}

#[derive(Debug, Serialize)]
pub struct RebuildReport {
    pub collection: String,
    pub vectors_indexed: usize,
}

/// Force a full resync of every loaded collection.
pub async fn rebuild(State(state): State<AppState>) -> Result<Json<RebuildResponse>, ApiError> {
    let report = state.service.rebuild().await?;

    Ok(Json(RebuildResponse {
        message: format!("Rebuilt {} collection(s)", report.len()),
        collections: report
            .into_iter()
            .map(|(collection, vectors_indexed)| RebuildReport { collection, vectors_indexed })
            .collect(),
    }))
}
