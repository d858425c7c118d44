//! API-based encoders.
//!
//! Deployments that run the real embedding models do so behind an HTTP
//! embedding service; these types are the client side of that seam.
//! Requires the `api` feature.

use crate::{Embedder, EmbeddingError, EmbeddingResult, ImageEncoder};
use serde::{Deserialize, Serialize};

/// Configuration for an API-based encoder.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Service endpoint URL.
    pub endpoint: String,
    /// Bearer token, if the service requires one.
    pub api_key: Option<String>,
    /// Model name passed through to the service.
    pub model: String,
    /// Embedding dimension the service returns.
    pub dimension: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Create a config for an OpenAI-compatible embeddings endpoint.
    pub fn new(endpoint: &str, model: &str, dimension: usize) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: None,
            model: model.to_string(),
            dimension,
            timeout_secs: 30,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Text embedder backed by an OpenAI-compatible embeddings endpoint.
pub struct ApiEmbedder {
    config: ApiConfig,
    client: reqwest::blocking::Client,
}

impl ApiEmbedder {
    /// Create a new API embedder with the given config.
    pub fn new(config: ApiConfig) -> EmbeddingResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ApiError(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}

impl Embedder for ApiEmbedder {
    fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let results = self.embed_batch(&[text])?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::ApiError("No embedding returned".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let request = EmbeddingsRequest {
            model: self.config.model.clone(),
            input: texts.iter().map(|s| s.to_string()).collect(),
        };

        let response = self
            .authorize(self.client.post(&self.config.endpoint))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .map_err(|e| EmbeddingError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::ApiError(format!(
                "Embedding API error {}: {}",
                status, body
            )));
        }

        let resp: EmbeddingsResponse = response
            .json()
            .map_err(|e| EmbeddingError::ApiError(e.to_string()))?;

        Ok(resp.data.into_iter().map(|e| e.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Deserialize)]
struct ImageEmbeddingResponse {
    embedding: Vec<f32>,
}

/// Image encoder backed by an embedding service accepting raw image bytes.
pub struct ApiImageEncoder {
    config: ApiConfig,
    client: reqwest::blocking::Client,
}

impl ApiImageEncoder {
    /// Create a new API image encoder with the given config.
    pub fn new(config: ApiConfig) -> EmbeddingResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ApiError(e.to_string()))?;

        Ok(Self { config, client })
    }
}

impl ImageEncoder for ApiImageEncoder {
    fn encode(&self, image: &[u8]) -> EmbeddingResult<Vec<f32>> {
        if image.is_empty() {
            return Err(EmbeddingError::InvalidInput("Empty image".to_string()));
        }

        let mut request = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/octet-stream")
            .body(image.to_vec());
        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .map_err(|e| EmbeddingError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::ApiError(format!(
                "Image encoder error {}: {}",
                status, body
            )));
        }

        let resp: ImageEmbeddingResponse = response
            .json()
            .map_err(|e| EmbeddingError::ApiError(e.to_string()))?;

        Ok(resp.embedding)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
