//! Qdrant vector database adapter.
//!
//! The production backend: [Qdrant](https://qdrant.tech/) holds every
//! species embedding and payload, and is the single source of truth the
//! local approximate index is rebuilt from.
//!
//! # Feature Flag
//!
//! This module requires the `qdrant` feature (enabled by default):
//! ```toml
//! finsearch-vectors = { version = "0.1", features = ["qdrant"] }
//! ```

use crate::{
    DistanceMetric, ScoredSpecies, ScrolledPoint, SpeciesPoint, SpeciesRecord, VectorError,
    VectorResult, VectorStore,
};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, vectors_output::VectorsOptions, CreateCollectionBuilder, Distance,
    GetPointsBuilder, PointId, PointStruct, ScrollPointsBuilder, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::time::Duration;

/// Qdrant vector database adapter for one species collection.
pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
    metric: DistanceMetric,
}

impl QdrantStore {
    /// Connect to a Qdrant server and ensure the collection exists.
    ///
    /// Connectivity and authentication failures here are construction-time
    /// errors: the caller is expected to abort startup rather than serve
    /// with no authoritative store.
    pub async fn connect(
        url: &str,
        api_key: Option<&str>,
        collection: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> VectorResult<Self> {
        let mut builder = Qdrant::from_url(url).timeout(Duration::from_secs(30));
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(|e| VectorError::Connection(e.to_string()))?;

        let store = Self {
            client,
            collection: collection.to_string(),
            dimension,
            metric,
        };

        // Ensure collection exists
        store.ensure_collection().await?;

        Ok(store)
    }

    /// Ensure the collection exists, creating it if necessary.
    async fn ensure_collection(&self) -> VectorResult<()> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| VectorError::Connection(e.to_string()))?;

        let exists = collections.collections.iter().any(|c| c.name == self.collection);

        if !exists {
            let distance = match self.metric {
                DistanceMetric::Cosine => Distance::Cosine,
                DistanceMetric::Euclidean => Distance::Euclid,
                DistanceMetric::DotProduct => Distance::Dot,
            };

            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(self.dimension as u64, distance)),
                )
                .await
                .map_err(|e| VectorError::Collection(e.to_string()))?;
        }

        Ok(())
    }

    /// Classify a client error, keeping timeouts distinct so the rebuild's
    /// batch-halving retry can key on them.
    fn classify(err: impl std::fmt::Display) -> VectorError {
        let text = err.to_string();
        let lower = text.to_lowercase();
        if lower.contains("timeout") || lower.contains("deadline") {
            VectorError::Timeout(text)
        } else {
            VectorError::Api(text)
        }
    }

    /// Convert a species record to a Qdrant payload.
    fn to_payload(species: &SpeciesRecord) -> VectorResult<HashMap<String, qdrant_client::qdrant::Value>> {
        let value = serde_json::to_value(species)
            .map_err(|e| VectorError::Serialization(e.to_string()))?;
        let serde_json::Value::Object(map) = value else {
            return Err(VectorError::Serialization("species payload is not an object".into()));
        };

        Ok(map
            .into_iter()
            .filter_map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => qdrant_client::qdrant::Value::from(s),
                    serde_json::Value::Number(n) => {
                        if let Some(i) = n.as_i64() {
                            qdrant_client::qdrant::Value::from(i)
                        } else if let Some(f) = n.as_f64() {
                            qdrant_client::qdrant::Value::from(f)
                        } else {
                            return None;
                        }
                    }
                    serde_json::Value::Bool(b) => qdrant_client::qdrant::Value::from(b),
                    _ => return None,
                };
                Some((k, value))
            })
            .collect())
    }

    /// Convert a Qdrant payload back into a species record.
    fn from_payload(
        payload: &HashMap<String, qdrant_client::qdrant::Value>,
    ) -> VectorResult<SpeciesRecord> {
        use qdrant_client::qdrant::value::Kind;

        let map: serde_json::Map<String, serde_json::Value> = payload
            .iter()
            .filter_map(|(k, v)| {
                let value = match &v.kind {
                    Some(Kind::StringValue(s)) => serde_json::Value::String(s.clone()),
                    Some(Kind::IntegerValue(i)) => serde_json::json!(*i),
                    Some(Kind::DoubleValue(f)) => serde_json::json!(*f),
                    Some(Kind::BoolValue(b)) => serde_json::Value::Bool(*b),
                    _ => return None,
                };
                Some((k.clone(), value))
            })
            .collect();

        serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| VectorError::Serialization(e.to_string()))
    }

    /// Extract a numeric id from a Qdrant point id.
    fn numeric_id(id: &Option<PointId>) -> Option<u64> {
        match id {
            Some(PointId { point_id_options: Some(PointIdOptions::Num(n)) }) => Some(*n),
            _ => None,
        }
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn name(&self) -> &str {
        "qdrant"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn upsert(&self, points: Vec<SpeciesPoint>) -> VectorResult<()> {
        let points: Vec<PointStruct> = points
            .iter()
            .map(|point| {
                Ok(PointStruct::new(
                    point.id,
                    point.vector.clone(),
                    Self::to_payload(&point.species)?,
                ))
            })
            .collect::<VectorResult<_>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
            .await
            .map_err(Self::classify)?;

        Ok(())
    }

    async fn search(&self, vector: &[f32], k: usize) -> VectorResult<Vec<ScoredSpecies>> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let response = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector.to_vec(), k as u64)
                    .with_payload(true),
            )
            .await
            .map_err(Self::classify)?;

        response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = Self::numeric_id(&point.id)?;
                Some(Self::from_payload(&point.payload).map(|species| ScoredSpecies {
                    id,
                    score: point.score,
                    species,
                }))
            })
            .collect()
    }

    async fn retrieve(&self, ids: &[u64]) -> VectorResult<Vec<SpeciesPoint>> {
        let point_ids: Vec<PointId> = ids.iter().map(|&id| PointId::from(id)).collect();

        let response = self
            .client
            .get_points(
                GetPointsBuilder::new(&self.collection, point_ids)
                    .with_payload(true)
                    .with_vectors(true),
            )
            .await
            .map_err(Self::classify)?;

        response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = Self::numeric_id(&point.id)?;
                let vector = point
                    .vectors
                    .and_then(|v| match v.vectors_options {
                        Some(VectorsOptions::Vector(vec)) => Some(vec.data),
                        _ => None,
                    })
                    .unwrap_or_default();
                Some(
                    Self::from_payload(&point.payload)
                        .map(|species| SpeciesPoint { id, vector, species }),
                )
            })
            .collect()
    }

    async fn scroll(
        &self,
        limit: usize,
        offset: Option<u64>,
    ) -> VectorResult<(Vec<ScrolledPoint>, Option<u64>)> {
        let mut builder = ScrollPointsBuilder::new(&self.collection)
            .limit(limit as u32)
            .with_payload(false)
            .with_vectors(true);
        if let Some(offset) = offset {
            builder = builder.offset(PointId::from(offset));
        }

        let response = self.client.scroll(builder).await.map_err(Self::classify)?;

        let points = response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = Self::numeric_id(&point.id)?;
                let vector = point.vectors.and_then(|v| match v.vectors_options {
                    Some(VectorsOptions::Vector(vec)) => Some(vec.data),
                    _ => None,
                });
                Some(ScrolledPoint { id, vector })
            })
            .collect();

        let next_offset = response
            .next_page_offset
            .as_ref()
            .and_then(|id| match &id.point_id_options {
                Some(PointIdOptions::Num(n)) => Some(*n),
                _ => None,
            });

        Ok((points, next_offset))
    }

    async fn count(&self) -> VectorResult<usize> {
        let info = self
            .client
            .collection_info(&self.collection)
            .await
            .map_err(Self::classify)?;

        Ok(info
            .result
            .map(|r| r.points_count.unwrap_or(0) as usize)
            .unwrap_or(0))
    }
}
