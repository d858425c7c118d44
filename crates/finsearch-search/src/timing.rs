//! Per-stage timing records for observability.

use serde::Serialize;

/// Stage-by-stage timing of one local-index search, in seconds.
///
/// Every search returns one of these, including degraded ones: an empty
/// index sets `empty_index`, a contained pipeline failure sets `error`.
/// The breakdown is the capacity-planning signal — it shows whether time
/// goes to the index scan or to the metadata fetch from the remote store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchTiming {
    /// Query encoding time, when an encoder ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<f64>,
    /// Query normalization and preparation.
    pub normalization: f64,
    /// Local index scan.
    pub index_search: f64,
    /// Slot to remote-id translation and sentinel filtering.
    pub id_mapping: f64,
    /// Bulk metadata retrieval from the remote store.
    pub metadata_fetch: f64,
    /// Result assembly in rank order.
    pub assembly: f64,
    /// End-to-end wall time, recorded on every path.
    pub total: f64,
    /// Number of results returned.
    pub results_count: usize,
    /// Vectors held by the local index when the search ran.
    pub vectors_searched: usize,
    /// Set when the search short-circuited on an empty index.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub empty_index: bool,
    /// Set when the pipeline failed; results are empty in that case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Timing of a store-side (remote-only) search, in seconds.
///
/// The remote path has no separate metadata fetch: the store returns
/// payloads with the hits.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RemoteSearchTiming {
    /// Store-side search including payload retrieval.
    pub remote_search: f64,
    /// Result assembly.
    pub assembly: f64,
    /// End-to-end wall time.
    pub total: f64,
    /// Number of results returned.
    pub results_count: usize,
    /// Set when the search failed; results are empty in that case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_omitted_when_clear() {
        let timing = SearchTiming { total: 0.25, ..Default::default() };
        let json = serde_json::to_value(&timing).unwrap();
        assert!(json.get("empty_index").is_none());
        assert!(json.get("error").is_none());
        assert!(json.get("embedding").is_none());
        assert_eq!(json["total"], 0.25);
    }

    #[test]
    fn test_flags_serialize_when_set() {
        let timing = SearchTiming {
            empty_index: true,
            error: Some("store unreachable".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&timing).unwrap();
        assert_eq!(json["empty_index"], true);
        assert_eq!(json["error"], "store unreachable");
    }
}
