//! Species metadata stored as point payloads in the remote store.

use serde::{Deserialize, Serialize};

/// One fish species entry: identity, taxonomy and free-text description.
///
/// Records are created during bulk ingestion and immutable afterwards. The
/// remote store holds the only durable copy; the rest of the system treats
/// them as read-only payloads attached to embedding vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    /// Remote point id, assigned at ingestion time.
    pub id: u64,
    /// Display name; the source dataset uses synthetic `Genus_species` names.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,
    /// Free text used both for semantic embedding and for display.
    #[serde(default)]
    pub full_description: String,
    /// Set only for image-derived records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl SpeciesRecord {
    /// Create a record with just an id and a name.
    pub fn named(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            genus: None,
            species: None,
            common_name: None,
            full_description: String::new(),
            image_path: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.full_description = description.into();
        self
    }

    /// Set the image path.
    pub fn with_image_path(mut self, path: impl Into<String>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    /// Build a record from a synthetic dataset name like
    /// `Aaptosyax_grypus_giant_salmon_carp`.
    ///
    /// The first underscore-separated part is the genus, the second the
    /// species epithet, anything after that the common name.
    pub fn parse_name(id: u64, raw_name: &str) -> Self {
        let mut record = Self::named(id, raw_name);
        let parts: Vec<&str> = raw_name.split('_').collect();
        if parts.len() >= 2 {
            record.genus = Some(parts[0].to_string());
            record.species = Some(parts[1].to_string());
            if parts.len() > 2 {
                record.common_name = Some(parts[2..].join("_"));
            }
        } else {
            record.genus = Some(raw_name.to_string());
        }
        record
    }

    /// Description truncated to `max_chars` characters for API responses.
    pub fn truncated_description(&self, max_chars: usize) -> String {
        if self.full_description.chars().count() <= max_chars {
            return self.full_description.clone();
        }
        let truncated: String = self.full_description.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }

    /// Scientific name, when both taxonomy parts are present.
    pub fn scientific_name(&self) -> Option<String> {
        match (&self.genus, &self.species) {
            (Some(g), Some(s)) => Some(format!("{} {}", g, s)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_full() {
        let record = SpeciesRecord::parse_name(3, "Aaptosyax_grypus_giant_salmon_carp");
        assert_eq!(record.genus.as_deref(), Some("Aaptosyax"));
        assert_eq!(record.species.as_deref(), Some("grypus"));
        assert_eq!(record.common_name.as_deref(), Some("giant_salmon_carp"));
        assert_eq!(record.scientific_name().as_deref(), Some("Aaptosyax grypus"));
    }

    #[test]
    fn test_parse_name_bare() {
        let record = SpeciesRecord::parse_name(1, "Latimeria");
        assert_eq!(record.genus.as_deref(), Some("Latimeria"));
        assert!(record.species.is_none());
        assert!(record.common_name.is_none());
    }

    #[test]
    fn test_truncated_description() {
        let record = SpeciesRecord::named(1, "x").with_description("a".repeat(300));
        let truncated = record.truncated_description(200);
        assert_eq!(truncated.chars().count(), 203); // 200 chars + "..."
        assert!(truncated.ends_with("..."));

        let short = SpeciesRecord::named(2, "y").with_description("short");
        assert_eq!(short.truncated_description(200), "short");
    }

    #[test]
    fn test_payload_roundtrip() {
        let record = SpeciesRecord::parse_name(9, "Esox_lucius_northern_pike")
            .with_description("Elongated predatory freshwater fish");
        let value = serde_json::to_value(&record).unwrap();
        let back: SpeciesRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
