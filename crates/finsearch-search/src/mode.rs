//! Operating modes and request-time mode resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Process-wide operating mode.
///
/// Set once per session by an explicit initialize call, read by every
/// request afterwards; never reverts on its own. The mode determines which
/// collections are mirrored and which encoders are loaded:
///
/// | mode | text coll. | image coll. | encoders |
/// |---|---|---|---|
/// | `none` | – | – | – |
/// | `low_resources` | yes | – | none (random vectors) |
/// | `high_resources` | yes | yes | text + image |
/// | `low_res_pic` | yes | yes | none (random vectors) |
/// | `random_pic` | – | yes | none (random vectors) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    None,
    LowResources,
    HighResources,
    LowResPic,
    RandomPic,
}

impl OperatingMode {
    /// Whether this mode mirrors the text collection.
    pub fn uses_text_collection(self) -> bool {
        matches!(
            self,
            OperatingMode::LowResources | OperatingMode::HighResources | OperatingMode::LowResPic
        )
    }

    /// Whether this mode mirrors the image collection.
    pub fn uses_image_collection(self) -> bool {
        matches!(
            self,
            OperatingMode::HighResources | OperatingMode::LowResPic | OperatingMode::RandomPic
        )
    }

    /// Whether this mode runs a real text encoder.
    pub fn loads_text_encoder(self) -> bool {
        matches!(self, OperatingMode::HighResources)
    }

    /// Whether this mode runs a real image encoder.
    pub fn loads_image_encoder(self) -> bool {
        matches!(self, OperatingMode::HighResources)
    }

    /// Stable wire name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            OperatingMode::None => "none",
            OperatingMode::LowResources => "low_resources",
            OperatingMode::HighResources => "high_resources",
            OperatingMode::LowResPic => "low_res_pic",
            OperatingMode::RandomPic => "random_pic",
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperatingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(OperatingMode::None),
            "low_resources" => Ok(OperatingMode::LowResources),
            "high_resources" => Ok(OperatingMode::HighResources),
            "low_res_pic" => Ok(OperatingMode::LowResPic),
            "random_pic" => Ok(OperatingMode::RandomPic),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Mode requested on a single search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestedMode {
    /// Use whatever the process is currently initialized as.
    Auto,
    /// Ask for a specific mode; may degrade or be rejected at resolution.
    Explicit(OperatingMode),
}

impl Default for RequestedMode {
    fn default() -> Self {
        RequestedMode::Auto
    }
}

impl FromStr for RequestedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "auto" {
            return Ok(RequestedMode::Auto);
        }
        let mode = OperatingMode::from_str(s)?;
        if mode == OperatingMode::None {
            return Err("mode 'none' cannot be requested".to_string());
        }
        Ok(RequestedMode::Explicit(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_roundtrip() {
        for mode in [
            OperatingMode::None,
            OperatingMode::LowResources,
            OperatingMode::HighResources,
            OperatingMode::LowResPic,
            OperatingMode::RandomPic,
        ] {
            assert_eq!(mode.as_str().parse::<OperatingMode>().unwrap(), mode);
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{}\"", mode.as_str()));
        }
    }

    #[test]
    fn test_requested_mode_parsing() {
        assert_eq!("auto".parse::<RequestedMode>().unwrap(), RequestedMode::Auto);
        assert_eq!(
            "low_resources".parse::<RequestedMode>().unwrap(),
            RequestedMode::Explicit(OperatingMode::LowResources)
        );
        assert!("none".parse::<RequestedMode>().is_err());
        assert!("warp_speed".parse::<RequestedMode>().is_err());
    }

    #[test]
    fn test_collection_table() {
        assert!(OperatingMode::LowResources.uses_text_collection());
        assert!(!OperatingMode::LowResources.uses_image_collection());
        assert!(OperatingMode::RandomPic.uses_image_collection());
        assert!(!OperatingMode::RandomPic.uses_text_collection());
        assert!(OperatingMode::HighResources.loads_text_encoder());
        assert!(!OperatingMode::LowResPic.loads_text_encoder());
    }
}
