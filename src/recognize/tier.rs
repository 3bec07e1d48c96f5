use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Speech recognition model tiers.
///
/// `Base` favors speed, `Small` trades latency for accuracy. At most one
/// tier's model is resident at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    #[default]
    Base,
    Small,
}

impl ModelTier {
    /// Artifact filename within the model cache directory.
    pub fn artifact_filename(&self) -> &'static str {
        match self {
            ModelTier::Base => "ggml-base.bin",
            ModelTier::Small => "ggml-small.bin",
        }
    }

    /// Download URL for this tier's artifact.
    pub fn artifact_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.artifact_filename()
        )
    }

    /// Approximate artifact size in MB, for download logging.
    pub fn size_mb(&self) -> u32 {
        match self {
            ModelTier::Base => 142,
            ModelTier::Small => 466,
        }
    }
}

impl fmt::Display for ModelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTier::Base => write!(f, "base"),
            ModelTier::Small => write!(f, "small"),
        }
    }
}

impl FromStr for ModelTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base" => Ok(ModelTier::Base),
            "small" => Ok(ModelTier::Small),
            _ => Err(format!(
                "Unknown model tier: {}. Valid tiers: base, small",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tier_names() {
        assert_eq!("base".parse::<ModelTier>().unwrap(), ModelTier::Base);
        assert_eq!("Small".parse::<ModelTier>().unwrap(), ModelTier::Small);
        assert!("tiny".parse::<ModelTier>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for tier in [ModelTier::Base, ModelTier::Small] {
            assert_eq!(tier.to_string().parse::<ModelTier>().unwrap(), tier);
        }
    }

    #[test]
    fn artifact_urls_are_tier_specific() {
        let url = ModelTier::Small.artifact_url("https://example.com/models/");
        assert_eq!(url, "https://example.com/models/ggml-small.bin");
    }
}
