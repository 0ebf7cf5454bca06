use serde::{Deserialize, Serialize};

use super::aggregator::AggregationConfig;
use super::complexity::ComplexityConfig;
use super::error::ConfigurationError;

/// Complexity estimate tables and aggregation thresholds, versioned together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringConfig {
    pub version: String,
    #[serde(default)]
    pub complexity: ComplexityConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            version: "scoring-default".to_string(),
            complexity: ComplexityConfig::default(),
            aggregation: AggregationConfig::default(),
        }
    }
}

impl ScoringConfig {
    pub fn from_json(name: &str, raw: &str) -> Result<Self, ConfigurationError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|source| ConfigurationError::Parse {
                name: name.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.version.trim().is_empty() {
            return Err(ConfigurationError::InvalidScoring(
                "scoring version must not be empty".to_string(),
            ));
        }
        self.complexity.validate()?;
        self.aggregation.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_fall_back_to_defaults() {
        let config = ScoringConfig::from_json("scoring", r#"{"version": "s-1"}"#)
            .expect("minimal scoring config parses");
        assert_eq!(config.version, "s-1");
        assert_eq!(config.aggregation, AggregationConfig::default());
        assert_eq!(config.complexity, ComplexityConfig::default());
    }

    #[test]
    fn inverted_recommendation_thresholds_are_rejected() {
        let raw = r#"{
            "version": "s-1",
            "aggregation": {
                "recommendation": {"highlyRecommended": 60, "recommended": 70, "conditional": 50}
            }
        }"#;
        match ScoringConfig::from_json("scoring", raw) {
            Err(ConfigurationError::InvalidScoring(message)) => {
                assert!(message.contains("recommendation"))
            }
            other => panic!("expected invalid scoring, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_names_the_source() {
        match ScoringConfig::from_json("scoring.v1.json", "{") {
            Err(ConfigurationError::Parse { name, .. }) => assert_eq!(name, "scoring.v1.json"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
