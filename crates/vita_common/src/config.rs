//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::llm::LlmConfig;

/// Recommendation engine tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Maximum products returned to the user.
    pub max_results: usize,
    /// Minimum score a candidate needs once any candidate qualifies.
    pub min_confidence: f64,
    /// How many candidates to request from the catalog before filtering.
    pub search_limit: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_results: 3,
            min_confidence: 0.5,
            search_limit: 40,
        }
    }
}

/// Top-level engine configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub llm: LlmConfig,
    pub recommendation: RecommendationConfig,
    /// Where the registration-redirect sub-dialog sends family members.
    pub registration_url: String,
    /// How many prior turns to replay into free-form chat completions.
    pub max_history_turns: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            recommendation: RecommendationConfig::default(),
            registration_url: "https://vita.example/register".to_string(),
            max_history_turns: 8,
        }
    }
}

impl EngineConfig {
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let config = EngineConfig::from_toml("registration_url = \"https://example.test/register\"")
            .unwrap();
        assert_eq!(config.recommendation.max_results, 3);
        assert_eq!(config.registration_url, "https://example.test/register");
    }
}
