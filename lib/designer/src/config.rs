//! Designer tuning.

use serde::Deserialize;
use std::time::Duration;

/// Tuning knobs for the design pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DesignerConfig {
    /// Upper bound on candidates passed to node selection.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Cosine similarity floor for the semantic tier.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Raw candidates offered when both retrieval tiers come back empty.
    #[serde(default = "default_raw_fallback_limit")]
    pub raw_fallback_limit: usize,

    /// Deadline for each model or embedding call, in seconds.
    #[serde(default)]
    pub model_timeout_secs: Option<u64>,

    /// Sampling temperature for every model call.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_nodes() -> usize {
    50
}

fn default_min_similarity() -> f32 {
    0.25
}

fn default_raw_fallback_limit() -> usize {
    20
}

fn default_temperature() -> f32 {
    0.2
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            min_similarity: default_min_similarity(),
            raw_fallback_limit: default_raw_fallback_limit(),
            model_timeout_secs: None,
            temperature: default_temperature(),
        }
    }
}

impl DesignerConfig {
    #[must_use]
    pub fn model_timeout(&self) -> Option<Duration> {
        self.model_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn designer_config_has_correct_defaults() {
        let config = DesignerConfig::default();
        assert_eq!(config.max_nodes, 50);
        assert!((config.min_similarity - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.raw_fallback_limit, 20);
        assert_eq!(config.model_timeout(), None);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: DesignerConfig =
            serde_json::from_str(r#"{"max_nodes": 10, "model_timeout_secs": 30}"#).expect("parse");
        assert_eq!(config.max_nodes, 10);
        assert_eq!(config.raw_fallback_limit, 20);
        assert_eq!(config.model_timeout(), Some(Duration::from_secs(30)));
    }
}
