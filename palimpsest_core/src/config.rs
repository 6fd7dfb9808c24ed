//! Engine configuration.

use serde::Deserialize;

use crate::error::EngineError;

/// Tuning parameters for the transformation pipeline.
///
/// Every field has a default, so a TOML file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on transformations applied in one pass.
    pub max_transformations: usize,

    /// Character-bleed transformations considered per pass.
    pub bleed_limit: usize,

    /// Journey-pattern transformations considered per pass.
    pub journey_limit: usize,

    /// Transformations taken from each satisfied stored rule.
    pub transformations_per_rule: usize,

    /// Rendered contents kept before the oldest is evicted.
    pub content_cache_capacity: usize,

    /// Condition results kept before the oldest is evicted.
    pub condition_cache_capacity: usize,

    /// Minimum time between refresh passes on the same node.
    pub min_refresh_interval_ms: u64,

    /// Length of the recent-journey window used by pattern detection.
    pub recent_window: usize,

    /// Awareness score above which the `recursive-awareness` section is shown.
    pub recursive_awareness_threshold: f64,

    /// Engagements with a tag before its `tag-<name>` section is shown.
    pub tag_engagement_threshold: u32,

    /// Nesting depth of transformer markup treated as corruption.
    pub max_markup_depth: usize,

    /// Rendered plain text shorter than this share of the source is rejected.
    pub min_output_ratio: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_transformations: 4,
            bleed_limit: 2,
            journey_limit: 2,
            transformations_per_rule: 1,
            content_cache_capacity: 128,
            condition_cache_capacity: 512,
            min_refresh_interval_ms: 100,
            recent_window: 3,
            recursive_awareness_threshold: 0.5,
            tag_engagement_threshold: 3,
            max_markup_depth: 8,
            min_output_ratio: 0.5,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML, filling unspecified fields with defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, EngineError> {
        Ok(toml::from_str(source)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            "max_transformations = 6\nrecursive_awareness_threshold = 0.25\n",
        )
        .unwrap();

        assert_eq!(config.max_transformations, 6);
        assert!((config.recursive_awareness_threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.bleed_limit, 2);
        assert_eq!(config.recent_window, 3);
    }

    #[test]
    fn test_invalid_toml_is_a_config_error() {
        let result = EngineConfig::from_toml_str("max_transformations = \"many\"");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }
}
