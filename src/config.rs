//! Configuration for introspection runs

use serde::{Deserialize, Serialize};

use crate::document::SamplingStrategy;

/// Configuration for introspection runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntrospectionConfig {
    /// Strategy used when sampling documents for type merging
    pub sampling_strategy: SamplingStrategy,

    /// Strategy used for the second sampling pass that scores relations
    pub relation_sampling_strategy: SamplingStrategy,

    /// Number of documents drawn by the `Random` strategy
    pub random_sample_size: usize,

    /// Minimum hit ratio (0.0 - 1.0) before a candidate field becomes a relation
    pub relation_threshold: f64,

    /// Detect DateTime and UUID values inside plain document strings
    pub detect_formats: bool,

    /// Sort types and fields before rendering
    pub sort_before_rendering: bool,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            sampling_strategy: SamplingStrategy::All,
            relation_sampling_strategy: SamplingStrategy::Random,
            random_sample_size: 50,
            relation_threshold: 0.3,
            detect_formats: true,
            sort_before_rendering: true,
        }
    }
}

impl IntrospectionConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration
    pub fn builder() -> IntrospectionConfigBuilder {
        IntrospectionConfigBuilder::default()
    }
}

/// Builder for IntrospectionConfig
#[derive(Debug, Default)]
pub struct IntrospectionConfigBuilder {
    config: IntrospectionConfig,
}

impl IntrospectionConfigBuilder {
    /// Set the strategy for the type merging pass
    pub fn sampling_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.config.sampling_strategy = strategy;
        self
    }

    /// Set the strategy for the relation scoring pass
    pub fn relation_sampling_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.config.relation_sampling_strategy = strategy;
        self
    }

    /// Set the number of documents drawn by random sampling
    pub fn random_sample_size(mut self, size: usize) -> Self {
        self.config.random_sample_size = size.max(1);
        self
    }

    /// Set the relation confidence threshold
    pub fn relation_threshold(mut self, threshold: f64) -> Self {
        self.config.relation_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Enable or disable string format detection
    pub fn detect_formats(mut self, detect: bool) -> Self {
        self.config.detect_formats = detect;
        self
    }

    /// Enable or disable sorting before rendering
    pub fn sort_before_rendering(mut self, sort: bool) -> Self {
        self.config.sort_before_rendering = sort;
        self
    }

    /// Build the configuration
    pub fn build(self) -> IntrospectionConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IntrospectionConfig::default();
        assert_eq!(config.sampling_strategy, SamplingStrategy::All);
        assert_eq!(config.relation_sampling_strategy, SamplingStrategy::Random);
        assert_eq!(config.relation_threshold, 0.3);
        assert!(config.sort_before_rendering);
    }

    #[test]
    fn test_builder() {
        let config = IntrospectionConfig::builder()
            .sampling_strategy(SamplingStrategy::One)
            .random_sample_size(10)
            .detect_formats(false)
            .build();

        assert_eq!(config.sampling_strategy, SamplingStrategy::One);
        assert_eq!(config.random_sample_size, 10);
        assert!(!config.detect_formats);
    }

    #[test]
    fn test_threshold_clamping() {
        let config = IntrospectionConfig::builder()
            .relation_threshold(1.5) // Should clamp to 1.0
            .build();

        assert_eq!(config.relation_threshold, 1.0);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: IntrospectionConfig = serde_json::from_str(
            r#"{"samplingStrategy":"one","relationSamplingStrategy":"all","randomSampleSize":5,
                "relationThreshold":0.5,"detectFormats":false,"sortBeforeRendering":false}"#,
        )
        .unwrap();
        assert_eq!(config.sampling_strategy, SamplingStrategy::One);
        assert_eq!(config.relation_threshold, 0.5);
        assert!(!config.sort_before_rendering);
    }
}
