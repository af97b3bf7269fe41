//! Search configuration

use serde::{Deserialize, Serialize};

use super::error::SearchError;

/// Hybrid ranking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Maximum results per query
    pub top_k: usize,

    /// Weight of embedding similarity in the hybrid score
    pub semantic_weight: f32,

    /// Weight of keyword overlap in the hybrid score
    pub keyword_weight: f32,

    /// Multiplier stretching the hybrid score onto the displayed 0-1 scale
    pub similarity_boost: f32,

    /// Query tokens shorter than this are ignored for keyword overlap
    pub min_token_len: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 10,
            semantic_weight: 0.6,
            keyword_weight: 0.4,
            similarity_boost: 1.5,
            min_token_len: 3,
        }
    }
}

impl SearchConfig {
    /// Validate that weights sum to 1.0 and at least one result is requested
    pub fn validate(&self) -> Result<(), SearchError> {
        let weight_sum = self.semantic_weight + self.keyword_weight;
        if (weight_sum - 1.0).abs() > 0.001 {
            return Err(SearchError::InvalidConfig(format!(
                "weights must sum to 1.0, got {}",
                weight_sum
            )));
        }
        if self.semantic_weight < 0.0 || self.keyword_weight < 0.0 {
            return Err(SearchError::InvalidConfig(
                "weights must not be negative".to_string(),
            ));
        }
        if self.top_k == 0 {
            return Err(SearchError::InvalidConfig(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.similarity_boost <= 0.0 {
            return Err(SearchError::InvalidConfig(format!(
                "similarity boost must be positive, got {}",
                self.similarity_boost
            )));
        }
        Ok(())
    }

    /// Create config with custom weights (normalized to sum to 1.0)
    pub fn with_weights(semantic_weight: f32, keyword_weight: f32) -> Self {
        let sum = semantic_weight + keyword_weight;
        Self {
            semantic_weight: semantic_weight / sum,
            keyword_weight: keyword_weight / sum,
            ..Default::default()
        }
    }
}
