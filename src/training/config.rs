//! Training configuration

use super::random_forest::MaxFeatures;
use crate::error::{MetroCostError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for fitting the cost model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of trees
    pub n_estimators: usize,

    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Random seed for the split and the forest
    pub random_state: u64,

    // Tree-specific parameters
    /// Maximum depth of trees (None = grow until pure)
    pub max_depth: Option<usize>,

    /// Minimum samples to split a node
    pub min_samples_split: usize,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,

    /// Features considered per split
    pub max_features: MaxFeatures,

    /// Bootstrap rows for each tree
    pub bootstrap: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            test_size: 0.2,
            random_state: 42,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
            bootstrap: true,
        }
    }
}

impl TrainingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, n: usize) -> Self {
        self.min_samples_split = n;
        self
    }

    pub fn with_min_samples_leaf(mut self, n: usize) -> Self {
        self.min_samples_leaf = n;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(MetroCostError::ConfigError(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.test_size) {
            return Err(MetroCostError::ConfigError(format!(
                "test_size must be in [0, 1), got {}",
                self.test_size
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(MetroCostError::ConfigError(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(MetroCostError::ConfigError(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}
