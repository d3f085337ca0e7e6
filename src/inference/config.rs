//! Inference configuration

use serde::{Deserialize, Serialize};

/// Configuration for scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Score batch rows in parallel via rayon
    pub parallel_batch: bool,

    /// Largest batch accepted (None = unlimited)
    pub max_batch_rows: Option<usize>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            parallel_batch: true,
            max_batch_rows: Some(100_000),
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parallel_batch(mut self, parallel: bool) -> Self {
        self.parallel_batch = parallel;
        self
    }

    pub fn with_max_batch_rows(mut self, rows: Option<usize>) -> Self {
        self.max_batch_rows = rows;
        self
    }
}
