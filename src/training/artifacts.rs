//! Persisted model artifacts
//!
//! A trained model is stored as a directory of three JSON files:
//! - `model.json`: the forest, its hold-out metrics, the field schema and
//!   the training configuration
//! - `encoder.json`: the category vocabulary learned from the training split
//! - `model_columns.json`: the encoded column order the forest expects
//!
//! Loading re-checks that the three agree; any drift is fatal.

use super::config::TrainingConfig;
use super::models::RegressionMetrics;
use super::random_forest::RandomForest;
use crate::error::{MetroCostError, Result};
use crate::preprocessing::{CategoryVocabulary, ColumnOrder, FeaturePipeline};
use crate::schema::FieldSchema;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const MODEL_FILE: &str = "model.json";
pub const ENCODER_FILE: &str = "encoder.json";
pub const COLUMNS_FILE: &str = "model_columns.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    crate_version: String,
    trained_at: DateTime<Utc>,
    config: TrainingConfig,
    metrics: RegressionMetrics,
    schema: FieldSchema,
    forest: RandomForest,
}

/// Fitted pipeline and forest, plus how they were produced
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pipeline: FeaturePipeline,
    forest: RandomForest,
    metrics: RegressionMetrics,
    config: TrainingConfig,
    trained_at: DateTime<Utc>,
}

/// Human-facing description of a trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub target: String,
    pub n_trees: usize,
    pub n_features: usize,
    pub n_categorical_fields: usize,
    pub n_numeric_fields: usize,
    pub n_input_fields: usize,
    pub metrics: RegressionMetrics,
    pub trained_at: DateTime<Utc>,
    /// Highest-importance encoded columns, descending
    pub top_features: Vec<(String, f64)>,
}

impl ModelArtifacts {
    /// Bundle a freshly fitted pipeline and forest
    pub fn new(
        pipeline: FeaturePipeline,
        forest: RandomForest,
        metrics: RegressionMetrics,
        config: TrainingConfig,
    ) -> Result<Self> {
        Self::verify(&pipeline, &forest)?;
        Ok(Self {
            pipeline,
            forest,
            metrics,
            config,
            trained_at: Utc::now(),
        })
    }

    fn verify(pipeline: &FeaturePipeline, forest: &RandomForest) -> Result<()> {
        if !forest.is_fitted() {
            return Err(MetroCostError::ModelNotFitted);
        }
        let expected = pipeline.column_order().len();
        if forest.n_features() != expected {
            return Err(MetroCostError::ShapeError {
                expected: format!("{} features (column order)", expected),
                actual: format!("{} features (model)", forest.n_features()),
            });
        }
        Ok(())
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn metrics(&self) -> &RegressionMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn schema(&self) -> &FieldSchema {
        self.pipeline.schema()
    }

    /// Split into the serving halves
    pub fn into_parts(self) -> (FeaturePipeline, RandomForest) {
        (self.pipeline, self.forest)
    }

    /// Write the three artifact files into `dir`, creating it if needed
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let model = ModelFile {
            format_version: FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: self.trained_at,
            config: self.config.clone(),
            metrics: self.metrics.clone(),
            schema: self.pipeline.schema().clone(),
            forest: self.forest.clone(),
        };

        fs::write(dir.join(MODEL_FILE), serde_json::to_vec(&model)?)?;
        fs::write(
            dir.join(ENCODER_FILE),
            serde_json::to_vec_pretty(self.pipeline.vocabulary())?,
        )?;
        fs::write(
            dir.join(COLUMNS_FILE),
            serde_json::to_vec_pretty(self.pipeline.column_order())?,
        )?;

        info!(dir = %dir.display(), features = self.pipeline.column_order().len(), "Model artifacts saved");
        Ok(())
    }

    /// Load and cross-check the artifact files in `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let model: ModelFile = read_json(&dir.join(MODEL_FILE))?;
        if model.format_version != FORMAT_VERSION {
            return Err(MetroCostError::ConfigError(format!(
                "unsupported artifact format version {} (expected {})",
                model.format_version, FORMAT_VERSION
            )));
        }

        let vocabulary: CategoryVocabulary = read_json(&dir.join(ENCODER_FILE))?;
        let column_order: ColumnOrder = read_json(&dir.join(COLUMNS_FILE))?;

        let pipeline = FeaturePipeline::from_parts(model.schema, vocabulary, column_order)?;
        Self::verify(&pipeline, &model.forest)?;

        info!(
            dir = %dir.display(),
            trees = model.forest.n_trees(),
            features = pipeline.column_order().len(),
            trained_at = %model.trained_at,
            "Model artifacts loaded"
        );

        Ok(Self {
            pipeline,
            forest: model.forest,
            metrics: model.metrics,
            config: model.config,
            trained_at: model.trained_at,
        })
    }

    pub fn summary(&self) -> ModelSummary {
        let schema = self.pipeline.schema();
        let mut top_features: Vec<(String, f64)> = self
            .forest
            .feature_importances()
            .map(|imp| {
                self.pipeline
                    .column_order()
                    .columns()
                    .iter()
                    .cloned()
                    .zip(imp.iter().copied())
                    .collect()
            })
            .unwrap_or_default();
        top_features.sort_by(|a, b| b.1.total_cmp(&a.1));
        top_features.truncate(10);

        ModelSummary {
            target: schema.target.clone(),
            n_trees: self.forest.n_trees(),
            n_features: self.forest.n_features(),
            n_categorical_fields: schema.categorical_fields().count(),
            n_numeric_fields: schema.numeric_fields().count(),
            n_input_fields: schema.input_fields().count(),
            metrics: self.metrics.clone(),
            trained_at: self.trained_at,
            top_features,
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| {
        MetroCostError::ConfigError(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        MetroCostError::SerializationError(format!("{}: {}", path.display(), e))
    })
}
