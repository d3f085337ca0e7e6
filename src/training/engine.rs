//! Training engine implementation

use super::artifacts::ModelArtifacts;
use super::config::TrainingConfig;
use super::models::RegressionMetrics;
use super::random_forest::RandomForest;
use crate::error::{MetroCostError, Result};
use crate::features::Record;
use crate::preprocessing::FeaturePipeline;
use crate::schema::FieldSchema;
use crate::utils::{column_names, frame_to_records};
use ndarray::Array1;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{info, warn};

/// Fits the feature pipeline and forest on historical station data
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
    schema: FieldSchema,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig, schema: FieldSchema) -> Self {
        Self { config, schema }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Fit on a frame holding every schema column plus the target.
    ///
    /// Rows with a null target, or with any schema field null, are dropped
    /// with a warning. The vocabulary is learned from the training split
    /// only; metrics come from the held-out split.
    pub fn fit(&self, df: &DataFrame) -> Result<ModelArtifacts> {
        let start = Instant::now();
        self.config.validate()?;
        self.schema.validate()?;
        self.check_columns(df)?;

        let (records, targets) = self.prepare_data(df)?;
        let (train_idx, test_idx) = self.train_test_split(records.len())?;

        let train_records: Vec<Record> = train_idx.iter().map(|&i| records[i].clone()).collect();
        let y_train = Array1::from_iter(train_idx.iter().map(|&i| targets[i]));

        let pipeline = FeaturePipeline::fit(&train_records, &self.schema)?;
        let x_train = pipeline.transform_records(&train_records)?;

        let mut forest = RandomForest::new(self.config.n_estimators)
            .with_max_depth(self.config.max_depth)
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf)
            .with_max_features(self.config.max_features)
            .with_bootstrap(self.config.bootstrap)
            .with_random_state(self.config.random_state);
        forest.fit(&x_train, &y_train)?;

        let mut metrics = if test_idx.is_empty() {
            warn!("No hold-out rows; metrics left empty");
            RegressionMetrics::default()
        } else {
            let test_records: Vec<Record> =
                test_idx.iter().map(|&i| records[i].clone()).collect();
            let y_test = Array1::from_iter(test_idx.iter().map(|&i| targets[i]));
            let x_test = pipeline.transform_records(&test_records)?;
            let y_pred = forest.predict(&x_test)?;
            RegressionMetrics::compute(&y_test, &y_pred)
        };
        metrics.n_train = train_idx.len();
        metrics.training_time_secs = start.elapsed().as_secs_f64();

        info!(
            train_rows = metrics.n_train,
            test_rows = metrics.n_test,
            features = pipeline.column_order().len(),
            trees = forest.n_trees(),
            mae = metrics.mae,
            rmse = metrics.rmse,
            r2 = metrics.r2,
            secs = metrics.training_time_secs,
            "Model trained"
        );

        ModelArtifacts::new(pipeline, forest, metrics, self.config.clone())
    }

    fn check_columns(&self, df: &DataFrame) -> Result<()> {
        let present: HashSet<String> = column_names(df).into_iter().collect();
        let missing: Vec<String> = self
            .schema
            .training_columns()
            .into_iter()
            .filter(|c| !present.contains(c))
            .collect();
        if !missing.is_empty() {
            return Err(MetroCostError::SchemaMismatch { fields: missing });
        }
        Ok(())
    }

    fn prepare_data(&self, df: &DataFrame) -> Result<(Vec<Record>, Vec<f64>)> {
        let target = &self.schema.target;
        let field_names = self.schema.field_names();

        let mut records = Vec::with_capacity(df.height());
        let mut targets = Vec::with_capacity(df.height());
        let mut null_target = 0usize;
        let mut incomplete = 0usize;

        for mut record in frame_to_records(df)? {
            let Some(value) = record.remove(target) else {
                null_target += 1;
                continue;
            };
            let y = value.as_f64().ok_or_else(|| MetroCostError::InvalidValue {
                field: target.clone(),
                value: value.to_string(),
                expected: "a number".to_string(),
            })?;
            if !field_names.iter().all(|f| record.contains(f)) {
                incomplete += 1;
                continue;
            }
            records.push(record);
            targets.push(y);
        }

        if null_target > 0 {
            warn!(rows = null_target, column = %target, "Dropped rows with null target");
        }
        if incomplete > 0 {
            warn!(rows = incomplete, "Dropped rows with null feature values");
        }
        if records.len() < 2 {
            return Err(MetroCostError::TrainingError(format!(
                "need at least 2 complete rows, found {}",
                records.len()
            )));
        }

        Ok((records, targets))
    }

    /// Seeded shuffle, then the first `ceil(n * test_size)` rows are held out
    fn train_test_split(&self, n: usize) -> Result<(Vec<usize>, Vec<usize>)> {
        let n_test = (n as f64 * self.config.test_size).ceil() as usize;
        if n_test >= n {
            return Err(MetroCostError::TrainingError(format!(
                "test_size {} leaves no training rows out of {}",
                self.config.test_size, n
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state);
        indices.shuffle(&mut rng);

        let train = indices.split_off(n_test);
        Ok((train, indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::StationGenerator;

    fn small_config() -> TrainingConfig {
        TrainingConfig::new().with_n_estimators(10)
    }

    #[test]
    fn test_fit_on_synthetic_stations() {
        let schema = FieldSchema::metro_station();
        let df = StationGenerator::new(7).generate(120, &schema).unwrap();

        let artifacts = TrainEngine::new(small_config(), schema).fit(&df).unwrap();
        let metrics = artifacts.metrics();
        assert_eq!(metrics.n_train, 96);
        assert_eq!(metrics.n_test, 24);
        assert!(metrics.mae.is_finite());
        assert_eq!(
            artifacts.forest().n_features(),
            artifacts.pipeline().column_order().len()
        );
    }

    #[test]
    fn test_missing_columns_reported() {
        let schema = FieldSchema::metro_station();
        let df = StationGenerator::new(1).generate(10, &schema).unwrap();
        let df = df.drop("Soil_Type").unwrap().drop("Total_Civil_Cost_Crore").unwrap();

        let err = TrainEngine::new(small_config(), schema).fit(&df).unwrap_err();
        match err {
            MetroCostError::SchemaMismatch { fields } => {
                assert_eq!(fields, vec!["Soil_Type", "Total_Civil_Cost_Crore"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_split_is_seeded() {
        let engine = TrainEngine::new(small_config(), FieldSchema::metro_station());
        let (train_a, test_a) = engine.train_test_split(50).unwrap();
        let (train_b, test_b) = engine.train_test_split(50).unwrap();
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 10);
    }

    #[test]
    fn test_null_targets_dropped() {
        let df = df! {
            "x" => [1.0, 2.0, 3.0, 4.0, 5.0],
            "y" => [Some(1.0), None, Some(3.0), Some(4.0), Some(5.0)],
        }
        .unwrap();
        let schema = FieldSchema::infer_from_frame(&df, "y").unwrap();
        let artifacts = TrainEngine::new(small_config(), schema).fit(&df).unwrap();
        assert_eq!(artifacts.metrics().n_train + artifacts.metrics().n_test, 4);
    }
}
