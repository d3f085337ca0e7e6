//! Cost predictor
//!
//! Serving side of the model: loads the persisted artifacts once and scores
//! interactive submissions and batch uploads with the exact pipeline state
//! the model was trained with. Every prediction is a pure function of the
//! loaded state, so one predictor can be shared across threads.

use super::batch::{validate_batch_columns, BatchReport, BatchRow, COST_ROUNDING};
use super::estimator::Estimator;
use super::InferenceConfig;
use crate::error::{MetroCostError, Result};
use crate::features::{DefaultPolicy, Record};
use crate::preprocessing::FeaturePipeline;
use crate::schema::FieldSchema;
use crate::training::{ModelArtifacts, ModelSummary};
use crate::utils::frame_to_records;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Estimated civil cost of one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Model output in crore, unrounded
    pub cost_crore: f64,
    /// Fully derived record the estimate was computed from
    pub record: Record,
}

impl CostEstimate {
    /// `₹ <cost> crore`, two decimals
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹ {:.2} crore", COST_ROUNDING.apply(self.cost_crore))
    }
}

/// Loaded pipeline and estimator
#[derive(Debug, Clone)]
pub struct CostPredictor {
    pipeline: FeaturePipeline,
    estimator: Estimator,
    summary: ModelSummary,
    config: InferenceConfig,
}

impl CostPredictor {
    /// Load the artifact directory written by training
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_artifacts(ModelArtifacts::load(dir)?)
    }

    pub fn from_artifacts(artifacts: ModelArtifacts) -> Result<Self> {
        let summary = artifacts.summary();
        let (pipeline, forest) = artifacts.into_parts();
        let estimator = Estimator::new(forest, pipeline.column_order().clone())?;
        Ok(Self {
            pipeline,
            estimator,
            summary,
            config: InferenceConfig::default(),
        })
    }

    pub fn with_config(mut self, config: InferenceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &FieldSchema {
        self.pipeline.schema()
    }

    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    pub fn estimator(&self) -> &Estimator {
        &self.estimator
    }

    pub fn summary(&self) -> &ModelSummary {
        &self.summary
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Score raw form inputs; absent inputs take their defaults
    pub fn predict_inputs(&self, raw: &Record) -> Result<CostEstimate> {
        let record = self.pipeline.derive(raw)?;
        self.predict_record(&record)
    }

    /// Score an already derived record
    pub fn predict_record(&self, record: &Record) -> Result<CostEstimate> {
        let vector = self.pipeline.transform_record(record)?;
        let cost_crore = self.estimator.predict(&vector)?;
        debug!(cost_crore, "Scored record");
        Ok(CostEstimate {
            cost_crore,
            record: record.clone(),
        })
    }

    /// Score one batch row; every input must be present
    fn predict_row(&self, raw: &Record) -> Result<f64> {
        let record = self.pipeline.derive_with(raw, DefaultPolicy::Require)?;
        let vector = self.pipeline.transform_record(&record)?;
        self.estimator.predict(&vector)
    }

    /// Score raw batch rows, keeping input order.
    ///
    /// Row failures are reported on their row and never filled in.
    pub fn predict_records(&self, rows: &[Record]) -> BatchReport {
        let score = |(i, raw): (usize, &Record)| match self.predict_row(raw) {
            Ok(cost) => BatchRow::scored(i, cost),
            Err(err) => BatchRow::failed(i, &err),
        };

        let rows: Vec<BatchRow> = if self.config.parallel_batch {
            rows.par_iter().enumerate().map(score).collect()
        } else {
            rows.iter().enumerate().map(score).collect()
        };
        BatchReport::new(rows)
    }

    /// Validate and score an uploaded frame.
    ///
    /// A missing required column fails the whole batch before any row is
    /// scored.
    pub fn predict_batch(&self, df: &DataFrame) -> Result<BatchReport> {
        let start = Instant::now();
        validate_batch_columns(df, self.schema())?;

        if let Some(limit) = self.config.max_batch_rows {
            if df.height() > limit {
                return Err(MetroCostError::DataError(format!(
                    "batch has {} rows, limit is {}",
                    df.height(),
                    limit
                )));
            }
        }

        let records = frame_to_records(df)?;
        let report = self.predict_records(&records);

        info!(
            rows = report.len(),
            failed = report.failed(),
            ms = start.elapsed().as_millis() as u64,
            "Batch scored"
        );
        Ok(report)
    }
}
