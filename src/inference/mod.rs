//! Inference module
//!
//! Provides model serving:
//! - [`Estimator`]: the fitted forest bound to its trained column order
//! - [`CostPredictor`]: loads artifacts, scores form inputs and batch rows
//! - Batch upload validation and result framing

mod batch;
mod config;
mod engine;
mod estimator;

pub use batch::{
    required_batch_columns, validate_batch_columns, BatchReport, BatchRow, ERROR_COLUMN,
    PREDICTION_COLUMN,
};
pub use config::InferenceConfig;
pub use engine::{CostEstimate, CostPredictor};
pub use estimator::Estimator;
