//! Metro station civil cost estimation
//!
//! This crate turns a handful of station parameters into a civil cost
//! estimate in crore rupees:
//! - Field schema describing inputs, engineered fields and the target
//! - Deterministic derivation of engineered fields from the inputs
//! - One-hot feature pipeline with a frozen column order
//! - Random forest regression, trained and persisted as JSON artifacts
//! - Interactive and batch prediction
//! - Web server and CLI interfaces
//!
//! # Modules
//!
//! - [`schema`] - Field definitions and derivation rules
//! - [`features`] - Records, values and derivation
//! - [`preprocessing`] - Category vocabulary, encoding and column order
//! - [`training`] - Random forest, metrics and model artifacts
//! - [`inference`] - Cost predictor and batch scoring
//! - [`synthetic`] - Seeded synthetic station data
//! - [`server`] - HTTP server with the estimator form and REST API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod schema;
pub mod features;
pub mod preprocessing;
pub mod training;
pub mod inference;

pub mod synthetic;
pub mod utils;

pub mod server;
pub mod cli;

pub use error::{MetroCostError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{MetroCostError, Result};

    pub use crate::schema::{Derivation, FieldKind, FieldSchema, FieldSpec, Rounding};

    pub use crate::features::{derive, derive_with, DefaultPolicy, FieldValue, Record};

    pub use crate::preprocessing::{ColumnOrder, EncodedVector, FeaturePipeline};

    pub use crate::training::{ModelArtifacts, RandomForest, RegressionMetrics, TrainEngine, TrainingConfig};

    pub use crate::inference::{BatchReport, CostEstimate, CostPredictor, InferenceConfig};

    pub use crate::synthetic::StationGenerator;

    pub use crate::utils::DataLoader;
}
