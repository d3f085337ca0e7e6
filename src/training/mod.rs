//! Model training module
//!
//! Provides the cost model and everything needed to fit it:
//! - CART regression trees and the bagged random forest built from them
//! - Hold-out regression metrics (MAE, RMSE, R²)
//! - [`TrainEngine`], which splits historical data, fits the feature
//!   pipeline on the training rows and fits the forest
//! - [`ModelArtifacts`], the persisted three-file model directory

mod artifacts;
mod config;
mod engine;
mod models;
pub mod decision_tree;
pub mod random_forest;

pub use artifacts::{ModelArtifacts, ModelSummary, COLUMNS_FILE, ENCODER_FILE, MODEL_FILE};
pub use config::TrainingConfig;
pub use decision_tree::{DecisionTree, TreeNode};
pub use engine::TrainEngine;
pub use models::RegressionMetrics;
pub use random_forest::{MaxFeatures, RandomForest};
