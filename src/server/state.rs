//! Application state management

use super::error::ServerError;
use super::ServerConfig;
use crate::inference::CostPredictor;
use crate::schema::FieldSchema;
use crate::training::MODEL_FILE;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared across handlers.
///
/// The predictor is immutable once loaded; handlers only read it.
pub struct AppState {
    pub config: ServerConfig,
    pub predictor: Option<Arc<CostPredictor>>,
    pub started_at: DateTime<Utc>,
    fallback_schema: FieldSchema,
}

impl AppState {
    /// State without a model; prediction endpoints answer 503
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            predictor: None,
            started_at: Utc::now(),
            fallback_schema: FieldSchema::metro_station(),
        }
    }

    pub fn with_predictor(config: ServerConfig, predictor: CostPredictor) -> Self {
        Self {
            predictor: Some(Arc::new(predictor)),
            ..Self::new(config)
        }
    }

    /// Load the model named by `config.model_dir`.
    ///
    /// A directory without artifacts starts the server without a model;
    /// artifacts that fail their consistency checks are a startup error.
    pub fn load(config: ServerConfig) -> crate::error::Result<Self> {
        let dir = Path::new(&config.model_dir);
        if !dir.join(MODEL_FILE).exists() {
            warn!(model_dir = %dir.display(), "No model artifacts found; prediction endpoints disabled");
            return Ok(Self::new(config));
        }

        let predictor = CostPredictor::load(dir)?;
        info!(
            model_dir = %dir.display(),
            trees = predictor.estimator().n_trees(),
            features = predictor.estimator().n_features(),
            "Predictor ready"
        );
        Ok(Self::with_predictor(config, predictor))
    }

    pub fn predictor(&self) -> Result<Arc<CostPredictor>, ServerError> {
        self.predictor.clone().ok_or_else(|| {
            ServerError::ModelUnavailable(format!(
                "no trained model loaded from {}",
                self.config.model_dir
            ))
        })
    }

    /// Schema of the loaded model, or the built-in one
    pub fn schema(&self) -> &FieldSchema {
        self.predictor
            .as_ref()
            .map(|p| p.schema())
            .unwrap_or(&self.fallback_schema)
    }

    pub fn model_loaded(&self) -> bool {
        self.predictor.is_some()
    }
}
