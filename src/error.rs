//! Error types for the metro cost estimator

use thiserror::Error;

/// Result type alias for estimator operations
pub type Result<T> = std::result::Result<T, MetroCostError>;

/// Main error type for the estimator
#[derive(Error, Debug)]
pub enum MetroCostError {
    /// One or more required fields are absent from a record or frame
    #[error("Schema mismatch: missing required field(s) {}", .fields.join(", "))]
    SchemaMismatch { fields: Vec<String> },

    /// Encoded columns disagree with the persisted column order
    #[error(
        "Column order mismatch: missing [{}], unexpected [{}]",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    ColumnOrderMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// An uploaded batch lacks required columns
    #[error("Batch validation failed: missing column(s) {}", .missing.join(", "))]
    BatchValidation { missing: Vec<String> },

    #[error("Invalid value for {field}: {value:?} (expected {expected})")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl MetroCostError {
    /// Shorthand for a schema mismatch on a single field
    pub fn missing_field(name: impl Into<String>) -> Self {
        MetroCostError::SchemaMismatch {
            fields: vec![name.into()],
        }
    }

    /// Field names carried by schema, column-order and batch errors
    pub fn field_names(&self) -> Vec<String> {
        match self {
            MetroCostError::SchemaMismatch { fields } => fields.clone(),
            MetroCostError::BatchValidation { missing } => missing.clone(),
            MetroCostError::ColumnOrderMismatch { missing, unexpected } => {
                missing.iter().chain(unexpected.iter()).cloned().collect()
            }
            MetroCostError::InvalidValue { field, .. } => vec![field.clone()],
            _ => Vec::new(),
        }
    }
}

impl From<polars::error::PolarsError> for MetroCostError {
    fn from(err: polars::error::PolarsError) -> Self {
        MetroCostError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for MetroCostError {
    fn from(err: serde_json::Error) -> Self {
        MetroCostError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MetroCostError {
    fn from(err: ndarray::ShapeError) -> Self {
        MetroCostError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
