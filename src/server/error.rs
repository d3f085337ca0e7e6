//! Error types for the server

use crate::error::MetroCostError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Estimator(#[from] MetroCostError),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Estimator(err) => match err {
                MetroCostError::SchemaMismatch { .. }
                | MetroCostError::ColumnOrderMismatch { .. }
                | MetroCostError::BatchValidation { .. }
                | MetroCostError::ShapeError { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                MetroCostError::InvalidValue { .. }
                | MetroCostError::DataError(_)
                | MetroCostError::SerializationError(_) => StatusCode::BAD_REQUEST,
                MetroCostError::ModelNotFitted => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(detail = %self, "Internal server error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let mut body = json!({
            "error": true,
            "message": message,
        });

        if let ServerError::Estimator(err) = &self {
            let names = err.field_names();
            if !names.is_empty() {
                body["fields"] = json!(names);
            }
            if let MetroCostError::BatchValidation { missing } = err {
                body["missing"] = json!(missing);
            }
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let schema = ServerError::from(MetroCostError::missing_field("City"));
        assert_eq!(schema.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let value = ServerError::from(MetroCostError::InvalidValue {
            field: "Levels".into(),
            value: "many".into(),
            expected: "a number".into(),
        });
        assert_eq!(value.status(), StatusCode::BAD_REQUEST);

        let io = ServerError::from(MetroCostError::IoError(std::io::Error::other("disk")));
        assert_eq!(io.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            ServerError::ModelUnavailable("none".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
