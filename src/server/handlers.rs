//! HTTP request handlers

use super::error::{Result, ServerError};
use super::form::render_index;
use super::state::AppState;
use crate::features::Record;
use crate::inference::{required_batch_columns, BatchReport};
use crate::schema::Derivation;
use crate::utils::DataLoader;
use axum::{
    extract::{rejection::JsonRejection, Multipart, Query, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use polars::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

// ============================================================================
// System
// ============================================================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.model_loaded(),
        "uptime_secs": uptime.num_seconds(),
    }))
}

/// Input fields with their form hints
pub async fn get_schema(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let schema = state.schema();
    let fields: Vec<serde_json::Value> = schema
        .input_fields()
        .map(|spec| {
            let default = match &spec.source {
                Derivation::Input { default } => default.clone(),
                _ => None,
            };
            json!({
                "name": spec.name,
                "label": spec.display_label(),
                "kind": spec.kind,
                "default": default,
                "choices": spec.choices,
                "range": spec.range,
                "gate": spec.gate,
            })
        })
        .collect();

    Json(json!({
        "target": schema.target,
        "fields": fields,
        "derived": schema
            .fields
            .iter()
            .filter(|f| !f.source.is_input())
            .map(|f| f.name.clone())
            .collect::<Vec<_>>(),
        "required_batch_columns": required_batch_columns(schema),
    }))
}

pub async fn get_model(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    let predictor = state.predictor()?;
    Ok(Json(json!({
        "model_dir": state.config.model_dir,
        "summary": predictor.summary(),
        "columns": predictor.pipeline().column_order(),
    })))
}

// ============================================================================
// Prediction
// ============================================================================

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Record>, JsonRejection>,
) -> Result<Json<serde_json::Value>> {
    let Json(raw) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let predictor = state.predictor()?;

    let estimate = predictor.predict_inputs(&raw)?;
    info!(cost_crore = estimate.cost_crore, "Prediction served");

    Ok(Json(json!({
        "success": true,
        "cost_crore": estimate.cost_crore,
        "display": estimate.display(),
        "derived": estimate.record,
    })))
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    /// `json` (default) or `csv`
    pub format: Option<String>,
}

/// Score an uploaded file.
///
/// A missing required column rejects the whole upload with 422 before any
/// row is scored. With `?format=csv` the upload comes back as CSV with the
/// prediction column appended.
pub async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BatchQuery>,
    mut multipart: Multipart,
) -> Result<Response> {
    let predictor = state.predictor()?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(e.to_string()))?
    {
        if field.file_name().is_none() && field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload.csv").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
        upload = Some((file_name, data.to_vec()));
        break;
    }
    let (file_name, data) =
        upload.ok_or_else(|| ServerError::BadRequest("no file field in upload".to_string()))?;

    info!(file = %file_name, bytes = data.len(), "Received batch upload");

    let as_csv = matches!(query.format.as_deref(), Some("csv"));
    let scored = tokio::task::spawn_blocking(move || -> crate::error::Result<_> {
        let df = DataLoader::new().read_bytes(data, &file_name)?;
        let report = predictor.predict_batch(&df)?;
        let csv = if as_csv {
            Some(render_csv(&report, &df)?)
        } else {
            None
        };
        Ok((report, csv))
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    match scored {
        (_, Some(csv)) => Ok((
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"predicted_costs.csv\"",
                ),
            ],
            csv,
        )
            .into_response()),
        (report, None) => Ok(Json(json!({
            "success": true,
            "count": report.len(),
            "failed": report.failed(),
            "predictions": report.predictions(),
            "rows": report.rows,
        }))
        .into_response()),
    }
}

fn render_csv(report: &BatchReport, upload: &DataFrame) -> crate::error::Result<Vec<u8>> {
    let mut out = report.to_frame(upload)?;
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf).include_header(true).finish(&mut out)?;
    Ok(buf)
}

// ============================================================================
// UI Handler
// ============================================================================

pub async fn serve_index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_index(state.schema(), state.model_loaded()))
}
