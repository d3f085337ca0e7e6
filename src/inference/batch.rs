//! Batch upload validation and scored results

use crate::error::{MetroCostError, Result};
use crate::schema::{FieldSchema, Rounding};
use crate::utils::column_names;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Column appended to a scored batch
pub const PREDICTION_COLUMN: &str = "Predicted Civil Cost (Cr)";
/// Column appended when at least one row failed
pub const ERROR_COLUMN: &str = "Prediction Error";

/// Rounding of reported costs, shared by the display and batch outputs
pub(crate) const COST_ROUNDING: Rounding = Rounding::HalfEven { digits: 2 };

/// Columns every batch row must carry: the schema's input fields
pub fn required_batch_columns(schema: &FieldSchema) -> Vec<String> {
    schema.input_fields().map(|f| f.name.clone()).collect()
}

/// Fail the whole batch when any required column is absent
pub fn validate_batch_columns(df: &DataFrame, schema: &FieldSchema) -> Result<()> {
    let present: HashSet<String> = column_names(df).into_iter().collect();
    let missing: Vec<String> = required_batch_columns(schema)
        .into_iter()
        .filter(|c| !present.contains(c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(MetroCostError::BatchValidation { missing })
    }
}

/// Outcome for one uploaded row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow {
    /// Zero-based position in the upload
    pub row: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_crore: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fields named by the error
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl BatchRow {
    pub fn scored(row: usize, cost_crore: f64) -> Self {
        Self {
            row,
            cost_crore: Some(cost_crore),
            error: None,
            fields: Vec::new(),
        }
    }

    pub fn failed(row: usize, err: &MetroCostError) -> Self {
        Self {
            row,
            cost_crore: None,
            error: Some(err.to_string()),
            fields: err.field_names(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.cost_crore.is_some()
    }
}

/// Per-row results in upload order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub rows: Vec<BatchRow>,
}

impl BatchReport {
    pub fn new(rows: Vec<BatchRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn failed(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_ok()).count()
    }

    /// Costs rounded to two decimals; `None` for failed rows
    pub fn predictions(&self) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|r| r.cost_crore.map(|c| COST_ROUNDING.apply(c)))
            .collect()
    }

    /// The uploaded frame with the prediction column appended.
    ///
    /// An error column is added too when any row failed.
    pub fn to_frame(&self, upload: &DataFrame) -> Result<DataFrame> {
        if upload.height() != self.rows.len() {
            return Err(MetroCostError::ShapeError {
                expected: format!("{} rows", self.rows.len()),
                actual: format!("{} rows", upload.height()),
            });
        }

        let mut out = upload.clone();
        out.with_column(Series::new(PREDICTION_COLUMN.into(), self.predictions()))?;
        if self.failed() > 0 {
            let errors: Vec<Option<String>> = self.rows.iter().map(|r| r.error.clone()).collect();
            out.with_column(Series::new(ERROR_COLUMN.into(), errors))?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_columns_are_inputs() {
        let cols = required_batch_columns(&FieldSchema::metro_station());
        assert_eq!(cols.len(), 16);
        assert!(cols.contains(&"Station_Length_m".to_string()));
        assert!(!cols.contains(&"Excavation_Volume_cum".to_string()));
    }

    #[test]
    fn test_missing_columns_fail_batch() {
        let df = df! {
            "City" => ["Delhi"],
            "Metro_Type" => ["underground"],
        }
        .unwrap();
        let err = validate_batch_columns(&df, &FieldSchema::metro_station()).unwrap_err();
        match err {
            MetroCostError::BatchValidation { missing } => {
                assert_eq!(missing.len(), 14);
                assert_eq!(missing[0], "Station_Typology");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_to_frame_appends_columns() {
        let df = df! { "City" => ["Delhi", "Pune"] }.unwrap();
        let report = BatchReport::new(vec![
            BatchRow::scored(0, 312.456),
            BatchRow::failed(1, &MetroCostError::missing_field("Soil_Type")),
        ]);
        let out = report.to_frame(&df).unwrap();
        assert_eq!(out.width(), 3);
        let preds = out
            .column(PREDICTION_COLUMN)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .clone();
        assert_eq!(preds.get(0), Some(312.46));
        assert_eq!(preds.get(1), None);
        assert_eq!(report.failed(), 1);
    }
}
