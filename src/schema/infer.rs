//! Schema inference from a training frame

use super::{Derivation, FieldKind, FieldSchema, FieldSpec};
use crate::error::{MetroCostError, Result};
use polars::prelude::*;
use tracing::debug;

/// Diameter columns gated by their machine-used flag when both appear
const GATED_COLUMNS: [(&str, &str, &str); 1] = [("TBM_Diameter_m", "TBM_Used", "Yes")];

impl FieldSchema {
    /// Infer a schema from column dtypes.
    ///
    /// String columns become categorical, numeric columns numeric, and every
    /// field is a plain input. Boolean and temporal columns are skipped.
    pub fn infer_from_frame(df: &DataFrame, target: &str) -> Result<Self> {
        if df.column(target).is_err() {
            return Err(MetroCostError::missing_field(target));
        }

        let mut fields = Vec::new();
        for column in df.get_columns() {
            let name = column.name().to_string();
            if name == target {
                continue;
            }

            let kind = match column.dtype() {
                DataType::String => FieldKind::Categorical,
                dtype if dtype.is_numeric() => FieldKind::Numeric,
                other => {
                    debug!(column = %name, dtype = ?other, "Skipping column with unsupported dtype");
                    continue;
                }
            };

            fields.push(FieldSpec {
                name,
                kind,
                source: Derivation::required_input(),
                label: None,
                choices: None,
                range: None,
                gate: None,
            });
        }

        for (gated, flag, open_when) in GATED_COLUMNS {
            let flag_is_categorical = fields
                .iter()
                .any(|f| f.name == flag && f.kind == FieldKind::Categorical);
            if !flag_is_categorical {
                continue;
            }
            if let Some(field) = fields
                .iter_mut()
                .find(|f| f.name == gated && f.kind == FieldKind::Numeric)
            {
                field.gate = Some(super::Gate {
                    field: flag.to_string(),
                    open_when: open_when.to_string(),
                });
            }
        }

        let schema = Self::new(target, fields);
        schema.validate()?;
        Ok(schema)
    }
}
