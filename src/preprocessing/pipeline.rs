//! Feature pipeline: derive, encode, reorder

use super::encoder::CategoryVocabulary;
use crate::error::{MetroCostError, Result};
use crate::features::{self, DefaultPolicy, Record};
use crate::schema::{FieldKind, FieldSchema};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

/// Named values in assembly order, before reordering
#[derive(Debug, Clone, PartialEq)]
pub struct NamedVector {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

impl NamedVector {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }
}

/// Persisted sequence of feature names the model expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnOrder(Vec<String>);

impl ColumnOrder {
    pub fn new(columns: Vec<String>) -> Self {
        Self(columns)
    }

    pub fn columns(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Differences against another column set as (missing, unexpected).
    ///
    /// `missing` lists expected columns absent from `other`; `unexpected`
    /// lists columns of `other` not expected, duplicates included.
    pub fn diff<'a>(&self, other: impl IntoIterator<Item = &'a String>) -> (Vec<String>, Vec<String>) {
        let expected: HashSet<&str> = self.0.iter().map(|s| s.as_str()).collect();
        let mut seen = HashSet::new();
        let mut unexpected = Vec::new();
        for col in other {
            if !expected.contains(col.as_str()) || !seen.insert(col.as_str()) {
                unexpected.push(col.clone());
            }
        }
        let missing = self
            .0
            .iter()
            .filter(|c| !seen.contains(c.as_str()))
            .cloned()
            .collect();
        (missing, unexpected)
    }
}

/// Model input in exactly the persisted column order
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl EncodedVector {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

/// One-hot the categorical fields and append the numeric block.
///
/// Unknown categories encode as all-zero blocks. Every absent categorical or
/// numeric field is reported in a single `SchemaMismatch`. Gated numeric
/// fields read as zero while their gate is closed.
pub fn encode(
    record: &Record,
    vocabulary: &CategoryVocabulary,
    schema: &FieldSchema,
) -> Result<NamedVector> {
    let mut missing = Vec::new();
    let mut columns = Vec::with_capacity(vocabulary.width());
    let mut values = Vec::with_capacity(vocabulary.width());

    for field in vocabulary.fields() {
        match record.get(&field.name) {
            Some(value) => {
                columns.extend(field.column_names());
                values.extend(field.indicators(&value.as_category()));
            }
            None => missing.push(field.name.clone()),
        }
    }

    for spec in schema.numeric_fields() {
        let Some(value) = record.get(&spec.name) else {
            missing.push(spec.name.clone());
            continue;
        };
        let number = value
            .as_f64()
            .filter(|v| v.is_finite())
            .ok_or_else(|| MetroCostError::InvalidValue {
                field: spec.name.clone(),
                value: value.to_string(),
                expected: "a finite number".to_string(),
            })?;
        let gated_off = spec.gate.as_ref().is_some_and(|gate| {
            record
                .get(&gate.field)
                .map(|v| v.as_category() != gate.open_when)
                .unwrap_or(true)
        });
        columns.push(spec.name.clone());
        values.push(if gated_off { 0.0 } else { number });
    }

    if !missing.is_empty() {
        return Err(MetroCostError::SchemaMismatch { fields: missing });
    }

    Ok(NamedVector { columns, values })
}

/// Reindex a partial vector to the persisted column order.
///
/// Any missing, unexpected or duplicated column is a hard failure.
pub fn reorder(partial: &NamedVector, column_order: &ColumnOrder) -> Result<EncodedVector> {
    let (missing, unexpected) = column_order.diff(partial.columns.iter());
    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(MetroCostError::ColumnOrderMismatch {
            missing,
            unexpected,
        });
    }

    let index: HashMap<&str, f64> = partial
        .columns
        .iter()
        .map(|c| c.as_str())
        .zip(partial.values.iter().copied())
        .collect();

    let values = column_order
        .columns()
        .iter()
        .map(|c| index[c.as_str()])
        .collect();

    Ok(EncodedVector {
        columns: column_order.columns().to_vec(),
        values,
    })
}

/// Fitted preprocessing state shared by training and serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePipeline {
    schema: FieldSchema,
    vocabulary: CategoryVocabulary,
    column_order: ColumnOrder,
}

impl FeaturePipeline {
    /// Learn vocabularies from training records and fix the column order
    pub fn fit(records: &[Record], schema: &FieldSchema) -> Result<Self> {
        schema.validate()?;
        if records.is_empty() {
            return Err(MetroCostError::TrainingError(
                "cannot fit pipeline on zero records".to_string(),
            ));
        }

        let vocabulary =
            CategoryVocabulary::fit(records, schema.categorical_fields().map(|f| f.name.as_str()));

        let mut columns = vocabulary.column_names();
        columns.extend(schema.numeric_fields().map(|f| f.name.clone()));

        info!(
            categorical = vocabulary.fields().len(),
            numeric = schema.numeric_fields().count(),
            encoded_width = columns.len(),
            "Feature pipeline fitted"
        );

        Ok(Self {
            schema: schema.clone(),
            vocabulary,
            column_order: ColumnOrder::new(columns),
        })
    }

    /// Reassemble a pipeline from persisted parts, checking they agree
    pub fn from_parts(
        schema: FieldSchema,
        vocabulary: CategoryVocabulary,
        column_order: ColumnOrder,
    ) -> Result<Self> {
        schema.validate()?;

        let schema_categorical: Vec<String> =
            schema.categorical_fields().map(|f| f.name.clone()).collect();
        if vocabulary.field_names() != schema_categorical {
            return Err(MetroCostError::ConfigError(format!(
                "vocabulary fields [{}] do not match schema categorical fields [{}]",
                vocabulary.field_names().join(", "),
                schema_categorical.join(", ")
            )));
        }

        let mut produced = vocabulary.column_names();
        produced.extend(schema.numeric_fields().map(|f| f.name.clone()));
        let (missing, unexpected) = column_order.diff(produced.iter());
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(MetroCostError::ColumnOrderMismatch {
                missing,
                unexpected,
            });
        }

        Ok(Self {
            schema,
            vocabulary,
            column_order,
        })
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn vocabulary(&self) -> &CategoryVocabulary {
        &self.vocabulary
    }

    pub fn column_order(&self) -> &ColumnOrder {
        &self.column_order
    }

    /// Derive a full record from raw inputs, filling defaults
    pub fn derive(&self, raw: &Record) -> Result<Record> {
        features::derive(raw, &self.schema)
    }

    pub fn derive_with(&self, raw: &Record, policy: DefaultPolicy) -> Result<Record> {
        features::derive_with(raw, &self.schema, policy)
    }

    pub fn encode(&self, record: &Record) -> Result<NamedVector> {
        encode(record, &self.vocabulary, &self.schema)
    }

    /// Encode then reorder a derived record
    pub fn transform_record(&self, record: &Record) -> Result<EncodedVector> {
        let partial = self.encode(record)?;
        reorder(&partial, &self.column_order)
    }

    /// Transform many records into a row-major feature matrix
    pub fn transform_records(&self, records: &[Record]) -> Result<Array2<f64>> {
        let rows: Vec<Vec<f64>> = records
            .par_iter()
            .map(|r| self.transform_record(r).map(EncodedVector::into_values))
            .collect::<Result<_>>()?;

        let n_cols = self.column_order.len();
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((records.len(), n_cols), flat)?)
    }

    /// Numeric fields whose value is a pass-through of the record
    pub fn numeric_columns(&self) -> Vec<String> {
        self.schema
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::Numeric)
            .map(|f| f.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::derive;

    fn fitted() -> FeaturePipeline {
        let schema = FieldSchema::metro_station();
        let records: Vec<Record> = [
            ("Delhi", "underground", "Yes"),
            ("Mumbai", "elevated", "No"),
            ("Pune", "underground", "No"),
        ]
        .iter()
        .map(|(city, kind, tbm)| {
            let raw = Record::new()
                .with("City", *city)
                .with("Metro_Type", *kind)
                .with("TBM_Used", *tbm);
            derive(&raw, &schema).unwrap()
        })
        .collect();
        FeaturePipeline::fit(&records, &schema).unwrap()
    }

    #[test]
    fn test_column_order_layout() {
        let pipeline = fitted();
        let cols = pipeline.column_order().columns();
        assert_eq!(cols[0], "City_Delhi");
        assert_eq!(cols[1], "City_Mumbai");
        assert_eq!(cols[2], "City_Pune");
        assert_eq!(cols.last().unwrap(), "TBM_Diameter_m");
        assert_eq!(
            cols.len(),
            pipeline.vocabulary().width() + pipeline.numeric_columns().len()
        );
    }

    #[test]
    fn test_transform_matches_column_order() {
        let pipeline = fitted();
        let record = pipeline
            .derive(&Record::new().with("City", "Chennai"))
            .unwrap();
        let vector = pipeline.transform_record(&record).unwrap();
        assert_eq!(vector.columns(), pipeline.column_order().columns());
        // Chennai was never seen: whole City block is zero
        assert_eq!(&vector.values()[..3], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_encode_reports_all_missing_fields() {
        let pipeline = fitted();
        let mut record = pipeline.derive(&Record::new()).unwrap();
        record.remove("City");
        record.remove("RCC_Volume_cum");
        let err = pipeline.encode(&record).unwrap_err();
        match err {
            MetroCostError::SchemaMismatch { fields } => {
                assert_eq!(fields, vec!["City", "RCC_Volume_cum"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encode_masks_closed_gate() {
        let pipeline = fitted();
        let mut record = pipeline
            .derive(&Record::new().with("TBM_Used", "No"))
            .unwrap();
        record.insert("TBM_Diameter_m", 6.5);
        let partial = pipeline.encode(&record).unwrap();
        assert_eq!(partial.get("TBM_Diameter_m"), Some(0.0));
    }

    #[test]
    fn test_reorder_rejects_missing_and_unexpected() {
        let order = ColumnOrder::new(vec!["a".into(), "b".into(), "c".into()]);
        let partial = NamedVector {
            columns: vec!["c".into(), "a".into(), "z".into()],
            values: vec![3.0, 1.0, 9.0],
        };
        let err = reorder(&partial, &order).unwrap_err();
        match err {
            MetroCostError::ColumnOrderMismatch { missing, unexpected } => {
                assert_eq!(missing, vec!["b"]);
                assert_eq!(unexpected, vec!["z"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reorder_rejects_duplicates() {
        let order = ColumnOrder::new(vec!["a".into(), "b".into()]);
        let partial = NamedVector {
            columns: vec!["a".into(), "b".into(), "a".into()],
            values: vec![1.0, 2.0, 1.0],
        };
        assert!(matches!(
            reorder(&partial, &order),
            Err(MetroCostError::ColumnOrderMismatch { .. })
        ));
    }

    #[test]
    fn test_reorder_permutes() {
        let order = ColumnOrder::new(vec!["a".into(), "b".into(), "c".into()]);
        let partial = NamedVector {
            columns: vec!["c".into(), "a".into(), "b".into()],
            values: vec![3.0, 1.0, 2.0],
        };
        let vector = reorder(&partial, &order).unwrap();
        assert_eq!(vector.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_parts_detects_drift() {
        let pipeline = fitted();
        let mut cols = pipeline.column_order().columns().to_vec();
        cols.pop();
        cols.push("Tunnel_Length_m".to_string());
        let err = FeaturePipeline::from_parts(
            pipeline.schema().clone(),
            pipeline.vocabulary().clone(),
            ColumnOrder::new(cols),
        )
        .unwrap_err();
        assert!(matches!(err, MetroCostError::ColumnOrderMismatch { .. }));
    }
}
