//! Engineered-field derivation

use super::{FieldValue, Record};
use crate::error::{MetroCostError, Result};
use crate::schema::{Derivation, FieldKind, FieldSchema, FieldSpec};

/// What to do when an input field is absent from the raw record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPolicy {
    /// Fill from the schema default (interactive submissions)
    Fill,
    /// Treat every absent input as missing (batch rows)
    Require,
}

/// Derive a complete record from raw inputs, filling defaults
pub fn derive(raw: &Record, schema: &FieldSchema) -> Result<Record> {
    derive_with(raw, schema, DefaultPolicy::Fill)
}

/// Derive a complete record from raw inputs.
///
/// Inputs are resolved first, then every derived field in schema order, so
/// rules always see the resolved inputs. Derived fields are recomputed even
/// when the raw record supplies them. Gated numeric fields end up zero while
/// their gate is closed.
pub fn derive_with(raw: &Record, schema: &FieldSchema, policy: DefaultPolicy) -> Result<Record> {
    let mut record = Record::new();
    let mut missing = Vec::new();

    for spec in schema.input_fields() {
        let supplied = raw.get(&spec.name).filter(|v| !is_blank(v));
        let value = match (supplied, &spec.source, policy) {
            (Some(value), _, _) => value.clone(),
            (None, Derivation::Input { default: Some(default) }, DefaultPolicy::Fill) => {
                default.clone()
            }
            _ => {
                missing.push(spec.name.clone());
                continue;
            }
        };
        record.insert(spec.name.clone(), coerce(spec, value)?);
    }

    if !missing.is_empty() {
        return Err(MetroCostError::SchemaMismatch { fields: missing });
    }

    for spec in schema.fields.iter().filter(|f| !f.source.is_input()) {
        let value = evaluate(&spec.source, &record, spec)?;
        record.insert(spec.name.clone(), coerce(spec, value)?);
    }

    for spec in schema.numeric_fields() {
        if let Some(gate) = &spec.gate {
            let open = record
                .get(&gate.field)
                .map(|v| v.as_category() == gate.open_when)
                .unwrap_or(false);
            if !open {
                record.insert(spec.name.clone(), FieldValue::Int(0));
            }
        }
    }

    Ok(record)
}

fn is_blank(value: &FieldValue) -> bool {
    matches!(value, FieldValue::Text(s) if s.trim().is_empty())
}

fn evaluate(rule: &Derivation, record: &Record, spec: &FieldSpec) -> Result<FieldValue> {
    match rule {
        Derivation::Input { .. } => record
            .get(&spec.name)
            .cloned()
            .ok_or_else(|| MetroCostError::missing_field(&spec.name)),
        Derivation::Constant { value } => Ok(value.clone()),
        Derivation::Scaled {
            factors,
            scale,
            rounding,
        } => {
            let mut product = 1.0;
            for factor in factors {
                let value = record
                    .get(factor)
                    .ok_or_else(|| MetroCostError::missing_field(factor))?;
                product *= value.as_f64().ok_or_else(|| MetroCostError::InvalidValue {
                    field: factor.clone(),
                    value: value.to_string(),
                    expected: "a number".to_string(),
                })?;
            }
            let value = rounding.apply(product * scale);
            Ok(FieldValue::from_number(value, rounding.is_integral()))
        }
        Derivation::When {
            field,
            equals,
            then,
            otherwise,
        } => {
            let flag = record
                .get(field)
                .ok_or_else(|| MetroCostError::missing_field(field))?;
            if flag.as_category() == *equals {
                evaluate(then, record, spec)
            } else {
                evaluate(otherwise, record, spec)
            }
        }
    }
}

/// Normalise a value to the field's kind
fn coerce(spec: &FieldSpec, value: FieldValue) -> Result<FieldValue> {
    match spec.kind {
        FieldKind::Categorical => Ok(FieldValue::Text(value.as_category())),
        FieldKind::Numeric => match value {
            FieldValue::Text(ref s) => {
                let parsed = value.as_f64().ok_or_else(|| MetroCostError::InvalidValue {
                    field: spec.name.clone(),
                    value: s.clone(),
                    expected: "a number".to_string(),
                })?;
                if !parsed.is_finite() {
                    return Err(MetroCostError::InvalidValue {
                        field: spec.name.clone(),
                        value: s.clone(),
                        expected: "a finite number".to_string(),
                    });
                }
                Ok(FieldValue::from_number(parsed, parsed.fract() == 0.0))
            }
            FieldValue::Float(v) if !v.is_finite() => Err(MetroCostError::InvalidValue {
                field: spec.name.clone(),
                value: v.to_string(),
                expected: "a finite number".to_string(),
            }),
            numeric => Ok(numeric),
        },
    }
}
