//! Declarative field schema
//!
//! A [`FieldSchema`] is the single definition of the station record shared by
//! training and serving. Each [`FieldSpec`] fixes:
//! - whether the field is categorical or numeric
//! - where its value comes from (user input, preset constant, or a derivation
//!   rule over other fields)
//! - optional form hints (choices, numeric range)
//! - an optional gate that zeroes a numeric field when a companion
//!   categorical flag is off
//!
//! The schema is persisted with every trained model, so the serving side
//! always derives and encodes records exactly the way the training side did.

mod infer;
mod metro;

use crate::error::{MetroCostError, Result};
use crate::features::FieldValue;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Column data kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Finite string domain, one-hot encoded
    Categorical,
    /// Continuous or discrete measure, passed through
    Numeric,
}

/// Rounding applied after a scaled derivation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Rounding {
    /// Keep the raw product
    #[default]
    None,
    /// Round half to even at `digits` decimals
    HalfEven { digits: u32 },
    /// Drop the fractional part (toward zero)
    Truncate,
}

impl Rounding {
    /// Apply the rounding rule
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Rounding::None => value,
            Rounding::HalfEven { digits } => {
                let factor = 10f64.powi(*digits as i32);
                (value * factor).round_ties_even() / factor
            }
            Rounding::Truncate => value.trunc(),
        }
    }

    /// Whether the rounded value is always integral
    pub fn is_integral(&self) -> bool {
        matches!(self, Rounding::HalfEven { digits: 0 } | Rounding::Truncate)
    }
}

/// How a field's value is obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Derivation {
    /// Supplied by the user; `default` fills interactive submissions
    Input {
        #[serde(default)]
        default: Option<FieldValue>,
    },
    /// Fixed preset value
    Constant { value: FieldValue },
    /// Product of numeric fields times `scale`, then rounded
    Scaled {
        factors: Vec<String>,
        scale: f64,
        #[serde(default)]
        rounding: Rounding,
    },
    /// Conditional on a categorical field
    When {
        field: String,
        equals: String,
        then: Box<Derivation>,
        otherwise: Box<Derivation>,
    },
}

impl Derivation {
    /// Input with a default value
    pub fn input(default: impl Into<FieldValue>) -> Self {
        Derivation::Input {
            default: Some(default.into()),
        }
    }

    /// Input without a default
    pub fn required_input() -> Self {
        Derivation::Input { default: None }
    }

    pub fn constant(value: impl Into<FieldValue>) -> Self {
        Derivation::Constant {
            value: value.into(),
        }
    }

    pub fn scaled(factors: &[&str], scale: f64, rounding: Rounding) -> Self {
        Derivation::Scaled {
            factors: factors.iter().map(|f| f.to_string()).collect(),
            scale,
            rounding,
        }
    }

    pub fn when(field: &str, equals: &str, then: Derivation, otherwise: Derivation) -> Self {
        Derivation::When {
            field: field.to_string(),
            equals: equals.to_string(),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Whether the value is supplied by the user
    pub fn is_input(&self) -> bool {
        matches!(self, Derivation::Input { .. })
    }

    /// Fields this rule reads
    pub fn references(&self) -> Vec<&str> {
        match self {
            Derivation::Input { .. } | Derivation::Constant { .. } => Vec::new(),
            Derivation::Scaled { factors, .. } => factors.iter().map(|s| s.as_str()).collect(),
            Derivation::When {
                field,
                then,
                otherwise,
                ..
            } => {
                let mut refs = vec![field.as_str()];
                refs.extend(then.references());
                refs.extend(otherwise.references());
                refs
            }
        }
    }

    fn contains_nested_input(&self) -> bool {
        match self {
            Derivation::When { then, otherwise, .. } => {
                then.is_input()
                    || otherwise.is_input()
                    || then.contains_nested_input()
                    || otherwise.contains_nested_input()
            }
            _ => false,
        }
    }
}

/// Numeric bounds used as form hints
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
}

/// Numeric field that is only meaningful while a categorical flag is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// Categorical companion field
    pub field: String,
    /// Value of the companion that keeps the gated field live
    pub open_when: String,
}

/// One field of the station record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub source: Derivation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<FieldValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<NumericRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Gate>,
}

impl FieldSpec {
    pub fn categorical(name: &str, source: Derivation) -> Self {
        Self::new(name, FieldKind::Categorical, source)
    }

    pub fn numeric(name: &str, source: Derivation) -> Self {
        Self::new(name, FieldKind::Numeric, source)
    }

    fn new(name: &str, kind: FieldKind, source: Derivation) -> Self {
        Self {
            name: name.to_string(),
            kind,
            source,
            label: None,
            choices: None,
            range: None,
            gate: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_choices<V: Into<FieldValue>>(mut self, choices: impl IntoIterator<Item = V>) -> Self {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range(mut self, min: f64, max: Option<f64>, step: Option<f64>) -> Self {
        self.range = Some(NumericRange { min, max, step });
        self
    }

    pub fn with_gate(mut self, field: &str, open_when: &str) -> Self {
        self.gate = Some(Gate {
            field: field.to_string(),
            open_when: open_when.to_string(),
        });
        self
    }

    /// Human-readable label, falling back to the field name
    pub fn display_label(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.name.replace('_', " "))
    }
}

/// Ordered field definitions plus the training target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Target column in training data
    pub target: String,
    pub fields: Vec<FieldSpec>,
}

impl FieldSchema {
    pub fn new(target: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            target: target.into(),
            fields,
        }
    }

    /// Load a schema from a JSON file and validate it
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let schema: Self = serde_json::from_str(&json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Write the schema as pretty JSON
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn categorical_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields
            .iter()
            .filter(|f| f.kind == FieldKind::Categorical)
    }

    pub fn numeric_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Numeric)
    }

    /// Fields the user supplies
    pub fn input_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.source.is_input())
    }

    /// Columns a training frame must carry: every field plus the target
    pub fn training_columns(&self) -> Vec<String> {
        let mut cols = self.field_names();
        cols.push(self.target.clone());
        cols
    }

    /// Check structural consistency.
    ///
    /// Rules may read any input field, or any derived field defined earlier
    /// in schema order. Gates must point at categorical fields.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(MetroCostError::ConfigError(
                "schema defines no fields".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(MetroCostError::ConfigError(format!(
                    "duplicate field {}",
                    field.name
                )));
            }
        }
        if seen.contains(self.target.as_str()) {
            return Err(MetroCostError::ConfigError(format!(
                "target {} is also declared as a feature",
                self.target
            )));
        }

        let mut resolvable: HashSet<&str> = self
            .input_fields()
            .map(|f| f.name.as_str())
            .collect();

        for field in &self.fields {
            if field.source.contains_nested_input() {
                return Err(MetroCostError::ConfigError(format!(
                    "{}: input rules cannot be nested inside a conditional",
                    field.name
                )));
            }

            for reference in field.source.references() {
                if !resolvable.contains(reference) {
                    return Err(MetroCostError::ConfigError(format!(
                        "{} reads {} before it is defined",
                        field.name, reference
                    )));
                }
            }

            if let Derivation::Scaled { factors, .. } = &field.source {
                for factor in factors {
                    if self.field(factor).map(|f| f.kind) != Some(FieldKind::Numeric) {
                        return Err(MetroCostError::ConfigError(format!(
                            "{}: factor {} is not numeric",
                            field.name, factor
                        )));
                    }
                }
            }

            if let Some(gate) = &field.gate {
                if field.kind != FieldKind::Numeric {
                    return Err(MetroCostError::ConfigError(format!(
                        "{}: only numeric fields can be gated",
                        field.name
                    )));
                }
                if self.field(&gate.field).map(|f| f.kind) != Some(FieldKind::Categorical) {
                    return Err(MetroCostError::ConfigError(format!(
                        "{}: gate field {} is not categorical",
                        field.name, gate.field
                    )));
                }
            }

            resolvable.insert(field.name.as_str());
        }

        Ok(())
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::metro_station()
    }
}
