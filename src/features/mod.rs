//! Station records and engineered-field derivation
//!
//! A [`Record`] maps field names to [`FieldValue`]s. Raw records carry only
//! what the user typed (or what a batch row holds); [`derive`] expands them
//! into complete records following the [`FieldSchema`](crate::schema::FieldSchema)
//! rules.

mod derive;

pub use derive::{derive, derive_with, DefaultPolicy};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value of a single record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view; text is parsed after trimming
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Category label; integral numbers render without a decimal point
    pub fn as_category(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(v) => v.to_string(),
            FieldValue::Float(v) if v.fract() == 0.0 && v.is_finite() => {
                format!("{}", *v as i64)
            }
            FieldValue::Float(v) => v.to_string(),
        }
    }

    /// Build a numeric value, keeping integral results as integers.
    /// Values outside the `i64` range stay floats.
    pub fn from_number(value: f64, integral: bool) -> Self {
        // `i64::MAX as f64` rounds up to 2^63, hence the strict upper bound
        if integral && value >= i64::MIN as f64 && value < i64::MAX as f64 {
            FieldValue::Int(value as i64)
        } else {
            FieldValue::Float(value)
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

/// One station's parameter set, raw or derived
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Numeric value of a field, if present and numeric
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_untagged_json() {
        let record: Record =
            serde_json::from_str(r#"{"City": "Delhi", "Levels": 2, "Regional_Cost_Index": 1.05}"#)
                .unwrap();
        assert_eq!(record.get("City"), Some(&FieldValue::Text("Delhi".into())));
        assert_eq!(record.get("Levels"), Some(&FieldValue::Int(2)));
        assert_eq!(record.get("Regional_Cost_Index"), Some(&FieldValue::Float(1.05)));
    }

    #[test]
    fn test_category_labels() {
        assert_eq!(FieldValue::Int(3).as_category(), "3");
        assert_eq!(FieldValue::Float(3.0).as_category(), "3");
        assert_eq!(FieldValue::Float(2.5).as_category(), "2.5");
        assert_eq!(FieldValue::from("II").as_category(), "II");
    }

    #[test]
    fn test_text_parses_as_number() {
        assert_eq!(FieldValue::from(" 180 ").as_f64(), Some(180.0));
        assert_eq!(FieldValue::from("deep").as_f64(), None);
    }

    #[test]
    fn test_from_number_keeps_out_of_range_as_float() {
        assert_eq!(FieldValue::from_number(1e30, true), FieldValue::Float(1e30));
        assert_eq!(FieldValue::from_number(-1e30, true), FieldValue::Float(-1e30));
        assert_eq!(FieldValue::from_number(42.0, true), FieldValue::Int(42));
        assert!(matches!(FieldValue::from_number(f64::NAN, true), FieldValue::Float(v) if v.is_nan()));
    }
}
