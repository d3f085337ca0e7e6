//! One-hot category vocabulary

use crate::features::Record;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Categories observed for one field during training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryField {
    pub name: String,
    /// Sorted, de-duplicated
    pub categories: Vec<String>,
}

impl CategoryField {
    /// Encoded column names, `<field>_<category>`
    pub fn column_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("{}_{}", self.name, c))
            .collect()
    }

    /// Indicator block for one value; unseen values give all zeros
    pub fn indicators(&self, value: &str) -> Vec<f64> {
        let mut block = vec![0.0; self.categories.len()];
        match self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(idx) => block[idx] = 1.0,
            Err(_) => {
                debug!(field = %self.name, value = %value, "Unknown category encoded as zero block");
            }
        }
        block
    }

    pub fn contains(&self, value: &str) -> bool {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .is_ok()
    }
}

/// Training-time vocabulary for every categorical field, in schema order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    fields: Vec<CategoryField>,
}

impl CategoryVocabulary {
    pub fn new(fields: Vec<CategoryField>) -> Self {
        Self { fields }
    }

    /// Learn categories for `field_names` from training records.
    ///
    /// Records lacking a field contribute nothing for it.
    pub fn fit<'a>(records: &[Record], field_names: impl IntoIterator<Item = &'a str>) -> Self {
        let fields = field_names
            .into_iter()
            .map(|name| {
                let categories: BTreeSet<String> = records
                    .iter()
                    .filter_map(|r| r.get(name))
                    .map(|v| v.as_category())
                    .collect();
                CategoryField {
                    name: name.to_string(),
                    categories: categories.into_iter().collect(),
                }
            })
            .collect();

        Self { fields }
    }

    pub fn fields(&self) -> &[CategoryField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&CategoryField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// All encoded column names, field by field
    pub fn column_names(&self) -> Vec<String> {
        self.fields.iter().flat_map(|f| f.column_names()).collect()
    }

    /// Width of the encoded categorical block
    pub fn width(&self) -> usize {
        self.fields.iter().map(|f| f.categories.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new().with("City", "Pune").with("Soil_Type", "Rock"),
            Record::new().with("City", "Delhi").with("Soil_Type", "Clay"),
            Record::new().with("City", "Pune").with("Soil_Type", "Mixed"),
        ]
    }

    #[test]
    fn test_fit_sorts_and_dedups() {
        let vocab = CategoryVocabulary::fit(&records(), ["City", "Soil_Type"]);
        assert_eq!(vocab.field("City").unwrap().categories, vec!["Delhi", "Pune"]);
        assert_eq!(vocab.width(), 5);
        assert_eq!(
            vocab.column_names(),
            vec![
                "City_Delhi",
                "City_Pune",
                "Soil_Type_Clay",
                "Soil_Type_Mixed",
                "Soil_Type_Rock"
            ]
        );
    }

    #[test]
    fn test_unknown_category_is_zero_block() {
        let vocab = CategoryVocabulary::fit(&records(), ["City"]);
        let city = vocab.field("City").unwrap();
        assert_eq!(city.indicators("Pune"), vec![0.0, 1.0]);
        assert_eq!(city.indicators("Surat"), vec![0.0, 0.0]);
        assert!(!city.contains("Surat"));
    }
}
