//! Synthetic station data
//!
//! Seeded generator of historical station records, used for demos, tests and
//! benches when no real cost history is at hand. Inputs are drawn from each
//! field's form choices or range, engineered fields are derived with the same
//! rules the estimator uses, and the target follows a fixed unit-rate cost
//! model with a small multiplicative noise term.

use crate::error::Result;
use crate::features::{derive, FieldValue, Record};
use crate::schema::{Derivation, FieldKind, FieldSchema, FieldSpec};
use crate::utils::records_to_frame;
use polars::prelude::DataFrame;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Upper bound used for numeric inputs declared with only a minimum
const OPEN_RANGE_SPAN: f64 = 5000.0;

/// Seeded generator of station records with a cost target
#[derive(Debug, Clone)]
pub struct StationGenerator {
    seed: u64,
    /// Relative half-width of the uniform noise on the cost
    noise: f64,
}

impl StationGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed, noise: 0.05 }
    }

    /// Set the relative noise (0 gives a deterministic cost model)
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Derived records, each carrying the target column
    pub fn records(&self, n: usize, schema: &FieldSchema) -> Result<Vec<Record>> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut records = Vec::with_capacity(n);

        for _ in 0..n {
            let mut raw = Record::new();
            for spec in schema.input_fields() {
                raw.insert(spec.name.clone(), draw_input(spec, &mut rng));
            }
            let mut record = derive(&raw, schema)?;

            let noise = if self.noise > 0.0 {
                rng.gen_range(-self.noise..self.noise)
            } else {
                0.0
            };
            let cost = (station_cost(&record) * (1.0 + noise) * 100.0).round() / 100.0;
            record.insert(schema.target.clone(), cost);
            records.push(record);
        }

        debug!(rows = n, seed = self.seed, "Generated synthetic stations");
        Ok(records)
    }

    /// Frame with every schema column followed by the target
    pub fn generate(&self, n: usize, schema: &FieldSchema) -> Result<DataFrame> {
        let records = self.records(n, schema)?;
        records_to_frame(&records, &schema.training_columns())
    }
}

fn draw_input<R: Rng>(spec: &FieldSpec, rng: &mut R) -> FieldValue {
    if let Some(choices) = spec.choices.as_ref().filter(|c| !c.is_empty()) {
        return choices[rng.gen_range(0..choices.len())].clone();
    }

    let default = match &spec.source {
        Derivation::Input { default } => default.clone(),
        _ => None,
    };

    match spec.kind {
        FieldKind::Categorical => default.unwrap_or_else(|| FieldValue::from("Unknown")),
        FieldKind::Numeric => {
            let Some(range) = spec.range else {
                return default.unwrap_or(FieldValue::Int(rng.gen_range(0..100)));
            };
            let max = range.max.unwrap_or(range.min + OPEN_RANGE_SPAN);
            let step = range.step.filter(|s| *s > 0.0);
            let value = rng.gen_range(range.min..=max);
            match step {
                Some(step) => {
                    let snapped = range.min + ((value - range.min) / step).round() * step;
                    let snapped = snapped.min(max);
                    if step.fract() == 0.0 {
                        FieldValue::Int(snapped.round() as i64)
                    } else {
                        // keep as many decimals as the step has
                        let decimals = (-step.log10().floor()).max(0.0) as i32;
                        let factor = 10f64.powi(decimals);
                        FieldValue::Float((snapped * factor).round() / factor)
                    }
                }
                None => FieldValue::Float(value),
            }
        }
    }
}

fn number(record: &Record, name: &str) -> f64 {
    record.number(name).unwrap_or(0.0)
}

fn category(record: &Record, name: &str) -> Option<String> {
    record.get(name).map(FieldValue::as_category)
}

/// Unit-rate civil cost in crore
fn station_cost(record: &Record) -> f64 {
    let underground = category(record, "Metro_Type").as_deref() != Some("elevated");
    let base = if underground { 60.0 } else { 25.0 };

    let quantities = number(record, "Excavation_Volume_cum") * 0.0004
        + number(record, "RCC_Volume_cum") * 0.0012
        + number(record, "Reinforcement_TMT_tons") * 0.0075
        + number(record, "Structural_Steel_tons") * 0.009
        + number(record, "Diaphragm_Wall_Area_sqm") * 0.0025
        + number(record, "Waterproofing_Area_sqm") * 0.0004
        + number(record, "Peak_Labor_Count") * 0.02
        + number(record, "TBM_Diameter_m") * 4.0;

    let typology = match category(record, "Station_Typology").as_deref() {
        Some("Interchange") => 1.25,
        Some("Terminal") => 1.15,
        _ => 1.0,
    };
    let soil = match category(record, "Soil_Type").as_deref() {
        Some("Rock") => 1.2,
        Some("Mixed") => 1.1,
        Some("Clay") => 1.08,
        _ => 1.0,
    };
    let seismic = match category(record, "Seismic_Zone").as_deref() {
        Some("III") => 1.04,
        Some("IV") => 1.08,
        Some("V") => 1.12,
        _ => 1.0,
    };
    let weather = match category(record, "Weather_Impact").as_deref() {
        Some("Rainy") => 1.05,
        Some("Flood Prone") => 1.12,
        _ => 1.0,
    };
    let levels = if number(record, "Levels") >= 3.0 { 1.15 } else { 1.0 };
    let crane = if category(record, "Tower_Crane_Required").as_deref() == Some("Yes") {
        1.5
    } else {
        0.0
    };
    let regional = record.number("Regional_Cost_Index").unwrap_or(1.0);

    ((base + quantities) * typology * soil * seismic * weather * levels + crane) * regional
}
