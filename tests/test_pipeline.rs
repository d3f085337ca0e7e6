//! Integration tests for the feature pipeline: derivation, encoding and column order

use metro_cost::error::MetroCostError;
use metro_cost::features::{derive, FieldValue, Record};
use metro_cost::preprocessing::{reorder, ColumnOrder, FeaturePipeline};
use metro_cost::schema::FieldSchema;
use metro_cost::synthetic::StationGenerator;

fn fitted_pipeline() -> FeaturePipeline {
    let schema = FieldSchema::metro_station();
    let records = StationGenerator::new(11).records(60, &schema).unwrap();
    FeaturePipeline::fit(&records, &schema).unwrap()
}

// ============================================================================
// Derivation
// ============================================================================

#[test]
fn test_excavation_volume_from_dimensions() {
    let schema = FieldSchema::metro_station();
    let raw = Record::new()
        .with("Station_Length_m", 180)
        .with("Station_Width_m", 20)
        .with("Station_Depth_m", 20);
    let record = derive(&raw, &schema).unwrap();
    assert_eq!(record.number("Excavation_Volume_cum"), Some(82800.0));
}

#[test]
fn test_quantities_follow_rcc_volume() {
    let schema = FieldSchema::metro_station();
    let record = derive(&Record::new().with("RCC_Volume_cum", 12000), &schema).unwrap();
    assert_eq!(record.number("Shuttering_Area_sqm"), Some(16800.0));
    assert_eq!(record.number("Reinforcement_TMT_tons"), Some(1320.0));
}

#[test]
fn test_diameter_zero_without_tbm() {
    let schema = FieldSchema::metro_station();
    for metro_type in ["underground", "elevated"] {
        let raw = Record::new()
            .with("TBM_Used", "No")
            .with("Metro_Type", metro_type)
            .with("TBM_Diameter_m", 9.5);
        let record = derive(&raw, &schema).unwrap();
        assert_eq!(record.number("TBM_Diameter_m"), Some(0.0), "{}", metro_type);
    }

    let record = derive(&Record::new().with("TBM_Used", "Yes"), &schema).unwrap();
    assert_eq!(record.number("TBM_Diameter_m"), Some(6.5));
}

#[test]
fn test_supplied_derived_fields_are_recomputed() {
    let schema = FieldSchema::metro_station();
    let raw = Record::new()
        .with("RCC_Volume_cum", 10000)
        .with("Shuttering_Area_sqm", 1);
    let record = derive(&raw, &schema).unwrap();
    assert_eq!(record.number("Shuttering_Area_sqm"), Some(14000.0));
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_vector_matches_column_order_for_any_input() {
    let pipeline = fitted_pipeline();
    let rows = StationGenerator::new(99)
        .records(25, pipeline.schema())
        .unwrap();
    for row in &rows {
        let vector = pipeline.transform_record(row).unwrap();
        assert_eq!(vector.len(), pipeline.column_order().len());
        assert_eq!(vector.columns(), pipeline.column_order().columns());
    }
}

#[test]
fn test_encoding_is_idempotent() {
    let pipeline = fitted_pipeline();
    let record = pipeline.derive(&Record::new()).unwrap();
    let first = pipeline.transform_record(&record).unwrap();
    let second = pipeline.transform_record(&record).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unknown_city_encodes_as_zero_block() {
    let pipeline = fitted_pipeline();
    let record = pipeline
        .derive(&Record::new().with("City", "Atlantis"))
        .unwrap();
    let vector = pipeline.transform_record(&record).unwrap();

    let city_values: Vec<f64> = vector
        .columns()
        .iter()
        .zip(vector.values())
        .filter(|(c, _)| c.starts_with("City_"))
        .map(|(_, v)| *v)
        .collect();
    assert!(!city_values.is_empty());
    assert!(city_values.iter().all(|v| *v == 0.0));
}

#[test]
fn test_missing_categorical_is_schema_mismatch() {
    let pipeline = fitted_pipeline();
    let mut record = pipeline.derive(&Record::new()).unwrap();
    record.remove("Soil_Type");

    match pipeline.transform_record(&record) {
        Err(MetroCostError::SchemaMismatch { fields }) => assert_eq!(fields, vec!["Soil_Type"]),
        other => panic!("expected SchemaMismatch, got {:?}", other),
    }
}

#[test]
fn test_drifted_column_order_fails() {
    let pipeline = fitted_pipeline();
    let record = pipeline.derive(&Record::new()).unwrap();
    let partial = pipeline.encode(&record).unwrap();

    let mut columns = pipeline.column_order().columns().to_vec();
    let dropped = columns.pop().unwrap();
    columns.push("Legacy_Column".to_string());

    match reorder(&partial, &ColumnOrder::new(columns)) {
        Err(MetroCostError::ColumnOrderMismatch { missing, unexpected }) => {
            assert_eq!(missing, vec!["Legacy_Column".to_string()]);
            assert_eq!(unexpected, vec![dropped]);
        }
        other => panic!("expected ColumnOrderMismatch, got {:?}", other),
    }
}

#[test]
fn test_gate_masks_recorded_diameter() {
    let pipeline = fitted_pipeline();
    let mut record = pipeline
        .derive(&Record::new().with("TBM_Used", "No"))
        .unwrap();
    record.insert("TBM_Diameter_m", FieldValue::Float(6.5));

    let vector = pipeline.transform_record(&record).unwrap();
    let idx = vector
        .columns()
        .iter()
        .position(|c| c == "TBM_Diameter_m")
        .unwrap();
    assert_eq!(vector.values()[idx], 0.0);
}

// ============================================================================
// Invalid numbers
// ============================================================================

#[test]
fn test_non_finite_input_names_the_input() {
    let pipeline = fitted_pipeline();
    for (field, text) in [
        ("Peak_Labor_Count", "NaN"),
        ("Regional_Cost_Index", "inf"),
        ("Station_Length_m", "inf"),
    ] {
        match pipeline.derive(&Record::new().with(field, text)) {
            Err(MetroCostError::InvalidValue { field: f, .. }) => assert_eq!(f, field),
            other => panic!("expected InvalidValue for {}, got {:?}", field, other),
        }
    }
}

#[test]
fn test_non_finite_value_is_not_encoded() {
    let pipeline = fitted_pipeline();
    let mut record = pipeline.derive(&Record::new()).unwrap();
    record.insert("Regional_Cost_Index", FieldValue::Float(f64::INFINITY));

    match pipeline.transform_record(&record) {
        Err(MetroCostError::InvalidValue { field, .. }) => assert_eq!(field, "Regional_Cost_Index"),
        other => panic!("expected InvalidValue, got {:?}", other),
    }
}

#[test]
fn test_out_of_range_integral_text_stays_float() {
    let pipeline = fitted_pipeline();
    let record = pipeline
        .derive(&Record::new().with("Diaphragm_Wall_Area_sqm", "1e30"))
        .unwrap();
    assert_eq!(record.get("Diaphragm_Wall_Area_sqm"), Some(&FieldValue::Float(1e30)));
}
