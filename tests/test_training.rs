//! Integration tests: training, persistence and the end-to-end estimate

use metro_cost::error::MetroCostError;
use metro_cost::features::Record;
use metro_cost::inference::CostPredictor;
use metro_cost::schema::FieldSchema;
use metro_cost::synthetic::StationGenerator;
use metro_cost::training::{
    ModelArtifacts, TrainEngine, TrainingConfig, COLUMNS_FILE, ENCODER_FILE, MODEL_FILE,
};
use polars::prelude::*;

fn train(rows: usize, seed: u64) -> ModelArtifacts {
    let schema = FieldSchema::metro_station();
    let df = StationGenerator::new(seed).generate(rows, &schema).unwrap();
    let config = TrainingConfig::new().with_n_estimators(20).with_random_state(seed);
    TrainEngine::new(config, schema).fit(&df).unwrap()
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_training_reports_holdout_metrics() {
    let artifacts = train(200, 42);
    let m = artifacts.metrics();
    assert_eq!(m.n_train + m.n_test, 200);
    assert_eq!(m.n_test, 40);
    assert!(m.mae.is_finite() && m.mae >= 0.0);
    assert!((m.rmse * m.rmse - m.mse).abs() < 1e-6 * m.mse.max(1.0));
    assert!(m.r2 > 0.3, "r2 = {}", m.r2);
}

#[test]
fn test_training_is_reproducible() {
    let a = train(120, 7);
    let b = train(120, 7);
    assert_eq!(a.metrics().mae, b.metrics().mae);
    assert_eq!(a.pipeline().column_order(), b.pipeline().column_order());
}

#[test]
fn test_missing_training_column_is_schema_mismatch() {
    let schema = FieldSchema::metro_station();
    let df = StationGenerator::new(3).generate(30, &schema).unwrap();
    let df = df.drop("Soil_Type").unwrap();

    match TrainEngine::new(TrainingConfig::new(), schema).fit(&df) {
        Err(MetroCostError::SchemaMismatch { fields }) => assert_eq!(fields, vec!["Soil_Type"]),
        other => panic!("expected SchemaMismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_inferred_schema_trains() {
    let df = df!(
        "City" => &["Delhi", "Mumbai", "Pune", "Delhi", "Mumbai", "Pune", "Delhi", "Mumbai", "Pune", "Delhi"],
        "Station_Length_m" => &[180.0, 200.0, 150.0, 220.0, 170.0, 190.0, 160.0, 210.0, 175.0, 230.0],
        "Total_Civil_Cost_Crore" => &[280.0, 320.0, 230.0, 350.0, 270.0, 300.0, 250.0, 335.0, 275.0, 360.0]
    )
    .unwrap();

    let schema = FieldSchema::infer_from_frame(&df, "Total_Civil_Cost_Crore").unwrap();
    let artifacts = TrainEngine::new(TrainingConfig::new().with_n_estimators(5), schema)
        .fit(&df)
        .unwrap();
    assert_eq!(artifacts.forest().n_trees(), 5);
    assert!(artifacts
        .pipeline()
        .column_order()
        .columns()
        .contains(&"City_Mumbai".to_string()));
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn test_delhi_underground_without_tbm() {
    let predictor = CostPredictor::from_artifacts(train(150, 42)).unwrap();
    let raw = Record::new()
        .with("City", "Delhi")
        .with("Metro_Type", "underground")
        .with("TBM_Used", "No")
        .with("RCC_Volume_cum", 12000);

    let estimate = predictor.predict_inputs(&raw).unwrap();
    assert_eq!(estimate.record.number("TBM_Diameter_m"), Some(0.0));
    assert_eq!(estimate.record.number("Shuttering_Area_sqm"), Some(16800.0));
    assert!(estimate.cost_crore.is_finite());
    assert!(estimate.cost_crore >= 0.0);
    assert!(estimate.display().starts_with("₹ "));
    assert!(estimate.display().ends_with(" crore"));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn test_artifacts_round_trip() {
    let artifacts = train(100, 5);
    let dir = tempfile::tempdir().unwrap();
    artifacts.save(dir.path()).unwrap();

    for file in [MODEL_FILE, ENCODER_FILE, COLUMNS_FILE] {
        assert!(dir.path().join(file).exists(), "{}", file);
    }

    let loaded = ModelArtifacts::load(dir.path()).unwrap();
    assert_eq!(loaded.pipeline(), artifacts.pipeline());
    assert_eq!(loaded.metrics(), artifacts.metrics());

    let before = CostPredictor::from_artifacts(artifacts).unwrap();
    let after = CostPredictor::load(dir.path()).unwrap();
    let raw = Record::new().with("City", "Mumbai").with("Levels", 3);
    assert_eq!(
        before.predict_inputs(&raw).unwrap().cost_crore,
        after.predict_inputs(&raw).unwrap().cost_crore
    );
}

#[test]
fn test_drifted_column_file_fails_to_load() {
    let artifacts = train(80, 9);
    let dir = tempfile::tempdir().unwrap();
    artifacts.save(dir.path()).unwrap();

    let path = dir.path().join(COLUMNS_FILE);
    let mut columns: Vec<String> =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    columns[0] = "City_Atlantis".to_string();
    std::fs::write(&path, serde_json::to_string(&columns).unwrap()).unwrap();

    match ModelArtifacts::load(dir.path()) {
        Err(MetroCostError::ColumnOrderMismatch { missing, .. }) => {
            assert_eq!(missing, vec!["City_Atlantis".to_string()]);
        }
        other => panic!("expected ColumnOrderMismatch, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_artifact_dir_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(CostPredictor::load(dir.path().join("absent")).is_err());
}
