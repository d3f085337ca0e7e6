//! Integration tests for batch scoring of uploaded files

use metro_cost::error::MetroCostError;
use metro_cost::inference::{
    required_batch_columns, CostPredictor, InferenceConfig, ERROR_COLUMN, PREDICTION_COLUMN,
};
use metro_cost::schema::FieldSchema;
use metro_cost::synthetic::StationGenerator;
use metro_cost::training::{TrainEngine, TrainingConfig};
use metro_cost::utils::{records_to_frame, write_csv, DataLoader};
use polars::prelude::*;

fn predictor() -> CostPredictor {
    let schema = FieldSchema::metro_station();
    let df = StationGenerator::new(42).generate(120, &schema).unwrap();
    let artifacts = TrainEngine::new(TrainingConfig::new().with_n_estimators(10), schema)
        .fit(&df)
        .unwrap();
    CostPredictor::from_artifacts(artifacts).unwrap()
}

/// Upload frame holding only the input columns
fn upload(rows: usize, seed: u64) -> DataFrame {
    let schema = FieldSchema::metro_station();
    let records = StationGenerator::new(seed).records(rows, &schema).unwrap();
    records_to_frame(&records, &required_batch_columns(&schema)).unwrap()
}

#[test]
fn test_batch_scores_every_row_in_order() {
    let p = predictor();
    let df = upload(15, 3);
    let report = p.predict_batch(&df).unwrap();

    assert_eq!(report.len(), 15);
    assert_eq!(report.failed(), 0);
    for (i, row) in report.rows.iter().enumerate() {
        assert_eq!(row.row, i);
        assert!(row.cost_crore.unwrap().is_finite());
    }

    // Row 4 alone scores the same as row 4 in the batch
    let single = df.slice(4, 1);
    let alone = p.predict_batch(&single).unwrap();
    assert_eq!(alone.rows[0].cost_crore, report.rows[4].cost_crore);
}

#[test]
fn test_missing_column_fails_before_scoring() {
    let p = predictor();
    let df = upload(5, 8).drop("Seismic_Zone").unwrap();

    match p.predict_batch(&df) {
        Err(MetroCostError::BatchValidation { missing }) => {
            assert_eq!(missing, vec!["Seismic_Zone".to_string()]);
        }
        other => panic!("expected BatchValidation, got {:?}", other),
    }
}

#[test]
fn test_every_missing_column_is_reported() {
    let p = predictor();
    let df = upload(5, 8)
        .drop("Levels")
        .unwrap()
        .drop("City")
        .unwrap();

    let err = p.predict_batch(&df).unwrap_err();
    let mut fields = err.field_names();
    fields.sort();
    assert_eq!(fields, vec!["City".to_string(), "Levels".to_string()]);
}

#[test]
fn test_blank_cell_fails_only_its_row() {
    let p = predictor();
    let schema = p.schema().clone();
    let mut records = StationGenerator::new(5).records(4, &schema).unwrap();
    records[2].remove("Soil_Type");
    let df = records_to_frame(&records, &required_batch_columns(&schema)).unwrap();

    let report = p.predict_batch(&df).unwrap();
    assert_eq!(report.failed(), 1);
    assert!(!report.rows[2].is_ok());
    assert_eq!(report.rows[2].fields, vec!["Soil_Type".to_string()]);
    assert!(report.rows[3].is_ok());

    let scored = report.to_frame(&df).unwrap();
    let predictions = scored.column(PREDICTION_COLUMN).unwrap();
    assert_eq!(predictions.null_count(), 1);
    assert!(scored.column(ERROR_COLUMN).is_ok());
}

#[test]
fn test_csv_upload_round_trip() {
    let p = predictor();
    let mut df = upload(6, 12);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations.csv");
    write_csv(&mut df, &path).unwrap();

    let loaded = DataLoader::new().load(&path).unwrap();
    let report = p.predict_batch(&loaded).unwrap();
    assert_eq!(report.failed(), 0);

    let scored = report.to_frame(&loaded).unwrap();
    assert_eq!(scored.width(), loaded.width() + 1);
    assert!(scored.column(ERROR_COLUMN).is_err());

    let bytes = std::fs::read(&path).unwrap();
    let from_bytes = DataLoader::new().read_bytes(bytes, "stations.csv").unwrap();
    assert_eq!(p.predict_batch(&from_bytes).unwrap(), report);
}

#[test]
fn test_row_limit() {
    let p = predictor().with_config(InferenceConfig::new().with_max_batch_rows(Some(3)));
    assert!(matches!(
        p.predict_batch(&upload(4, 1)),
        Err(MetroCostError::DataError(_))
    ));
    assert_eq!(p.predict_batch(&upload(3, 1)).unwrap().len(), 3);
}

#[test]
fn test_extra_columns_are_ignored() {
    let p = predictor();
    let mut df = upload(3, 6);
    df.with_column(Series::new("Notes".into(), vec!["a", "b", "c"]))
        .unwrap();
    let report = p.predict_batch(&df).unwrap();
    assert_eq!(report.failed(), 0);
    assert_eq!(report.to_frame(&df).unwrap().width(), df.width() + 1);
}
