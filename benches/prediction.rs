use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use metro_cost::features::Record;
use metro_cost::inference::{required_batch_columns, CostPredictor};
use metro_cost::schema::FieldSchema;
use metro_cost::synthetic::StationGenerator;
use metro_cost::training::{TrainEngine, TrainingConfig};
use metro_cost::utils::records_to_frame;

fn trained_predictor(n_rows: usize, n_trees: usize) -> CostPredictor {
    let schema = FieldSchema::metro_station();
    let df = StationGenerator::new(42).generate(n_rows, &schema).unwrap();
    let artifacts = TrainEngine::new(TrainingConfig::new().with_n_estimators(n_trees), schema)
        .fit(&df)
        .unwrap();
    CostPredictor::from_artifacts(artifacts).unwrap()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10);

    let schema = FieldSchema::metro_station();
    for n_rows in [250, 1000].iter() {
        let df = StationGenerator::new(7).generate(*n_rows, &schema).unwrap();

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &df, |b, df| {
            b.iter(|| {
                let config = TrainingConfig::new().with_n_estimators(50);
                TrainEngine::new(config, schema.clone())
                    .fit(black_box(df))
                    .unwrap()
            })
        });
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let predictor = trained_predictor(500, 100);
    let raw = Record::new()
        .with("City", "Mumbai")
        .with("Metro_Type", "underground")
        .with("RCC_Volume_cum", 15000);

    c.bench_function("predict_single", |b| {
        b.iter(|| predictor.predict_inputs(black_box(&raw)).unwrap())
    });

    let mut group = c.benchmark_group("predict_batch");
    let schema = predictor.schema().clone();
    for n_rows in [100, 1000].iter() {
        let records = StationGenerator::new(3).records(*n_rows, &schema).unwrap();
        let df = records_to_frame(&records, &required_batch_columns(&schema)).unwrap();

        group.bench_with_input(BenchmarkId::new("rows", n_rows), &df, |b, df| {
            b.iter(|| predictor.predict_batch(black_box(df)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
