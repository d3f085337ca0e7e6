//! Metro cost CLI
//!
//! Command-line interface for training, estimation, batch scoring and
//! serving.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::features::{FieldValue, Record};
use crate::inference::CostPredictor;
use crate::schema::{FieldKind, FieldSchema};
use crate::synthetic::StationGenerator;
use crate::training::{ModelArtifacts, TrainEngine, TrainingConfig};
use crate::utils::{write_csv, DataLoader};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "metro-cost")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Metro station civil cost estimator")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a cost model on historical station records
    Train {
        /// Historical data file (CSV, TSV, JSON, JSON lines or Parquet)
        #[arg(short, long)]
        data: PathBuf,

        /// Output model directory
        #[arg(short, long, default_value = "./models/metro")]
        output: PathBuf,

        /// Field schema JSON; defaults to the built-in station schema
        #[arg(long, conflicts_with = "infer_schema")]
        schema: Option<PathBuf>,

        /// Infer a flat schema from the data, using this column as target
        #[arg(long, value_name = "TARGET")]
        infer_schema: Option<String>,

        /// Number of trees
        #[arg(long, default_value = "100")]
        trees: usize,

        /// Maximum tree depth (unlimited when omitted)
        #[arg(long)]
        max_depth: Option<usize>,

        /// Random seed for the split and the forest
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Held-out fraction for evaluation
        #[arg(long, default_value = "0.2")]
        test_size: f64,
    },

    /// Estimate the cost of one station
    Predict {
        /// Trained model directory
        #[arg(short, long, default_value = "./models/metro")]
        model: PathBuf,

        /// JSON object of input values
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Set one input, e.g. --set City=Mumbai (repeatable)
        #[arg(long = "set", value_name = "FIELD=VALUE")]
        set: Vec<String>,

        /// Print the derived record
        #[arg(long)]
        show_record: bool,
    },

    /// Score every row of a data file
    Batch {
        /// Trained model directory
        #[arg(short, long, default_value = "./models/metro")]
        model: PathBuf,

        /// Input data file
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV; defaults to <input>_predicted.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write synthetic historical station records
    Generate {
        /// Number of rows
        #[arg(short, long, default_value = "500")]
        rows: usize,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Relative cost noise
        #[arg(long, default_value = "0.05")]
        noise: f64,
    },

    /// Show a trained model's summary
    Info {
        /// Trained model directory
        #[arg(short, long, default_value = "./models/metro")]
        model: PathBuf,
    },

    /// Start the web server
    Serve {
        /// Trained model directory
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Server port
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
    },
}

/// Parse `FIELD=VALUE` using the schema's kind for the field
pub fn parse_assignment(arg: &str, schema: &FieldSchema) -> anyhow::Result<(String, FieldValue)> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected FIELD=VALUE, got '{}'", arg))?;
    let name = name.trim();
    let value = value.trim();

    let spec = schema
        .field(name)
        .ok_or_else(|| anyhow::anyhow!("unknown field '{}'", name))?;

    let parsed = match spec.kind {
        FieldKind::Categorical => FieldValue::from(value),
        FieldKind::Numeric => {
            if let Ok(v) = value.parse::<i64>() {
                FieldValue::Int(v)
            } else {
                let v: f64 = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("field '{}' expects a number, got '{}'", name, value))?;
                FieldValue::Float(v)
            }
        }
    };
    Ok((name.to_string(), parsed))
}

// ─── Commands ──────────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
pub fn cmd_train(
    data_path: &Path,
    output: &Path,
    schema_path: Option<&Path>,
    infer_target: Option<&str>,
    trees: usize,
    max_depth: Option<usize>,
    seed: u64,
    test_size: f64,
) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let df = DataLoader::new().load(data_path)?;
    step_done(&format!("{} rows × {} cols in {:?}", df.height(), df.width(), start.elapsed()));

    let schema = match (schema_path, infer_target) {
        (Some(path), _) => FieldSchema::from_json_file(path)?,
        (None, Some(target)) => FieldSchema::infer_from_frame(&df, target)?,
        (None, None) => FieldSchema::metro_station(),
    };
    step_ok(&format!(
        "Schema: {} fields, target {}",
        schema.fields.len(),
        schema.target.cyan()
    ));

    let config = TrainingConfig::new()
        .with_n_estimators(trees)
        .with_max_depth(max_depth)
        .with_random_state(seed)
        .with_test_size(test_size);

    step_run(&format!("Training random forest ({} trees)", trees));
    let start = Instant::now();
    let artifacts = TrainEngine::new(config, schema).fit(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    step_run(&format!("Saving → {}", output.display()));
    artifacts.save(output)?;
    step_done("");

    print_summary(&artifacts);
    Ok(())
}

fn print_summary(artifacts: &ModelArtifacts) {
    let summary = artifacts.summary();
    let m = &summary.metrics;

    println!();
    println!("  {:<16} {}", muted("Target"), summary.target.white());
    println!("  {:<16} {} / {}", muted("Trees / cols"), summary.n_trees, summary.n_features);
    println!("  {:<16} {} train, {} test", muted("Rows"), m.n_train, m.n_test);
    println!("  {:<16} {}", muted("MAE"), format!("{:.3} Cr", m.mae).white());
    println!("  {:<16} {}", muted("RMSE"), format!("{:.3} Cr", m.rmse).white());
    println!("  {:<16} {}", muted("R²"), format!("{:.4}", m.r2).white().bold());
    println!("  {:<16} {}", muted("Trained"), summary.trained_at.to_rfc3339());

    if !summary.top_features.is_empty() {
        section("Top features");
        for (name, importance) in &summary.top_features {
            println!("  {:<36} {:>8.4}", name, importance);
        }
    }
    println!();
}

pub fn cmd_predict(
    model_dir: &Path,
    input: Option<&Path>,
    assignments: &[String],
    show_record: bool,
) -> anyhow::Result<()> {
    let predictor = CostPredictor::load(model_dir)?;

    let mut raw = match input {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<Record>(&text)?
        }
        None => Record::new(),
    };
    for arg in assignments {
        let (name, value) = parse_assignment(arg, predictor.schema())?;
        raw.insert(name, value);
    }

    let estimate = predictor.predict_inputs(&raw)?;

    if show_record {
        section("Derived record");
        for (name, value) in estimate.record.iter() {
            println!("  {:<36} {}", muted(name), value);
        }
    }

    println!();
    println!("  {} {}", muted("Estimated Civil Cost:"), estimate.display().white().bold());
    println!();
    Ok(())
}

pub fn cmd_batch(model_dir: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Batch");

    step_run("Loading model");
    let predictor = CostPredictor::load(model_dir)?;
    step_done(&format!("{} trees", predictor.estimator().n_trees()));

    step_run("Loading data");
    let df = DataLoader::new().load(data_path)?;
    step_done(&format!("{} rows", df.height()));

    step_run("Scoring");
    let start = Instant::now();
    let report = predictor.predict_batch(&df)?;
    step_done(&format!("{:?}", start.elapsed()));

    let output = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let stem = data_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("batch");
            data_path.with_file_name(format!("{}_predicted.csv", stem))
        }
    };

    let mut scored = report.to_frame(&df)?;
    write_csv(&mut scored, &output)?;
    step_ok(&format!("Wrote {}", output.display()));

    if report.failed() > 0 {
        println!(
            "  {} {} of {} rows could not be scored",
            "!".yellow(),
            report.failed(),
            report.len()
        );
        for row in report.rows.iter().filter(|r| !r.is_ok()).take(10) {
            println!(
                "    {} {}",
                muted(&format!("row {}", row.row)),
                row.error.as_deref().unwrap_or("")
            );
        }
    }
    println!();
    Ok(())
}

pub fn cmd_generate(rows: usize, output: &Path, seed: u64, noise: f64) -> anyhow::Result<()> {
    section("Generate");

    step_run(&format!("Generating {} station records", rows));
    let schema = FieldSchema::metro_station();
    let mut df = StationGenerator::new(seed)
        .with_noise(noise)
        .generate(rows, &schema)?;
    step_done(&format!("{} cols", df.width()));

    write_csv(&mut df, output)?;
    step_ok(&format!("Wrote {}", output.display()));
    println!();
    Ok(())
}

pub fn cmd_info(model_dir: &Path) -> anyhow::Result<()> {
    section("Model Info");
    let artifacts = ModelArtifacts::load(model_dir)?;

    println!("  {:<16} {}", muted("Directory"), model_dir.display());
    println!(
        "  {:<16} {} inputs, {} categorical, {} numeric",
        muted("Fields"),
        artifacts.summary().n_input_fields,
        artifacts.summary().n_categorical_fields,
        artifacts.summary().n_numeric_fields
    );
    print_summary(&artifacts);
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(model_dir: Option<&Path>, host: &str, port: u16) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    let mut config = ServerConfig::default().with_host(host).with_port(port);
    if let Some(dir) = model_dir {
        config = config.with_model_dir(dir.to_string_lossy());
    }

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Metro Cost Estimator".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Form   ", &format!("http://{}:{}", host, port)));
    line_box(&kv("API    ", &format!("http://{}:{}/api/predict", host, port)));
    line_box(&kv("Health ", &format!("http://{}:{}/api/health", host, port)));
    line_box(&kv("Model  ", &config.model_dir));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment_uses_field_kind() {
        let schema = FieldSchema::metro_station();
        let (name, value) = parse_assignment("City=Mumbai", &schema).unwrap();
        assert_eq!(name, "City");
        assert_eq!(value, FieldValue::from("Mumbai"));

        let (_, value) = parse_assignment("Station_Length_m = 140", &schema).unwrap();
        assert_eq!(value, FieldValue::Int(140));

        let (_, value) = parse_assignment("Regional_Cost_Index=1.05", &schema).unwrap();
        assert_eq!(value, FieldValue::Float(1.05));
    }

    #[test]
    fn test_parse_assignment_errors() {
        let schema = FieldSchema::metro_station();
        assert!(parse_assignment("City", &schema).is_err());
        assert!(parse_assignment("Nope=1", &schema).is_err());
        assert!(parse_assignment("Station_Depth_m=deep", &schema).is_err());
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "x".red());
        assert_eq!(strip_ansi(&colored), "x");
    }

    #[test]
    fn test_cli_parses_predict() {
        let cli = Cli::try_parse_from([
            "metro-cost", "predict", "--set", "City=Pune", "--set", "Levels=3",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict { set, model, .. } => {
                assert_eq!(set.len(), 2);
                assert_eq!(model, PathBuf::from("./models/metro"));
            }
            _ => panic!("expected predict"),
        }
    }
}
