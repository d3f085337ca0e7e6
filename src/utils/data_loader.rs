//! Data loading utilities

use crate::error::{MetroCostError, Result};
use crate::features::{FieldValue, Record};
use polars::io::mmap::MmapBytesReader;
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Tabular formats accepted for training data and batch uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Parquet,
    Json,
    JsonLines,
}

impl FileFormat {
    /// Detect the format from a file name's extension
    pub fn from_name(name: &str) -> Result<Self> {
        let lower = name.to_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        match ext {
            "csv" => Ok(FileFormat::Csv),
            "tsv" => Ok(FileFormat::Tsv),
            "parquet" | "pq" => Ok(FileFormat::Parquet),
            "json" => Ok(FileFormat::Json),
            "jsonl" | "ndjson" => Ok(FileFormat::JsonLines),
            other => Err(MetroCostError::DataError(format!(
                "unsupported file type '.{}' for {} (expected csv, tsv, parquet, json or jsonl)",
                other, name
            ))),
        }
    }
}

/// Data loader for the supported file formats
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned to infer CSV dtypes
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(1000),
        }
    }

    /// Rows scanned for CSV dtype inference (None = whole file)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Detect file format from extension and load
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let format = FileFormat::from_name(&path.to_string_lossy())?;
        let file = File::open(path)?;
        let df = self.read(file, format)?;
        debug!(path = %path.display(), rows = df.height(), cols = df.width(), "Loaded frame");
        Ok(df)
    }

    /// Parse an in-memory upload; the format comes from `file_name`
    pub fn read_bytes(&self, bytes: Vec<u8>, file_name: &str) -> Result<DataFrame> {
        let format = FileFormat::from_name(file_name)?;
        self.read(Cursor::new(bytes), format)
    }

    fn read<R: MmapBytesReader + 'static>(&self, reader: R, format: FileFormat) -> Result<DataFrame> {
        let df = match format {
            FileFormat::Csv | FileFormat::Tsv => {
                let separator = if format == FileFormat::Tsv { b'\t' } else { b',' };
                CsvReadOptions::default()
                    .with_has_header(true)
                    .with_infer_schema_length(self.infer_schema_length)
                    .with_parse_options(CsvParseOptions::default().with_separator(separator))
                    .into_reader_with_file_handle(reader)
                    .finish()?
            }
            FileFormat::Parquet => ParquetReader::new(reader).finish()?,
            FileFormat::Json => JsonReader::new(reader)
                .with_json_format(JsonFormat::Json)
                .finish()?,
            FileFormat::JsonLines => JsonReader::new(reader)
                .with_json_format(JsonFormat::JsonLines)
                .finish()?,
        };
        Ok(df)
    }
}

/// Write a frame as CSV with a header row
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let mut file = File::create(path.as_ref())?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Column names in frame order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Convert every row of a frame into a [`Record`].
///
/// Null cells (and float NaN) are left out of the row's record, so they read
/// as absent fields downstream. String columns become text, integer columns
/// `Int`, other numeric columns `Float`; booleans are rendered as text.
pub fn frame_to_records(df: &DataFrame) -> Result<Vec<Record>> {
    let mut records = vec![Record::new(); df.height()];

    for column in df.get_columns() {
        let name = column.name().to_string();
        let series = column.as_materialized_series();
        let dtype = series.dtype().clone();

        match dtype {
            DataType::String => {
                for (record, value) in records.iter_mut().zip(series.str()?.into_iter()) {
                    if let Some(v) = value {
                        record.insert(name.clone(), FieldValue::Text(v.to_string()));
                    }
                }
            }
            DataType::Boolean => {
                for (record, value) in records.iter_mut().zip(series.bool()?.into_iter()) {
                    if let Some(v) = value {
                        record.insert(name.clone(), FieldValue::Text(v.to_string()));
                    }
                }
            }
            ref dt if dt.is_integer() => {
                let cast = series.cast(&DataType::Int64)?;
                for (record, value) in records.iter_mut().zip(cast.i64()?.into_iter()) {
                    if let Some(v) = value {
                        record.insert(name.clone(), FieldValue::Int(v));
                    }
                }
            }
            ref dt if dt.is_numeric() => {
                let cast = series.cast(&DataType::Float64)?;
                for (record, value) in records.iter_mut().zip(cast.f64()?.into_iter()) {
                    if let Some(v) = value.filter(|v| !v.is_nan()) {
                        record.insert(name.clone(), FieldValue::Float(v));
                    }
                }
            }
            DataType::Null => {}
            other => {
                debug!(column = %name, dtype = ?other, "Skipping column with unsupported dtype");
            }
        }
    }

    Ok(records)
}

/// Build a frame from records, one column per entry of `columns`.
///
/// A column whose values are all integers becomes Int64, all numbers
/// Float64, anything else String. Absent values become nulls.
pub fn records_to_frame(records: &[Record], columns: &[String]) -> Result<DataFrame> {
    let mut out: Vec<Column> = Vec::with_capacity(columns.len());

    for name in columns {
        let values: Vec<Option<&FieldValue>> = records.iter().map(|r| r.get(name)).collect();
        let present = values.iter().flatten();

        let all_int = present.clone().all(|v| matches!(v, FieldValue::Int(_)));
        let all_numeric = present
            .clone()
            .all(|v| matches!(v, FieldValue::Int(_) | FieldValue::Float(_)));

        let series = if all_int {
            let data: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Some(FieldValue::Int(i)) => Some(*i),
                    _ => None,
                })
                .collect();
            Series::new(name.as_str().into(), data)
        } else if all_numeric {
            let data: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.and_then(FieldValue::as_f64))
                .collect();
            Series::new(name.as_str().into(), data)
        } else {
            let data: Vec<Option<String>> = values
                .iter()
                .map(|v| v.map(FieldValue::as_category))
                .collect();
            Series::new(name.as_str().into(), data)
        };
        out.push(series.into());
    }

    Ok(DataFrame::new(out)?)
}
