//!
//! faro source adapter
//! -------------------
//! Normalizes every accepted ingestion source into the canonical tabular form
//! (a polars `DataFrame`). Three shapes are accepted: a file path, an in-memory
//! `DataFrame`, or a faro [`Table`]. File paths are dispatched on their
//! extension through a fixed table of supported formats; the file is fully
//! read and closed before the frame is returned.

use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use tracing::debug;

use crate::config::ReadOptions;
use crate::error::{Error, Result};
use crate::table::Table;
use crate::value::{parse_timestamp, Value};

/// A tabular source accepted by `Database::add_table`.
#[derive(Debug, Clone)]
pub enum Source {
    Path(PathBuf),
    Frame(DataFrame),
    Table(Table),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Delimited text.
    Csv,
    /// Array of JSON records.
    Json,
    /// Spreadsheet workbook.
    Xlsx,
}

/// Extension dispatch table. Adding a format means adding a row here and a
/// reader arm in [`FileFormat::read`].
const FORMATS: &[(&str, FileFormat)] = &[
    ("csv", FileFormat::Csv),
    ("json", FileFormat::Json),
    ("xlsx", FileFormat::Xlsx),
];

pub fn supported_extensions() -> Vec<&'static str> {
    FORMATS.iter().map(|(ext, _)| *ext).collect()
}

impl FileFormat {
    /// Select a format by file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<FileFormat> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        FORMATS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(ext))
            .map(|(_, f)| *f)
            .ok_or_else(|| Error::UnsupportedFormat { extension: ext.to_string(), supported: supported_extensions() })
    }

    pub fn read(&self, path: &Path, opts: &ReadOptions) -> Result<DataFrame> {
        match self {
            FileFormat::Csv => read_csv(path, opts),
            FileFormat::Json => read_json(path),
            FileFormat::Xlsx => read_xlsx(path, opts),
        }
    }
}

impl Source {
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Path(_) => "path",
            Source::Frame(_) => "frame",
            Source::Table(_) => "table",
        }
    }

    /// Produce the canonical frame for this source.
    pub fn adapt(self, opts: &ReadOptions) -> Result<DataFrame> {
        match self {
            Source::Path(path) => {
                if !path.exists() {
                    return Err(Error::NotFound(path));
                }
                let format = FileFormat::from_path(&path)?;
                debug!(target: "faro::source", "adapt: reading path='{}' format={:?}", path.display(), format);
                let df = format.read(&path, opts)?;
                debug!(target: "faro::source", "adapt: parsed path='{}' shape={:?}", path.display(), df.shape());
                Ok(df)
            }
            Source::Frame(df) => Ok(df),
            Source::Table(t) => t.to_dataframe(),
        }
    }
}

fn parse_error(path: &Path, err: impl Display) -> Error {
    Error::Parse { path: path.to_path_buf(), message: err.to_string() }
}

fn read_csv(path: &Path, opts: &ReadOptions) -> Result<DataFrame> {
    let nulls = (!opts.null_values.is_empty())
        .then(|| NullValues::AllColumns(opts.null_values.iter().map(|s| s.as_str().into()).collect()));
    let separator = opts.separator;
    let try_parse_dates = opts.try_parse_dates;
    CsvReadOptions::default()
        .with_has_header(opts.has_header)
        .with_infer_schema_length(opts.infer_schema_length)
        .map_parse_options(move |p| {
            p.with_separator(separator)
                .with_null_values(nulls.clone())
                .with_try_parse_dates(try_parse_dates)
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| parse_error(path, e))
}

fn read_json(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)?;
    JsonReader::new(file)
        .with_json_format(JsonFormat::Json)
        .finish()
        .map_err(|e| parse_error(path, e))
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::String(s) => Value::Text(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(d) => d.as_datetime().map(Value::Timestamp).unwrap_or(Value::Null),
        Data::DateTimeIso(s) => parse_timestamp(s).map(Value::Timestamp).unwrap_or_else(|| Value::Text(s.clone())),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

// Cells are converted row by row, then typed per column through Table.
fn read_xlsx(path: &Path, opts: &ReadOptions) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(|e| parse_error(path, e))?;
    let sheet = match &opts.sheet {
        Some(s) => s.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| parse_error(path, "workbook has no sheets"))?,
    };
    let range = workbook.worksheet_range(&sheet).map_err(|e| parse_error(path, e))?;
    let mut rows = range.rows();
    let header: Vec<String> = if opts.has_header {
        rows.next()
            .map(|r| {
                r.iter()
                    .enumerate()
                    .map(|(i, c)| match cell_value(c) {
                        Value::Null => format!("column_{}", i + 1),
                        Value::Text(s) => s,
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    } else {
        (1..=range.width()).map(|i| format!("column_{}", i)).collect()
    };
    let body: Vec<Vec<Value>> = rows
        .map(|r| (0..header.len()).map(|i| r.get(i).map(cell_value).unwrap_or_default()).collect())
        .collect();
    debug!(target: "faro::source", "read_xlsx: sheet='{}' columns={} rows={}", sheet, header.len(), body.len());
    Table::new(header, body)?.to_dataframe()
}

impl From<PathBuf> for Source {
    fn from(p: PathBuf) -> Self { Source::Path(p) }
}

impl From<&Path> for Source {
    fn from(p: &Path) -> Self { Source::Path(p.to_path_buf()) }
}

impl From<&str> for Source {
    fn from(p: &str) -> Self { Source::Path(PathBuf::from(p)) }
}

impl From<String> for Source {
    fn from(p: String) -> Self { Source::Path(PathBuf::from(p)) }
}

impl From<DataFrame> for Source {
    fn from(df: DataFrame) -> Self { Source::Frame(df) }
}

impl From<Table> for Source {
    fn from(t: Table) -> Self { Source::Table(t) }
}

/// Dynamic boundary: a JSON string names a file, a JSON array of objects is
/// an in-memory record set. Anything else is rejected.
impl TryFrom<serde_json::Value> for Source {
    type Error = Error;

    fn try_from(v: serde_json::Value) -> Result<Source> {
        use serde_json::Value as J;
        match v {
            J::String(p) => Ok(Source::Path(PathBuf::from(p))),
            J::Array(items) if items.iter().all(|i| i.is_object()) => {
                let records: Vec<serde_json::Map<String, J>> = items
                    .into_iter()
                    .filter_map(|i| match i {
                        J::Object(m) => Some(m),
                        _ => None,
                    })
                    .collect();
                Ok(Source::Table(Table::from_records(&records)?))
            }
            other => {
                let found = match other {
                    J::Null => "null",
                    J::Bool(_) => "bool",
                    J::Number(_) => "number",
                    J::Object(_) => "object",
                    _ => "array of non-objects",
                };
                Err(Error::InvalidSourceType { found: found.to_string() })
            }
        }
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod source_tests;
