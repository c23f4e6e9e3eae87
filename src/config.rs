//! Configuration for database instances and source readers.
//!
//! `DatabaseConfig` can be built explicitly or read from the environment
//! (`FARO_DB_NAME`, `FARO_SNAPSHOT_DIR`). `ReadOptions` carries the
//! per-format options handed to the source parsers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_DB_NAME: &str = "faro";
pub const ENV_DB_NAME: &str = "FARO_DB_NAME";
pub const ENV_SNAPSHOT_DIR: &str = "FARO_SNAPSHOT_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Display name; also the stem of the default snapshot file.
    pub name: String,
    /// Directory for default snapshots. `None` means the working directory.
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), snapshot_dir: None }
    }

    pub fn from_env() -> Self {
        let name = std::env::var(ENV_DB_NAME).unwrap_or_else(|_| DEFAULT_DB_NAME.to_string());
        let snapshot_dir = std::env::var(ENV_SNAPSHOT_DIR).ok().filter(|s| !s.is_empty()).map(PathBuf::from);
        Self { name, snapshot_dir }
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self { Self::new(DEFAULT_DB_NAME) }
}

/// Default snapshot location: `{name}.db`, under `dir` when given.
#[inline]
pub fn default_snapshot_path(dir: Option<&Path>, name: &str) -> PathBuf {
    let file = format!("{}.db", name);
    match dir {
        Some(d) => d.join(file),
        None => PathBuf::from(file),
    }
}

/// Options forwarded to the file parsers. Fields that do not apply to a
/// format are ignored by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// First row (csv) or first sheet row (xlsx) holds column names.
    pub has_header: bool,
    /// Field separator for delimited text.
    pub separator: u8,
    /// Rows scanned for schema inference; `None` scans everything.
    pub infer_schema_length: Option<usize>,
    /// Extra tokens read as null in delimited text.
    pub null_values: Vec<String>,
    /// Parse date/datetime looking strings in delimited text.
    pub try_parse_dates: bool,
    /// Spreadsheet sheet name; defaults to the first sheet.
    pub sheet: Option<String>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            separator: b',',
            infer_schema_length: Some(100),
            null_values: Vec::new(),
            try_parse_dates: false,
            sheet: None,
        }
    }
}

impl ReadOptions {
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn with_null_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_try_parse_dates(mut self, on: bool) -> Self {
        self.try_parse_dates = on;
        self
    }
}
