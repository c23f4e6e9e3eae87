//! Unified error model for faro.
//! Every public operation returns [`Result`]. Validation failures carry their own
//! variants; anything the embedded engine or the polars readers report is passed
//! through unchanged so callers see the underlying message.

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid existence policy '{0}': valid options are fail, replace, append")]
    InvalidPolicy(String),

    #[error("table '{0}' already exists in database")]
    AlreadyExists(String),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("extension '{extension}' not supported; supported extensions: {}", .supported.join(", "))]
    UnsupportedFormat { extension: String, supported: Vec<&'static str> },

    #[error("invalid source type '{found}': expected a file path, a DataFrame or a faro Table")]
    InvalidSourceType { found: String },

    #[error("can only execute a single statement at once, found {0}")]
    MultiStatement(usize),

    #[error("column already exists: {column} in table '{table}'; set overwrite to replace its values")]
    ColumnExists { table: String, column: String },

    #[error("column '{column}' is not a column of table '{table}'")]
    ColumnNotFound { table: String, column: String },

    #[error("argument '{parameter}' is not a column of table '{table}'")]
    UnboundParameter { table: String, parameter: String },

    #[error("invalid argument `{argument}`: {reason}")]
    InvalidArgument { argument: &'static str, reason: String },

    #[error("failed to parse '{}': {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error(transparent)]
    Engine(#[from] rusqlite::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_argument<S: Into<String>>(argument: &'static str, reason: S) -> Self {
        Error::InvalidArgument { argument, reason: reason.into() }
    }

    /// Stable snake_case code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidPolicy(_) => "invalid_policy",
            Error::AlreadyExists(_) => "already_exists",
            Error::NotFound(_) => "not_found",
            Error::UnsupportedFormat { .. } => "unsupported_format",
            Error::InvalidSourceType { .. } => "invalid_source_type",
            Error::MultiStatement(_) => "multi_statement",
            Error::ColumnExists { .. } => "column_exists",
            Error::ColumnNotFound { .. } => "column_not_found",
            Error::UnboundParameter { .. } => "unbound_parameter",
            Error::InvalidArgument { .. } => "invalid_argument",
            Error::Parse { .. } => "parse_error",
            Error::Engine(_) => "engine_error",
            Error::Polars(_) => "polars_error",
            Error::Io(_) => "io_error",
        }
    }

    /// True when the failure was detected before any engine call was made.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Error::Engine(_) | Error::Polars(_) | Error::Io(_) | Error::Parse { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
