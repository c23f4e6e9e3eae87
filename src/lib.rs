//! faro: load tabular data into an embedded SQL engine, query it, and derive
//! new columns by mapping a function over its rows.
//!
//! The engine is an in-memory SQLite database (via `rusqlite`). Sources are
//! normalized to a polars `DataFrame` before they are written; query results
//! come back as a [`Table`].

pub mod config;
pub mod database;
pub mod error;
pub mod ident;
pub mod mapping;
pub mod source;
pub mod table;
pub mod value;

pub use config::{DatabaseConfig, ReadOptions};
pub use database::{Database, IfExists};
pub use error::{Error, Result};
pub use mapping::{Row, RowFn};
pub use source::{FileFormat, Source};
pub use table::Table;
pub use value::{ColumnType, Value};
