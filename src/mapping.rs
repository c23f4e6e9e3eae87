//! Row-mapping engine.
//!
//! Computes a derived column by calling a function once per row and persists
//! the result by replacing the whole relation with the augmented snapshot.
//!
//! - [`Database::map`] binds arguments positionally from an explicit column list.
//! - [`Database::map_into`] binds arguments by name from the parameter names a
//!   [`RowFn`] declares (see [`row_fn!`](crate::row_fn)).
//!
//! All validation (names, unknown columns, overwrite policy) happens before
//! any row is processed and before the engine is written to.

use std::fmt;
use std::ops::Index;

use tracing::{debug, info};

use crate::database::{Database, IfExists};
use crate::error::{Error, Result};
use crate::ident::{quote_ident, quote_idents};
use crate::table::Table;
use crate::value::{values_to_series, ColumnType, Value};

/// Named view over one row's bound arguments.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    names: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    pub fn new(names: &'a [String], values: &'a [Value]) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Row { names, values }
    }

    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.names.iter().position(|n| n == name).map(|i| &self.values[i])
    }

    /// Like [`Row::get`], with a missing name read as null.
    pub fn value(&self, name: &str) -> &'a Value {
        self.get(name).unwrap_or(Value::null_ref())
    }

    pub fn names(&self) -> &'a [String] { self.names }

    pub fn values(&self) -> &'a [Value] { self.values }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }
}

impl Index<&str> for Row<'_> {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        match self.get(name) {
            Some(v) => v,
            None => panic!("no argument named '{}' in row", name),
        }
    }
}

/// A row function with declared parameter names, used for name binding.
pub struct RowFn<'f> {
    params: Vec<String>,
    body: Box<dyn FnMut(&Row<'_>) -> Value + 'f>,
}

impl<'f> RowFn<'f> {
    pub fn new<I, S, F, R>(params: I, mut f: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(&Row<'_>) -> R + 'f,
        R: Into<Value>,
    {
        RowFn {
            params: params.into_iter().map(Into::into).collect(),
            body: Box::new(move |row: &Row<'_>| f(row).into()),
        }
    }

    /// Declared parameter names, in declaration order.
    pub fn params(&self) -> &[String] { &self.params }

    pub fn call(&mut self, row: &Row<'_>) -> Value { (self.body)(row) }
}

impl fmt::Debug for RowFn<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowFn").field("params", &self.params).finish_non_exhaustive()
    }
}

/// Build a [`RowFn`] whose parameter names are the closure's argument names.
/// Each argument is bound by name to an owned [`Value`].
///
/// ```
/// use faro::{row_fn, Value};
/// let f = row_fn!(|id, val| id.as_i64().zip(val.as_i64()).map(|(a, b)| a * b));
/// assert_eq!(f.params(), &["id", "val"]);
/// ```
#[macro_export]
macro_rules! row_fn {
    (|| $body:expr) => {
        $crate::RowFn::new(::std::vec::Vec::<::std::string::String>::new(), move |_row: &$crate::Row<'_>| $body)
    };
    (|$($param:ident),* $(,)?| $body:expr) => {{
        let names: &[&'static str] = &[$(stringify!($param)),*];
        $crate::RowFn::new(names.iter().copied(), move |row: &$crate::Row<'_>| {
            $(
                #[allow(unused_variables)]
                let $param: $crate::Value = row.value(stringify!($param)).clone();
            )*
            $body
        })
    }};
}

fn ensure_name(argument: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::invalid_argument(argument, "must be a non-empty name"));
    }
    Ok(())
}

/// Resolve `output` against the current columns, which the engine compares
/// ASCII case-insensitively. Returns the spelling the result column is stored under.
fn ensure_overwrite(existing: &[String], table: &str, output: &str, overwrite: bool) -> Result<String> {
    match existing.iter().find(|c| c.eq_ignore_ascii_case(output)) {
        Some(c) if !overwrite => Err(Error::ColumnExists { table: table.to_string(), column: c.clone() }),
        Some(c) => Ok(c.clone()),
        None => Ok(output.to_string()),
    }
}

impl Database {
    /// Map `func` over `columns` of `table`, storing results in `output`.
    ///
    /// Each call receives the row's values in `columns` order. An existing
    /// `output` column is only replaced when `overwrite` is set; a new one is
    /// appended as the last column.
    pub fn map<F, R, I, S>(&mut self, mut func: F, table: &str, columns: I, output: &str, overwrite: bool) -> Result<()>
    where
        F: FnMut(&[Value]) -> R,
        R: Into<Value>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ensure_name("table", table)?;
        ensure_name("output", output)?;
        let columns: Vec<String> = columns.into_iter().map(|c| c.as_ref().to_string()).collect();
        if let Some(pos) = columns.iter().position(|c| c.is_empty()) {
            return Err(Error::invalid_argument("columns", format!("entry {} is an empty name", pos)));
        }

        let snapshot = self.read_table(table)?;
        let indices = columns
            .iter()
            .map(|c| {
                snapshot
                    .column_index(c)
                    .ok_or_else(|| Error::ColumnNotFound { table: table.to_string(), column: c.clone() })
            })
            .collect::<Result<Vec<usize>>>()?;
        let output = ensure_overwrite(snapshot.columns(), table, output, overwrite)?;

        let mut args: Vec<Value> = Vec::with_capacity(indices.len());
        let results: Vec<Value> = snapshot
            .rows()
            .iter()
            .map(|row| {
                args.clear();
                args.extend(indices.iter().map(|&i| row[i].clone()));
                func(&args).into()
            })
            .collect();
        debug!(target: "faro::mapping", "map: table='{}' columns={:?} output='{}' rows={}", table, columns, output, results.len());
        self.persist_column(snapshot, table, &output, results)
    }

    /// Map `func` over `table`, binding each declared parameter of `func` to
    /// the column of the same name, and store results in `output`.
    ///
    /// Fails with [`Error::UnboundParameter`] when a parameter names no column.
    /// The whole relation is re-read before persisting so columns that are not
    /// bound are kept.
    pub fn map_into(&mut self, mut func: RowFn<'_>, table: &str, output: &str, overwrite: bool) -> Result<()> {
        ensure_name("table", table)?;
        ensure_name("output", output)?;
        let params = func.params().to_vec();
        if let Some(dup) = params.iter().enumerate().find(|&(i, p)| params[..i].contains(p)).map(|(_, p)| p) {
            return Err(Error::invalid_argument("func", format!("parameter '{}' is declared twice", dup)));
        }

        let existing = self.column_names(table)?;
        if let Some(missing) = params.iter().find(|p| !existing.contains(*p)) {
            return Err(Error::UnboundParameter { table: table.to_string(), parameter: missing.clone() });
        }

        let bound = self.fetch_bound(table, &params)?;
        let output = ensure_overwrite(&existing, table, output, overwrite)?;

        let results: Vec<Value> = bound
            .rows()
            .iter()
            .map(|values| func.call(&Row::new(bound.columns(), values)))
            .collect();
        debug!(target: "faro::mapping", "map_into: table='{}' params={:?} output='{}' rows={}", table, params, output, results.len());

        let snapshot = self.read_table(table)?;
        self.persist_column(snapshot, table, &output, results)
    }

    // Zero parameters still yield one (empty) argument row per relation row.
    fn fetch_bound(&self, table: &str, params: &[String]) -> Result<Table> {
        if !params.is_empty() {
            return self.query(&format!("SELECT {} FROM {}", quote_idents(params), quote_ident(table)));
        }
        let counted = self.query(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))?;
        let n = counted.rows().first().and_then(|r| r.first()).and_then(Value::as_i64).unwrap_or(0);
        Ok(Table::with_types(Vec::new(), Vec::new(), vec![Vec::new(); n as usize]))
    }

    fn persist_column(&mut self, snapshot: Table, table: &str, output: &str, results: Vec<Value>) -> Result<()> {
        let mut df = snapshot.to_dataframe()?;
        let series = values_to_series(output, ColumnType::infer(&results), &results)?;
        df.with_column(series)?;
        self.add_table(df, table, IfExists::Replace)?;
        info!(target: "faro::mapping", "persisted column '{}' into table='{}'", output, table);
        Ok(())
    }
}

#[cfg(test)]
#[path = "mapping_tests.rs"]
mod mapping_tests;
