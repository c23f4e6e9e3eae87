//! `Table`: the immutable row/column carrier returned by queries and accepted
//! as an ingestion source. Converts to and from the canonical polars form.

use std::fmt::{self, Display, Formatter};

use polars::prelude::{Column, DataFrame};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::{values_to_series, ColumnType, Value};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    /// Declared or inferred type per column. Used when values alone cannot
    /// decide (empty or all-null columns).
    types: Vec<ColumnType>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table from column names and rows. Every row must have one value per column.
    pub fn new<S: Into<String>>(columns: Vec<S>, rows: Vec<Vec<Value>>) -> Result<Table> {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(Error::invalid_argument(
                "rows",
                format!("row {} has {} values, expected {}", idx, row.len(), columns.len()),
            ));
        }
        let types = (0..columns.len())
            .map(|i| ColumnType::infer(rows.iter().map(|r| &r[i])))
            .collect();
        Ok(Table { columns, types, rows })
    }

    /// Build a table whose first row holds the column names.
    pub fn from_rows_with_header(mut rows: Vec<Vec<Value>>) -> Result<Table> {
        if rows.is_empty() {
            return Err(Error::invalid_argument("rows", "a header row is required"));
        }
        let header: Vec<String> = rows
            .remove(0)
            .into_iter()
            .map(|v| match v {
                Value::Text(s) => s,
                other => other.to_string(),
            })
            .collect();
        Table::new(header, rows)
    }

    /// Build a table from JSON objects. Columns appear in first-seen key order;
    /// keys missing from a record become nulls.
    pub fn from_records(records: &[serde_json::Map<String, serde_json::Value>]) -> Result<Table> {
        let mut columns: Vec<String> = Vec::new();
        for rec in records {
            for key in rec.keys() {
                if !columns.iter().any(|c| c == key) { columns.push(key.clone()); }
            }
        }
        let rows = records
            .iter()
            .map(|rec| columns.iter().map(|c| rec.get(c).map(Value::from_json).unwrap_or_default()).collect())
            .collect();
        Table::new(columns, rows)
    }

    pub(crate) fn with_types(columns: Vec<String>, types: Vec<ColumnType>, rows: Vec<Vec<Value>>) -> Table {
        Table { columns, types, rows }
    }

    pub fn columns(&self) -> &[String] { &self.columns }

    pub fn column_types(&self) -> &[ColumnType] { &self.types }

    pub fn rows(&self) -> &[Vec<Value>] { &self.rows }

    pub fn into_rows(self) -> Vec<Vec<Value>> { self.rows }

    pub fn len(&self) -> usize { self.rows.len() }

    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn width(&self) -> usize { self.columns.len() }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Convert to a DataFrame. Types are inferred from the values; columns with
    /// no non-null value fall back to their declared type.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut cols: Vec<Column> = Vec::with_capacity(self.columns.len());
        for (i, name) in self.columns.iter().enumerate() {
            let values: Vec<Value> = self.rows.iter().map(|r| r[i].clone()).collect();
            let ty = match ColumnType::infer(&values) {
                ColumnType::Null => self.types.get(i).copied().unwrap_or(ColumnType::Null),
                inferred => inferred,
            };
            cols.push(Column::from(values_to_series(name, ty, &values)?));
        }
        Ok(DataFrame::new(cols)?)
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Table> {
        let columns: Vec<String> = df.get_column_names().iter().map(|c| c.to_string()).collect();
        let types: Vec<ColumnType> = df.get_columns().iter().map(|c| ColumnType::from_dtype(c.dtype())).collect();
        let mut rows: Vec<Vec<Value>> = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let mut row = Vec::with_capacity(columns.len());
            for c in df.get_columns() {
                row.push(Value::from_any_value(&c.get(i)?));
            }
            rows.push(row);
        }
        Ok(Table { columns, types, rows })
    }
}

impl TryFrom<&DataFrame> for Table {
    type Error = Error;

    fn try_from(df: &DataFrame) -> Result<Table> { Table::from_dataframe(df) }
}

fn separator(widths: &[usize]) -> String {
    let mut s = String::from("+");
    for w in widths {
        s.push_str(&"-".repeat(w + 2));
        s.push('+');
    }
    s
}

fn line(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::from("|");
    for (cell, w) in cells.iter().zip(widths) {
        s.push_str(&format!(" {:<width$} |", cell, width = *w));
    }
    s
}

// ASCII grid, one line per row.
impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self.rows.iter().map(|r| r.iter().map(|v| v.to_string()).collect()).collect();
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for r in &cells {
            for (i, cell) in r.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
        let sep = separator(&widths);
        writeln!(f, "{}", sep)?;
        writeln!(f, "{}", line(&self.columns, &widths))?;
        writeln!(f, "{}", sep)?;
        for r in &cells {
            writeln!(f, "{}", line(r, &widths))?;
        }
        write!(f, "{}", sep)
    }
}

#[cfg(test)]
#[path = "table_tests.rs"]
mod table_tests;
