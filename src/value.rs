//! Scalar values and column typing.
//!
//! `Value` is the single scalar model shared by the engine boundary (rusqlite),
//! the polars boundary (AnyValue / Series) and the row functions used by the
//! mapping engine. `ColumnType` is the per-column inferred type.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::{AnyValue, DataType, NamedFrom, PolarsResult, Series, TimeUnit};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

/// Text layout used for timestamps stored in the engine.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

static NULL: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Null,
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
}

impl Value {
    pub(crate) fn null_ref() -> &'static Value { &NULL }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }

    pub fn as_i64(&self) -> Option<i64> {
        match self { Value::Int(i) => Some(*i), _ => None }
    }

    /// Integers widen to floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self { Value::Bool(b) => Some(*b), _ => None }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self { Value::Text(s) => Some(s.as_str()), _ => None }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self { Value::Timestamp(t) => Some(*t), _ => None }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Value::Null => ColumnType::Null,
            Value::Bool(_) => ColumnType::Boolean,
            Value::Int(_) => ColumnType::Integer,
            Value::Float(_) => ColumnType::Float,
            Value::Timestamp(_) => ColumnType::Timestamp,
            Value::Text(_) => ColumnType::Text,
        }
    }

    pub fn from_any_value(av: &AnyValue<'_>) -> Value {
        match av {
            AnyValue::Null => Value::Null,
            AnyValue::Boolean(b) => Value::Bool(*b),
            AnyValue::Int64(v) => Value::Int(*v),
            AnyValue::Int32(v) => Value::Int(*v as i64),
            AnyValue::UInt32(v) => Value::Int(*v as i64),
            AnyValue::UInt64(v) => i64::try_from(*v).map(Value::Int).unwrap_or(Value::Float(*v as f64)),
            AnyValue::Float64(v) => Value::Float(*v),
            AnyValue::Float32(v) => Value::Float(*v as f64),
            AnyValue::String(s) => Value::Text(s.to_string()),
            AnyValue::StringOwned(s) => Value::Text(s.to_string()),
            AnyValue::Date(days) => DateTime::from_timestamp(*days as i64 * 86_400, 0)
                .map(|d| Value::Timestamp(d.naive_utc()))
                .unwrap_or(Value::Null),
            AnyValue::Datetime(v, tu, _) => from_epoch(*v, *tu).map(Value::Timestamp).unwrap_or(Value::Null),
            other => {
                let dt = other.dtype();
                if dt.is_integer() {
                    other.extract::<i64>().map(Value::Int).unwrap_or(Value::Null)
                } else if dt.is_float() {
                    other.extract::<f64>().map(Value::Float).unwrap_or(Value::Null)
                } else {
                    Value::Text(other.to_string())
                }
            }
        }
    }

    /// Decode an engine value, restoring booleans and timestamps from the
    /// column's declared type.
    pub(crate) fn from_sql(v: ValueRef<'_>, declared: ColumnType) -> Value {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) if declared == ColumnType::Boolean => Value::Bool(i != 0),
            ValueRef::Integer(i) => Value::Int(i),
            ValueRef::Real(f) => Value::Float(f),
            ValueRef::Text(t) => {
                let s = String::from_utf8_lossy(t);
                if declared == ColumnType::Timestamp {
                    if let Some(ts) = parse_timestamp(&s) { return Value::Timestamp(ts); }
                }
                Value::Text(s.into_owned())
            }
            ValueRef::Blob(b) => Value::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }

    pub fn from_json(v: &serde_json::Value) -> Value {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }
}

fn from_epoch(v: i64, tu: TimeUnit) -> Option<NaiveDateTime> {
    let dt = match tu {
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(v)),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(v),
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(v),
    };
    dt.map(|d| d.naive_utc())
}

pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)))
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;
        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sql::Integer(*b as i64)),
            Value::Int(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::Float(x) => ToSqlOutput::Owned(Sql::Real(*x)),
            Value::Timestamp(t) => ToSqlOutput::Owned(Sql::Text(t.format(TIMESTAMP_FORMAT).to_string())),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::Text(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::Text(v.to_string()) } }
impl From<NaiveDateTime> for Value { fn from(v: NaiveDateTime) -> Self { Value::Timestamp(v) } }
impl From<()> for Value { fn from(_: ()) -> Self { Value::Null } }

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

impl ColumnType {
    /// Map an engine-declared column type to a logical type.
    pub(crate) fn from_decl(decl: Option<&str>) -> ColumnType {
        let Some(decl) = decl else { return ColumnType::Null };
        match decl.to_ascii_lowercase().as_str() {
            "boolean" | "bool" => ColumnType::Boolean,
            "timestamp" | "datetime" | "date" => ColumnType::Timestamp,
            s if s.contains("int") => ColumnType::Integer,
            s if s.contains("char") || s.contains("clob") || s.contains("text") => ColumnType::Text,
            s if s.contains("real") || s.contains("floa") || s.contains("doub") => ColumnType::Float,
            _ => ColumnType::Null,
        }
    }

    pub fn from_dtype(dt: &DataType) -> ColumnType {
        match dt {
            DataType::Null => ColumnType::Null,
            DataType::Boolean => ColumnType::Boolean,
            DataType::String => ColumnType::Text,
            DataType::Date | DataType::Datetime(_, _) => ColumnType::Timestamp,
            dt if dt.is_integer() => ColumnType::Integer,
            dt if dt.is_float() => ColumnType::Float,
            _ => ColumnType::Text,
        }
    }

    pub fn dtype(&self) -> DataType {
        match self {
            ColumnType::Null => DataType::Null,
            ColumnType::Integer => DataType::Int64,
            ColumnType::Float => DataType::Float64,
            ColumnType::Text => DataType::String,
            ColumnType::Boolean => DataType::Boolean,
            ColumnType::Timestamp => DataType::Datetime(TimeUnit::Microseconds, None),
        }
    }

    /// Declared type used in CREATE TABLE. Null columns get no declared type.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Null => "",
            ColumnType::Integer => "INTEGER",
            ColumnType::Float => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }

    fn merge(self, other: ColumnType) -> ColumnType {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Null, x) | (x, Null) => x,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }

    /// Infer a column type from its values: ints widen to floats, any other mix falls back to text.
    pub fn infer<'a, I: IntoIterator<Item = &'a Value>>(values: I) -> ColumnType {
        values.into_iter().fold(ColumnType::Null, |acc, v| acc.merge(v.column_type()))
    }
}

/// Build a typed polars Series from values. Values that do not fit `ty` are
/// stringified when `ty` is Text and become null otherwise.
pub(crate) fn values_to_series(name: &str, ty: ColumnType, values: &[Value]) -> PolarsResult<Series> {
    let series = match ty {
        ColumnType::Null => Series::full_null(name.into(), values.len(), &DataType::Null),
        ColumnType::Boolean => Series::new(name.into(), values.iter().map(Value::as_bool).collect::<Vec<_>>()),
        ColumnType::Integer => Series::new(name.into(), values.iter().map(Value::as_i64).collect::<Vec<_>>()),
        ColumnType::Float => Series::new(name.into(), values.iter().map(Value::as_f64).collect::<Vec<_>>()),
        ColumnType::Text => {
            let texts: Vec<Option<String>> = values
                .iter()
                .map(|v| match v {
                    Value::Null => None,
                    Value::Text(s) => Some(s.clone()),
                    other => Some(other.to_string()),
                })
                .collect();
            Series::new(name.into(), texts)
        }
        ColumnType::Timestamp => {
            let micros: Vec<Option<i64>> = values
                .iter()
                .map(|v| v.as_timestamp().map(|t| t.and_utc().timestamp_micros()))
                .collect();
            Series::new(name.into(), micros).cast(&ty.dtype())?
        }
    };
    Ok(series)
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod value_tests;
