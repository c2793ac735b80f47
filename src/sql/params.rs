//! Convert JSON values to SQLite binds and SQLite rows back to ordered records.

use serde_json::{Map, Number, Value};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// One row as ordered column name -> value pairs (order = SELECT order).
pub type Record = Map<String, Value>;

pub type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// A value that can be bound to a SQLite statement. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum SqliteBindValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqliteBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => SqliteBindValue::Null,
            Value::Bool(b) => SqliteBindValue::Integer(i64::from(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqliteBindValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    SqliteBindValue::Real(f)
                } else {
                    SqliteBindValue::Null
                }
            }
            Value::String(s) => SqliteBindValue::Text(s.clone()),
            Value::Array(items) => {
                // Blob cells travel as arrays of bytes.
                let bytes: Option<Vec<u8>> = items
                    .iter()
                    .map(|i| i.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect();
                match bytes {
                    Some(b) => SqliteBindValue::Blob(b),
                    None => SqliteBindValue::Text(v.to_string()),
                }
            }
            Value::Object(_) => SqliteBindValue::Text(v.to_string()),
        }
    }

    pub fn bind<'q>(self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        match self {
            SqliteBindValue::Null => query.bind(None::<String>),
            SqliteBindValue::Integer(n) => query.bind(n),
            SqliteBindValue::Real(n) => query.bind(n),
            SqliteBindValue::Text(s) => query.bind(s),
            SqliteBindValue::Blob(b) => query.bind(b),
        }
    }
}

/// Bind every value in order.
pub fn bind_all<'q>(mut query: SqliteQuery<'q>, values: &[Value]) -> SqliteQuery<'q> {
    for v in values {
        query = SqliteBindValue::from_json(v).bind(query);
    }
    query
}

pub fn row_to_record(row: &SqliteRow) -> Record {
    let mut map = Record::new();
    for (i, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), cell_to_value(row, i));
    }
    map
}

/// Decodes by the storage class of the stored value, not the declared column type.
fn cell_to_value(row: &SqliteRow, i: usize) -> Value {
    let type_name = match row.try_get_raw(i) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };
    match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get_unchecked::<i64, _>(i)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "REAL" | "NUMERIC" => row
            .try_get_unchecked::<f64, _>(i)
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(i)
            .map(|b| Value::Array(b.into_iter().map(Value::from).collect()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get_unchecked::<String, _>(i)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
