//! Runtime values for query parameters.

use chrono::{DateTime, NaiveDateTime, Utc};
use pgbatch_sql::{PgCast, PgType};
use rust_decimal::Decimal;

/// A runtime SQL value.
///
/// Column maps and argument lists hold these instead of trait objects, so
/// type-dependent decisions (placeholder casts) are a plain `match`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL
    Null,

    /// Boolean
    Bool(bool),

    /// 16-bit signed integer (SMALLINT)
    I16(i16),

    /// 32-bit signed integer (INTEGER)
    I32(i32),

    /// 64-bit signed integer (BIGINT)
    I64(i64),

    /// 32-bit float (REAL)
    F32(f32),

    /// 64-bit float (DOUBLE PRECISION)
    F64(f64),

    /// Decimal (NUMERIC)
    Decimal(Decimal),

    /// Text (TEXT, VARCHAR, etc.)
    String(String),

    /// Binary data (BYTEA)
    Bytes(Vec<u8>),

    /// JSON/JSONB data (stored as JSON string for dynamic use)
    Json(String),

    /// TIMESTAMP WITHOUT TIME ZONE
    Timestamp(NaiveDateTime),

    /// TIMESTAMP WITH TIME ZONE
    TimestampTz(DateTime<Utc>),

    /// A Postgres array. Elements are expected to share one type.
    Array(Vec<Value>),
}

impl Value {
    /// Returns true if this is a NULL value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The explicit cast a placeholder carrying this value needs when the
    /// database cannot infer the type from a target column.
    ///
    /// `NULL` and arrays without a typed element have none; the caller
    /// falls back to the column's declared type.
    pub fn cast(&self) -> Option<PgCast> {
        let ty = match self {
            Value::Null => return None,
            Value::Array(items) => {
                return items.iter().find_map(Value::cast).map(PgCast::array_of);
            }
            Value::Bool(_) => PgType::Boolean,
            Value::I16(_) => PgType::SmallInt,
            Value::I32(_) => PgType::Integer,
            Value::I64(_) => PgType::BigInt,
            Value::F32(_) => PgType::Real,
            Value::F64(_) => PgType::Double,
            Value::Decimal(_) => PgType::Numeric,
            Value::String(_) => PgType::Text,
            Value::Bytes(_) => PgType::Bytea,
            Value::Json(_) => PgType::Jsonb,
            Value::Timestamp(_) => PgType::Timestamp,
            Value::TimestampTz(_) => PgType::Timestamptz,
        };
        Some(ty.into())
    }
}

// Convenient From impls
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}
