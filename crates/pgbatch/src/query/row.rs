//! Mapping between Postgres wire types and our runtime values.

use super::Value;
use std::error::Error as StdError;
use tokio_postgres::types::{IsNull, ToSql, Type as PgTypeInfo};

/// Wrapper to make our Value usable as a ToSql parameter.
///
/// Every variant defers to the checked conversion of the wrapped Rust type,
/// so a value bound to a column of the wrong type is reported as an error
/// instead of being written with the wrong wire encoding.
#[derive(Debug)]
pub struct SqlParam<'a>(pub &'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(
        &self,
        ty: &PgTypeInfo,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self.0 {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::I16(v) => v.to_sql_checked(ty, out),
            Value::I32(v) => v.to_sql_checked(ty, out),
            Value::I64(v) => v.to_sql_checked(ty, out),
            Value::F32(v) => v.to_sql_checked(ty, out),
            Value::F64(v) => v.to_sql_checked(ty, out),
            Value::Decimal(v) => v.to_sql_checked(ty, out),
            Value::String(v) => v.to_sql_checked(ty, out),
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::TimestampTz(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => {
                // For JSONB, we need to prepend the version byte
                if *ty == PgTypeInfo::JSONB {
                    out.extend_from_slice(&[1]); // JSONB version 1
                }
                out.extend_from_slice(v.as_bytes());
                Ok(IsNull::No)
            }
            Value::Array(items) => {
                let params: Vec<SqlParam<'_>> = items.iter().map(SqlParam).collect();
                params.to_sql_checked(ty, out)
            }
        }
    }

    fn accepts(_ty: &PgTypeInfo) -> bool {
        // The real check happens per variant in `to_sql`.
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

/// Borrow a list of values as a tokio-postgres parameter slice.
pub fn sql_params(values: &[Value]) -> Vec<SqlParam<'_>> {
    values.iter().map(SqlParam).collect()
}

/// Read the generated identifier from the first column of a row.
///
/// `SMALLSERIAL`, `SERIAL` and `BIGSERIAL` keys all widen to `i64`.
pub fn scan_id(row: &tokio_postgres::Row) -> Result<i64, crate::Error> {
    let ty = match row.columns().first() {
        Some(column) => column.type_().clone(),
        None => {
            return Err(crate::Error::UnexpectedIdType {
                ty: "<no column>".to_string(),
            });
        }
    };

    let id = if ty == PgTypeInfo::INT2 {
        i64::from(row.try_get::<_, i16>(0)?)
    } else if ty == PgTypeInfo::INT4 {
        i64::from(row.try_get::<_, i32>(0)?)
    } else if ty == PgTypeInfo::INT8 {
        row.try_get::<_, i64>(0)?
    } else {
        return Err(crate::Error::UnexpectedIdType {
            ty: ty.name().to_string(),
        });
    };
    Ok(id)
}
