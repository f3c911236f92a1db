//! Records and their field descriptors.
//!
//! A record type lists its columns once, at compile time, as a static slice
//! of [`FieldDescriptor`]s. The mapper walks that slice instead of
//! inspecting values at runtime.
//!
//! ```
//! use pgbatch::record;
//!
//! struct User {
//!     name: String,
//!     age: i32,
//!     nickname: Option<String>,
//!     tags: Vec<String>,
//!     internal_note: String,
//! }
//!
//! record!(User {
//!     name => "name",
//!     age => "age",
//!     nickname => "nickname",
//!     tags => "tags",
//!     #[hidden]
//!     internal_note => "note",
//! });
//! ```
//!
//! Fields that are not listed, or whose tag is empty or `-`, never become
//! columns. `#[hidden]` marks a field that is declared but must not be read.

use crate::Value;
use chrono::{DateTime, NaiveDateTime, Utc};
use pgbatch_sql::{PgCast, PgType};
use rust_decimal::Decimal;

/// What a field contributes to a row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A single value, including byte strings.
    Scalar(Value),

    /// A list that has to be wrapped before it can be bound as a parameter.
    Sequence(Vec<Value>),
}

/// A Rust type that can be stored in a column.
pub trait ColumnValue {
    /// Convert the field into a column value.
    fn to_field(&self) -> FieldValue;

    /// Whether this is the type's empty value (`0`, `""`, `false`, `None`, `[]`).
    fn is_zero(&self) -> bool;

    /// The Postgres type of this Rust type, if it has a fixed one.
    fn pg_cast() -> Option<PgCast>;

    /// The placeholder cast for this value. Only dynamic values differ from
    /// [`ColumnValue::pg_cast`].
    fn column_cast(&self) -> Option<PgCast> {
        Self::pg_cast()
    }
}

macro_rules! scalar_column_value {
    ($($ty:ty as $pg:ident => |$v:ident| $zero:expr),* $(,)?) => {
        $(
            impl ColumnValue for $ty {
                fn to_field(&self) -> FieldValue {
                    FieldValue::Scalar(Value::from(self.clone()))
                }

                fn is_zero(&self) -> bool {
                    let $v = self;
                    $zero
                }

                fn pg_cast() -> Option<PgCast> {
                    Some(PgCast::Scalar(PgType::$pg))
                }
            }
        )*
    };
}

scalar_column_value! {
    bool as Boolean => |v| !*v,
    i16 as SmallInt => |v| *v == 0,
    i32 as Integer => |v| *v == 0,
    i64 as BigInt => |v| *v == 0,
    f32 as Real => |v| *v == 0.0,
    f64 as Double => |v| *v == 0.0,
    String as Text => |v| v.is_empty(),
    Decimal as Numeric => |v| v.is_zero(),
    NaiveDateTime as Timestamp => |_v| false,
    DateTime<Utc> as Timestamptz => |_v| false,
}

impl ColumnValue for &str {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::from(*self))
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn pg_cast() -> Option<PgCast> {
        Some(PgType::Text.into())
    }
}

// `bytea` is one value, not an array of small integers.
impl ColumnValue for Vec<u8> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::Bytes(self.clone()))
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn pg_cast() -> Option<PgCast> {
        Some(PgType::Bytea.into())
    }
}

macro_rules! sequence_column_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ColumnValue for Vec<$ty> {
                fn to_field(&self) -> FieldValue {
                    FieldValue::Sequence(self.iter().cloned().map(Value::from).collect())
                }

                fn is_zero(&self) -> bool {
                    self.is_empty()
                }

                fn pg_cast() -> Option<PgCast> {
                    <$ty as ColumnValue>::pg_cast().map(PgCast::array_of)
                }
            }
        )*
    };
}

sequence_column_value! {
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    Decimal,
    NaiveDateTime,
    DateTime<Utc>,
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    fn to_field(&self) -> FieldValue {
        match self {
            Some(v) => v.to_field(),
            None => FieldValue::Scalar(Value::Null),
        }
    }

    // `Some(0)` is a value the caller chose, only `None` is empty.
    fn is_zero(&self) -> bool {
        self.is_none()
    }

    // A `None` keeps the type of `T`, so a NULL can still be cast.
    fn pg_cast() -> Option<PgCast> {
        T::pg_cast()
    }

    fn column_cast(&self) -> Option<PgCast> {
        match self {
            Some(v) => v.column_cast(),
            None => T::pg_cast(),
        }
    }
}

impl ColumnValue for Value {
    fn to_field(&self) -> FieldValue {
        match self {
            Value::Array(items) => FieldValue::Sequence(items.clone()),
            other => FieldValue::Scalar(other.clone()),
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(v) => !*v,
            Value::I16(v) => *v == 0,
            Value::I32(v) => *v == 0,
            Value::I64(v) => *v == 0,
            Value::F32(v) => *v == 0.0,
            Value::F64(v) => *v == 0.0,
            Value::Decimal(v) => v.is_zero(),
            Value::String(v) | Value::Json(v) => v.is_empty(),
            Value::Bytes(v) => v.is_empty(),
            Value::Array(v) => v.is_empty(),
            Value::Timestamp(_) | Value::TimestampTz(_) => false,
        }
    }

    fn pg_cast() -> Option<PgCast> {
        None
    }

    fn column_cast(&self) -> Option<PgCast> {
        self.cast()
    }
}

/// Describes one field of a record type.
pub struct FieldDescriptor<R> {
    /// Rust field name.
    pub name: &'static str,

    /// Column tag; empty or `-` means the field is not a column.
    pub tag: &'static str,

    /// Unreadable fields are skipped by the mapper.
    pub readable: bool,

    pub is_zero: fn(&R) -> bool,
    pub value: fn(&R) -> FieldValue,
    pub cast: fn(&R) -> Option<PgCast>,
}

impl<R> FieldDescriptor<R> {
    /// The column this field maps to, if it has a usable tag.
    pub fn column(&self) -> Option<&'static str> {
        pgbatch_sql::is_column_tag(self.tag).then_some(self.tag)
    }
}

impl<R> std::fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("tag", &self.tag)
            .field("readable", &self.readable)
            .finish_non_exhaustive()
    }
}

/// A value that can be inserted as one row.
pub trait Record: Sized + 'static {
    /// Field descriptors, built once per type.
    fn fields() -> &'static [FieldDescriptor<Self>];
}

/// Implement [`Record`] for a struct by listing `field => "column"` pairs.
///
/// Prefix an entry with `#[hidden]` to declare a field the mapper must skip.
#[macro_export]
macro_rules! record {
    ($ty:ty { $( $(#[$attr:ident])* $field:ident => $tag:expr ),* $(,)? }) => {
        impl $crate::Record for $ty {
            fn fields() -> &'static [$crate::FieldDescriptor<Self>] {
                const FIELDS: &[$crate::FieldDescriptor<$ty>] = &[
                    $(
                        $crate::FieldDescriptor {
                            name: stringify!($field),
                            tag: $tag,
                            readable: $crate::__record_readable!($($attr)*),
                            is_zero: |r: &$ty| $crate::ColumnValue::is_zero(&r.$field),
                            value: |r: &$ty| $crate::ColumnValue::to_field(&r.$field),
                            cast: |r: &$ty| $crate::ColumnValue::column_cast(&r.$field),
                        },
                    )*
                ];
                FIELDS
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __record_readable {
    () => {
        true
    };
    (hidden) => {
        false
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        id: i64,
        label: String,
        skipped: String,
        dash: i32,
        secret: String,
    }

    crate::record!(Row {
        id => "id",
        label => "label",
        skipped => "",
        dash => "-",
        #[hidden]
        secret => "secret",
    });

    #[test]
    fn test_descriptors_follow_declaration_order() {
        let names: Vec<_> = Row::fields().iter().map(|f| f.name).collect();
        assert_eq!(names, ["id", "label", "skipped", "dash", "secret"]);
    }

    #[test]
    fn test_empty_and_dash_tags_are_not_columns() {
        let columns: Vec<_> = Row::fields().iter().filter_map(|f| f.column()).collect();
        assert_eq!(columns, ["id", "label", "secret"]);
    }

    #[test]
    fn test_hidden_field_is_unreadable() {
        let secret = Row::fields().iter().find(|f| f.name == "secret").unwrap();
        assert!(!secret.readable);
    }

    #[test]
    fn test_descriptor_reads_values() {
        let row = Row {
            id: 3,
            label: String::new(),
            skipped: "x".into(),
            dash: 1,
            secret: "s".into(),
        };
        let id = &Row::fields()[0];
        assert!(!(id.is_zero)(&row));
        assert_eq!((id.value)(&row), FieldValue::Scalar(Value::I64(3)));

        let label = &Row::fields()[1];
        assert!((label.is_zero)(&row));
    }

    #[test]
    fn test_zero_values() {
        assert!(0i32.is_zero());
        assert!(String::new().is_zero());
        assert!(false.is_zero());
        assert!(None::<i32>.is_zero());
        assert!(!Some(0i32).is_zero());
        assert!(!Some(false).is_zero());
        assert!(Vec::<String>::new().is_zero());
        assert!(Vec::<u8>::new().is_zero());
        assert!(!Decimal::ONE.is_zero());
    }

    #[test]
    fn test_bytes_are_scalar_and_lists_are_sequences() {
        assert_eq!(
            vec![1u8, 2].to_field(),
            FieldValue::Scalar(Value::Bytes(vec![1, 2]))
        );
        assert_eq!(
            vec!["a".to_string()].to_field(),
            FieldValue::Sequence(vec![Value::String("a".into())])
        );
    }

    fn column_names<R: Record>() -> Vec<&'static str> {
        R::fields().iter().filter_map(|f| f.column()).collect()
    }

    #[test]
    fn test_fields_through_a_generic_bound() {
        assert_eq!(column_names::<Row>(), ["id", "label", "secret"]);
    }

    #[test]
    fn test_casts_follow_rust_types() {
        assert_eq!(true.column_cast(), Some(PgCast::Scalar(PgType::Boolean)));
        assert_eq!(1i16.column_cast(), Some(PgCast::Scalar(PgType::SmallInt)));
        assert_eq!(1.5f64.column_cast(), Some(PgCast::Scalar(PgType::Double)));
        assert_eq!(Decimal::ONE.column_cast(), Some(PgCast::Scalar(PgType::Numeric)));
        assert_eq!(vec![1u8].column_cast(), Some(PgCast::Scalar(PgType::Bytea)));
        assert_eq!(
            Vec::<String>::new().column_cast(),
            Some(PgCast::Array(PgType::Text))
        );
        assert_eq!(
            None::<Vec<i64>>.column_cast(),
            Some(PgCast::Array(PgType::BigInt))
        );
        assert_eq!(None::<bool>.column_cast(), Some(PgCast::Scalar(PgType::Boolean)));
        assert_eq!(Value::Null.column_cast(), None);
        assert_eq!(Value::F32(1.0).column_cast(), Some(PgCast::Scalar(PgType::Real)));
    }

    #[test]
    fn test_descriptor_cast_keeps_type_of_none() {
        let row = Row {
            id: 0,
            label: String::new(),
            skipped: String::new(),
            dash: 0,
            secret: String::new(),
        };
        let id = &Row::fields()[0];
        assert_eq!((id.cast)(&row), Some(PgCast::Scalar(PgType::BigInt)));
    }

    #[test]
    fn test_some_false_is_a_value() {
        assert_eq!(Some(false).to_field(), FieldValue::Scalar(Value::Bool(false)));
        assert_eq!(None::<bool>.to_field(), FieldValue::Scalar(Value::Null));
    }
}
