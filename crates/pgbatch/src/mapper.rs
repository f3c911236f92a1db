//! Turn records into ordered column maps.

use indexmap::IndexMap;
use pgbatch_sql::{ColumnName, PgCast};

use crate::record::{FieldValue, Record};
use crate::Value;

/// Column name to value, in field declaration order.
pub type ColumnMap = IndexMap<ColumnName, Value>;

/// Column name to the cast its placeholders take when the value alone
/// cannot say (a `NULL`, an empty array).
pub type ColumnCasts = IndexMap<ColumnName, PgCast>;

/// Controls which fields survive mapping.
#[derive(Debug, Clone, Default)]
pub struct MapOptions {
    /// Columns kept even when their value is empty.
    pub keep_empty: Vec<ColumnName>,

    /// Turns a list field into one bindable value. Without it, list fields are dropped.
    pub wrap_sequence: Option<fn(Vec<Value>) -> Value>,
}

impl MapOptions {
    /// Options used by the insert pipeline: lists become Postgres arrays.
    pub fn for_insert(keep_empty: Vec<ColumnName>) -> Self {
        Self {
            keep_empty,
            wrap_sequence: Some(Value::Array),
        }
    }

    fn keeps(&self, column: &str) -> bool {
        self.keep_empty.iter().any(|c| c.as_str() == column)
    }
}

/// Map a record with default options: empty values and list fields are dropped.
pub fn map_columns<R: Record>(record: &R) -> ColumnMap {
    map_columns_with(record, &MapOptions::default())
}

/// Map a record to its insertable columns.
///
/// A field is skipped when it has no column tag, is hidden, or holds an
/// empty value whose column is not in `keep_empty`. List fields are only
/// kept when `wrap_sequence` is set. Byte strings are scalars and are never
/// wrapped.
pub fn map_columns_with<R: Record>(record: &R, opts: &MapOptions) -> ColumnMap {
    let mut map = ColumnMap::new();

    for field in R::fields() {
        let Some(column) = field.column() else {
            continue;
        };
        if !field.readable {
            continue;
        }

        let keep = opts.keeps(column);
        if !keep && (field.is_zero)(record) {
            continue;
        }

        match (field.value)(record) {
            FieldValue::Scalar(value) => {
                map.insert(column.into(), value);
            }
            FieldValue::Sequence(items) => {
                if let Some(wrap) = opts.wrap_sequence {
                    map.insert(column.into(), wrap(items));
                }
            }
        }
    }

    map
}

/// The declared type of every readable column of `R`.
///
/// Typed fields answer from their Rust type, even when `None`. Dynamic
/// [`Value`] fields take the type of the first record that holds one.
pub fn column_casts<R: Record>(records: &[R]) -> ColumnCasts {
    let mut casts = ColumnCasts::new();

    for field in R::fields() {
        let Some(column) = field.column() else {
            continue;
        };
        if !field.readable {
            continue;
        }
        if let Some(cast) = records.iter().find_map(|r| (field.cast)(r)) {
            casts.insert(column.into(), cast);
        }
    }

    casts
}

#[cfg(test)]
mod tests {
    use pgbatch_sql::PgType;

    use super::*;

    struct Profile {
        avg: i32,
        nickname: String,
        city: String,
        scores: Vec<i32>,
        avatar: Vec<u8>,
        bio: Option<String>,
        internal: String,
        untagged: String,
    }

    crate::record!(Profile {
        avg => "avg",
        nickname => "nickname",
        city => "city",
        scores => "scores",
        avatar => "avatar",
        bio => "bio",
        #[hidden]
        internal => "internal",
        untagged => "-",
    });

    fn empty_profile() -> Profile {
        Profile {
            avg: 0,
            nickname: String::new(),
            city: String::new(),
            scores: Vec::new(),
            avatar: Vec::new(),
            bio: None,
            internal: "secret".into(),
            untagged: "x".into(),
        }
    }

    fn get(map: &ColumnMap, column: &str) -> Value {
        map[&ColumnName::from(column)].clone()
    }

    fn keys(map: &ColumnMap) -> Vec<&str> {
        map.keys().map(|k| k.as_str()).collect()
    }

    #[test]
    fn test_empty_values_are_dropped() {
        let map = map_columns(&empty_profile());
        assert!(map.is_empty());
    }

    #[test]
    fn test_keep_empty_only_listed_column() {
        let opts = MapOptions {
            keep_empty: vec!["avg".into()],
            wrap_sequence: None,
        };
        let map = map_columns_with(&empty_profile(), &opts);
        assert_eq!(keys(&map), ["avg"]);
        assert_eq!(get(&map, "avg"), Value::I32(0));
    }

    #[test]
    fn test_keep_empty_whitelist() {
        let opts = MapOptions {
            keep_empty: vec!["avg".into(), "nickname".into()],
            wrap_sequence: None,
        };
        let map = map_columns_with(&empty_profile(), &opts);
        assert_eq!(keys(&map), ["avg", "nickname"]);
        assert_eq!(get(&map, "avg"), Value::I32(0));
        assert_eq!(get(&map, "nickname"), Value::String(String::new()));
    }

    #[test]
    fn test_hidden_and_untagged_fields_never_map() {
        let mut profile = empty_profile();
        profile.city = "Lyon".into();
        let opts = MapOptions {
            keep_empty: vec!["internal".into()],
            wrap_sequence: None,
        };
        let map = map_columns_with(&profile, &opts);
        assert_eq!(keys(&map), ["city"]);
    }

    #[test]
    fn test_lists_need_a_wrapper() {
        let mut profile = empty_profile();
        profile.scores = vec![1, 2];

        assert!(map_columns(&profile).is_empty());

        let map = map_columns_with(&profile, &MapOptions::for_insert(Vec::new()));
        assert_eq!(
            get(&map, "scores"),
            Value::Array(vec![Value::I32(1), Value::I32(2)])
        );
    }

    #[test]
    fn test_empty_list_kept_when_whitelisted() {
        let map = map_columns_with(
            &empty_profile(),
            &MapOptions::for_insert(vec!["scores".into()]),
        );
        assert_eq!(get(&map, "scores"), Value::Array(Vec::new()));
    }

    #[test]
    fn test_bytes_are_never_wrapped() {
        let mut profile = empty_profile();
        profile.avatar = vec![0xde, 0xad];

        let map = map_columns(&profile);
        assert_eq!(get(&map, "avatar"), Value::Bytes(vec![0xde, 0xad]));

        let map = map_columns_with(&profile, &MapOptions::for_insert(Vec::new()));
        assert_eq!(get(&map, "avatar"), Value::Bytes(vec![0xde, 0xad]));
    }

    #[test]
    fn test_whitelisted_none_maps_to_null() {
        let map = map_columns_with(&empty_profile(), &MapOptions::for_insert(vec!["bio".into()]));
        assert_eq!(get(&map, "bio"), Value::Null);
    }

    #[test]
    fn test_column_casts_cover_empty_fields() {
        let casts = column_casts(&[empty_profile()]);
        let keys: Vec<_> = casts.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, ["avg", "nickname", "city", "scores", "avatar", "bio"]);
        assert_eq!(casts[&ColumnName::from("avg")], PgCast::Scalar(PgType::Integer));
        assert_eq!(casts[&ColumnName::from("scores")], PgCast::Array(PgType::Integer));
        assert_eq!(casts[&ColumnName::from("avatar")], PgCast::Scalar(PgType::Bytea));
        assert_eq!(casts[&ColumnName::from("bio")], PgCast::Scalar(PgType::Text));
    }

    #[test]
    fn test_column_casts_of_dynamic_values() {
        struct Event {
            payload: Value,
        }

        crate::record!(Event {
            payload => "payload",
        });

        let events = [
            Event {
                payload: Value::Null,
            },
            Event {
                payload: Value::Json("{}".into()),
            },
        ];
        let casts = column_casts(&events);
        assert_eq!(
            casts[&ColumnName::from("payload")],
            PgCast::Scalar(PgType::Jsonb)
        );
        assert!(column_casts(&events[..1]).is_empty());
    }

    #[test]
    fn test_order_follows_declaration() {
        let profile = Profile {
            avg: 4,
            nickname: "nick".into(),
            city: "Lyon".into(),
            scores: vec![1],
            avatar: vec![1],
            bio: Some("hi".into()),
            internal: String::new(),
            untagged: String::new(),
        };
        let map = map_columns_with(&profile, &MapOptions::for_insert(Vec::new()));
        assert_eq!(
            keys(&map),
            ["avg", "nickname", "city", "scores", "avatar", "bio"]
        );
    }
}
