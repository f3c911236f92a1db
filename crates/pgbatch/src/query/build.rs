//! Build parameterized `INSERT` statements from column maps.

use indexmap::IndexSet;
use pgbatch_sql::{ColumnName, Expr, FromClause, InsertStmt, SelectStmt, TableName, render};

use super::{SqlParam, Value, sql_params};
use crate::mapper::{ColumnCasts, ColumnMap, column_casts, map_columns_with};
use crate::options::InsertOptions;
use crate::record::Record;
use crate::{Error, Result};

const VALUES_ALIAS: &str = "vs";
const REFERENCE_ALIAS: &str = "ref";

/// A rendered statement and its bind arguments, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltInsert {
    pub sql: String,
    pub args: Vec<Value>,
}

impl BuiltInsert {
    pub fn params(&self) -> Vec<SqlParam<'_>> {
        sql_params(&self.args)
    }
}

/// Union of the columns of `maps`, in first-seen order.
pub fn collect_columns<'a>(maps: impl IntoIterator<Item = &'a ColumnMap>) -> Vec<ColumnName> {
    let mut columns = IndexSet::new();
    for map in maps {
        for column in map.keys() {
            if !columns.contains(column) {
                columns.insert(column.clone());
            }
        }
    }
    columns.into_iter().collect()
}

/// Build one `INSERT` covering every record in `records`.
///
/// Returns `Ok(None)` when there are no records. Columns missing from a
/// record are bound as `NULL`.
pub fn build_batch_insert_query<R: Record>(
    table: &TableName,
    records: &[R],
    columns: &[ColumnName],
    opts: &InsertOptions,
) -> Result<Option<BuiltInsert>> {
    if columns.is_empty() {
        return Err(Error::EmptyColumns);
    }
    let map_opts = opts.map_options();
    let maps: Vec<ColumnMap> = records
        .iter()
        .map(|r| map_columns_with(r, &map_opts))
        .collect();
    build_insert_for_maps(table, &maps, columns, &column_casts(records), opts)
}

/// Like [`build_batch_insert_query`], for records that are already mapped.
///
/// `casts` types the placeholders whose value has no type of its own. It is
/// only read in foreign key mode.
pub fn build_insert_for_maps(
    table: &TableName,
    maps: &[ColumnMap],
    columns: &[ColumnName],
    casts: &ColumnCasts,
    opts: &InsertOptions,
) -> Result<Option<BuiltInsert>> {
    if columns.is_empty() {
        return Err(Error::EmptyColumns);
    }
    opts.validate()?;
    if maps.is_empty() {
        return Ok(None);
    }

    // Inside VALUES there is no target column to infer types from, so the
    // foreign key form casts every placeholder.
    let typed = opts.filters_foreign_keys();

    let mut args = Vec::with_capacity(maps.len() * columns.len());
    let mut rows = Vec::with_capacity(maps.len());
    for map in maps {
        let mut row = Vec::with_capacity(columns.len());
        for column in columns {
            let value = map.get(column).cloned().unwrap_or(Value::Null);
            let cast = if typed {
                value.cast().or_else(|| casts.get(column).copied())
            } else {
                None
            };
            row.push(Expr::cast_param(cast));
            args.push(value);
        }
        rows.push(row);
    }

    let mut stmt = InsertStmt::new(table.clone()).columns(columns.iter().cloned());
    stmt = if typed {
        stmt.select(filtered_values(rows, columns, opts))
    } else {
        stmt.rows(rows)
    };
    if let Some(clause) = &opts.on_conflict {
        stmt = stmt.on_conflict(clause.clone());
    }
    if opts.return_ids {
        stmt = stmt.returning([opts.id_column.clone()]);
    }

    Ok(Some(BuiltInsert {
        sql: render(&stmt).sql,
        args,
    }))
}

/// `SELECT * FROM (VALUES ...) AS vs (...) WHERE EXISTS (...) AND ...`
///
/// Only foreign keys whose column is being inserted get a check.
fn filtered_values(
    rows: Vec<Vec<Expr>>,
    columns: &[ColumnName],
    opts: &InsertOptions,
) -> SelectStmt {
    let checks = opts
        .foreign_keys
        .iter()
        .filter(|(column, _)| columns.contains(column))
        .map(|(column, fk)| {
            Expr::exists(
                SelectStmt::new()
                    .column(Expr::int(1))
                    .from(FromClause::aliased(fk.table.clone(), REFERENCE_ALIAS.into()))
                    .where_(
                        Expr::qualified_column(REFERENCE_ALIAS.into(), fk.column.clone())
                            .eq(Expr::qualified_column(VALUES_ALIAS.into(), column.clone())),
                    ),
            )
        });

    let select = SelectStmt::new().from(FromClause::values(
        rows,
        VALUES_ALIAS.into(),
        columns.to_vec(),
    ));
    match Expr::all(checks) {
        Some(condition) => select.where_(condition),
        None => select,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pgbatch_sql::{ConflictAction, OnConflict, PgType, UpdateAssignment};

    struct Comment {
        user_id: i32,
        body: String,
        created_at: Option<chrono::NaiveDateTime>,
    }

    crate::record!(Comment {
        user_id => "user_id",
        body => "body",
        created_at => "created_at",
    });

    fn cols(names: &[&str]) -> Vec<ColumnName> {
        names.iter().map(|n| ColumnName::from(*n)).collect()
    }

    fn comment(user_id: i32, body: &str) -> Comment {
        Comment {
            user_id,
            body: body.into(),
            created_at: None,
        }
    }

    #[test]
    fn test_two_records_two_columns() {
        let records = [comment(1, "a"), comment(2, "b")];
        let built = build_batch_insert_query(
            &"comment".into(),
            &records,
            &cols(&["user_id", "body"]),
            &InsertOptions::new(),
        )
        .unwrap()
        .unwrap();

        insta::assert_snapshot!(built.sql, @r#"
        INSERT INTO "comment" ("user_id", "body")
        VALUES ($1, $2), ($3, $4)
        RETURNING "id"
        "#);
        assert_eq!(
            built.args,
            vec![
                Value::I32(1),
                Value::String("a".into()),
                Value::I32(2),
                Value::String("b".into()),
            ]
        );
    }

    #[test]
    fn test_missing_column_binds_null() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let mut first = comment(1, "a");
        first.created_at = Some(at);
        let records = [first, comment(2, "b")];

        let built = build_batch_insert_query(
            &"comment".into(),
            &records,
            &cols(&["user_id", "body", "created_at"]),
            &InsertOptions::new().no_ids(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            built.sql,
            "INSERT INTO \"comment\" (\"user_id\", \"body\", \"created_at\")\nVALUES ($1, $2, $3), ($4, $5, $6)"
        );
        assert_eq!(built.args[2], Value::Timestamp(at));
        assert_eq!(built.args[5], Value::Null);
    }

    #[test]
    fn test_no_records_is_none() {
        let built = build_batch_insert_query::<Comment>(
            &"comment".into(),
            &[],
            &cols(&["body"]),
            &InsertOptions::new(),
        )
        .unwrap();
        assert_eq!(built, None);
    }

    #[test]
    fn test_no_columns_is_an_error() {
        let err = build_batch_insert_query(
            &"comment".into(),
            &[comment(1, "a")],
            &[],
            &InsertOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyColumns));
        assert_eq!(err.to_string(), "empty inserting fields");
    }

    #[test]
    fn test_on_conflict_precedes_returning() {
        let opts = InsertOptions::new().on_conflict(OnConflict::target(
            cols(&["user_id"]),
            ConflictAction::DoNothing,
        ));
        let built = build_batch_insert_query(
            &"comment".into(),
            &[comment(1, "a")],
            &cols(&["user_id", "body"]),
            &opts,
        )
        .unwrap()
        .unwrap();

        insta::assert_snapshot!(built.sql, @r#"
        INSERT INTO "comment" ("user_id", "body")
        VALUES ($1, $2)
        ON CONFLICT ("user_id") DO NOTHING
        RETURNING "id"
        "#);
    }

    #[test]
    fn test_foreign_key_filter() {
        let opts = InsertOptions::new()
            .foreign_key("user_id", "users", "id")
            .foreign_key("post_id", "post", "id");
        let built = build_batch_insert_query(
            &"comment".into(),
            &[comment(1, "a"), comment(2, "b")],
            &cols(&["user_id", "body"]),
            &opts,
        )
        .unwrap()
        .unwrap();

        // `post_id` is not inserted, so it gets no check.
        insta::assert_snapshot!(built.sql, @r#"
        INSERT INTO "comment" ("user_id", "body")
        SELECT * FROM (VALUES ($1::integer, $2::text), ($3::integer, $4::text)) AS "vs" ("user_id", "body") WHERE EXISTS (SELECT 1 FROM "users" AS "ref" WHERE "ref"."id" = "vs"."user_id")
        RETURNING "id"
        "#);
        assert_eq!(built.args.len(), 4);
    }

    #[test]
    fn test_foreign_key_casts_by_value_type() {
        let mut maps = vec![ColumnMap::new(), ColumnMap::new()];
        maps[0].insert("a".into(), Value::I64(1));
        maps[0].insert("b".into(), Value::Timestamp(chrono::NaiveDateTime::default()));
        maps[0].insert("c".into(), Value::Bool(true));
        maps[1].insert("a".into(), Value::I64(2));

        let opts = InsertOptions::new().foreign_key("a", "t", "id").no_ids();
        let columns = collect_columns(&maps);
        let mut casts = ColumnCasts::new();
        casts.insert("b".into(), PgType::Timestamp.into());
        let built = build_insert_for_maps(&"x".into(), &maps, &columns, &casts, &opts)
            .unwrap()
            .unwrap();

        // Row two has no `b` or `c`: `b` falls back to the column type,
        // `c` has none to fall back to.
        assert_eq!(
            built.sql,
            "INSERT INTO \"x\" (\"a\", \"b\", \"c\")\n\
             SELECT * FROM (VALUES ($1::bigint, $2::timestamp without time zone, $3::boolean), \
             ($4::bigint, $5::timestamp without time zone, $6)) \
             AS \"vs\" (\"a\", \"b\", \"c\") \
             WHERE EXISTS (SELECT 1 FROM \"t\" AS \"ref\" WHERE \"ref\".\"id\" = \"vs\".\"a\")"
        );
    }

    struct Attachment {
        comment_id: i64,
        public: bool,
        ratio: f64,
        data: Vec<u8>,
        labels: Vec<String>,
        note: Option<String>,
    }

    crate::record!(Attachment {
        comment_id => "comment_id",
        public => "public",
        ratio => "ratio",
        data => "data",
        labels => "labels",
        note => "note",
    });

    #[test]
    fn test_foreign_key_casts_every_column_type() {
        let records = [
            Attachment {
                comment_id: 1,
                public: true,
                ratio: 0.5,
                data: vec![1, 2],
                labels: vec!["a".into()],
                note: Some("n".into()),
            },
            Attachment {
                comment_id: 2,
                public: false,
                ratio: 0.0,
                data: Vec::new(),
                labels: Vec::new(),
                note: None,
            },
        ];
        let opts = InsertOptions::new()
            .foreign_key("comment_id", "comment", "id")
            .keep_empty(["public", "labels", "note"])
            .no_ids();
        let columns = cols(&["comment_id", "public", "ratio", "data", "labels", "note"]);
        let built = build_batch_insert_query(&"attachment".into(), &records, &columns, &opts)
            .unwrap()
            .unwrap();

        insta::assert_snapshot!(built.sql, @r#"
        INSERT INTO "attachment" ("comment_id", "public", "ratio", "data", "labels", "note")
        SELECT * FROM (VALUES ($1::bigint, $2::boolean, $3::double precision, $4::bytea, $5::text[], $6::text), ($7::bigint, $8::boolean, $9::double precision, $10::bytea, $11::text[], $12::text)) AS "vs" ("comment_id", "public", "ratio", "data", "labels", "note") WHERE EXISTS (SELECT 1 FROM "comment" AS "ref" WHERE "ref"."id" = "vs"."comment_id")
        "#);
        // `ratio` and `data` were left out of row two; `labels` and `note` were kept empty.
        assert_eq!(built.args[8], Value::Null);
        assert_eq!(built.args[9], Value::Null);
        assert_eq!(built.args[10], Value::Array(Vec::new()));
        assert_eq!(built.args[11], Value::Null);
    }

    #[test]
    fn test_simple_mode_never_casts() {
        let records = [Attachment {
            comment_id: 1,
            public: true,
            ratio: 1.0,
            data: vec![1],
            labels: vec!["a".into()],
            note: None,
        }];
        let built = build_batch_insert_query(
            &"attachment".into(),
            &records,
            &cols(&["comment_id", "public", "note"]),
            &InsertOptions::new().keep_empty(["note"]).no_ids(),
        )
        .unwrap()
        .unwrap();
        assert!(!built.sql.contains("::"));
    }

    #[test]
    fn test_conflict_clause_with_placeholder_is_rejected() {
        let opts = InsertOptions::new().on_conflict(OnConflict::target(
            cols(&["user_id"]),
            ConflictAction::DoUpdate(vec![UpdateAssignment::new("body".into(), Expr::param())]),
        ));
        let err = build_batch_insert_query(
            &"comment".into(),
            &[comment(1, "a")],
            &cols(&["user_id", "body"]),
            &opts,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ConflictParams));
    }

    #[test]
    fn test_collect_columns_first_seen_order() {
        let mut a = ColumnMap::new();
        a.insert("x".into(), Value::I32(1));
        a.insert("y".into(), Value::I32(1));
        let mut b = ColumnMap::new();
        b.insert("z".into(), Value::I32(1));
        b.insert("x".into(), Value::I32(1));

        assert_eq!(collect_columns([&a, &b]), cols(&["x", "y", "z"]));
    }
}
