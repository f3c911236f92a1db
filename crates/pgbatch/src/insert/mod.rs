//! Batched inserts.
//!
//! Records are mapped to columns once, split into batches that stay under
//! the placeholder limit, and sent one statement per batch. All batches run
//! in a single transaction: if one fails, none of them are kept.
//!
//! ```ignore
//! use pgbatch::{batch_insert_with_options, InsertOptions, OnConflict};
//!
//! let ids = batch_insert_with_options(
//!     &mut client,
//!     "comment",
//!     &comments,
//!     &InsertOptions::new()
//!         .on_conflict(OnConflict::do_nothing())
//!         .foreign_key("user_id", "users", "id"),
//! )
//! .await?;
//! ```

use pgbatch_sql::TableName;
use tokio_postgres::types::ToSql;
use tracing::Instrument;

use crate::mapper::{ColumnCasts, ColumnMap, column_casts, map_columns_with};
use crate::observer::InsertInfo;
use crate::options::InsertOptions;
use crate::plan::BatchPlan;
use crate::query::{build_insert_for_maps, collect_columns};
use crate::record::Record;
use crate::traced::Connection;
use crate::{Error, Result};

/// Insert `records` with default options, returning generated ids.
pub async fn batch_insert<R: Record + Sync>(
    client: &mut tokio_postgres::Client,
    table: impl Into<TableName>,
    records: &[R],
) -> Result<Vec<i64>> {
    batch_insert_with_options(client, table, records, &InsertOptions::new()).await
}

/// Open a transaction, insert every batch, then commit.
///
/// Any failure rolls back all batches. An abort requested through
/// [`InsertOptions::abort`] stops before the next batch and commits the
/// batches already inserted.
pub async fn batch_insert_with_options<R: Record + Sync>(
    client: &mut tokio_postgres::Client,
    table: impl Into<TableName>,
    records: &[R],
    opts: &InsertOptions,
) -> Result<Vec<i64>> {
    let table = table.into();
    let tx = client.transaction().await?;

    match insert_in_transaction(&tx, &table, records, opts).await {
        Ok(ids) => {
            tx.commit().await?;
            Ok(ids)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::warn!(error = %rollback, "rollback after failed insert also failed");
            }
            Err(err)
        }
    }
}

/// Insert `records` on a connection the caller already holds a transaction on.
///
/// Committing or rolling back is left to the caller.
pub async fn insert_in_transaction<C, R>(
    conn: &C,
    table: &TableName,
    records: &[R],
    opts: &InsertOptions,
) -> Result<Vec<i64>>
where
    C: Connection + ?Sized,
    R: Record + Sync,
{
    let span = tracing::info_span!(
        "pgbatch.insert",
        table = %table,
        records = records.len(),
        batches = tracing::field::Empty,
    );
    async {
        opts.validate()?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let map_opts = opts.map_options();
        let maps: Vec<ColumnMap> = records
            .iter()
            .map(|r| map_columns_with(r, &map_opts))
            .collect();
        let columns = collect_columns(&maps);
        if columns.is_empty() {
            return Err(Error::MissingColumns {
                table: table.to_string(),
            });
        }

        let casts = if opts.filters_foreign_keys() {
            column_casts(records)
        } else {
            ColumnCasts::new()
        };

        let plan = BatchPlan::new(maps.len(), columns.len(), opts.limit())?;
        tracing::Span::current().record("batches", plan.batch_count);

        if let Some(observer) = &opts.observer {
            observer.before_insert(&InsertInfo {
                table: table.to_string(),
                columns: columns.clone(),
                record_count: plan.record_count,
                batch_size: plan.batch_size,
                batch_count: plan.batch_count,
            });
        }

        let mut ids = Vec::new();
        for (index, batch) in plan.batches(&maps, opts.abort.as_ref()) {
            let batch_ids = insert_batch(conn, table, batch, &columns, &casts, opts)
                .await
                .map_err(|source| Error::Batch {
                    index,
                    count: plan.batch_count,
                    source: Box::new(source),
                })?;

            if let Some(observer) = &opts.observer {
                observer.batch_inserted(index, &batch_ids);
            }
            ids.extend(batch_ids);
        }

        Ok(ids)
    }
    .instrument(span)
    .await
}

async fn insert_batch<C>(
    conn: &C,
    table: &TableName,
    maps: &[ColumnMap],
    columns: &[pgbatch_sql::ColumnName],
    casts: &ColumnCasts,
    opts: &InsertOptions,
) -> Result<Vec<i64>>
where
    C: Connection + ?Sized,
{
    let Some(built) = build_insert_for_maps(table, maps, columns, casts, opts)? else {
        return Ok(Vec::new());
    };
    let sql_params = built.params();
    let refs: Vec<&(dyn ToSql + Sync)> = sql_params
        .iter()
        .map(|p| p as &(dyn ToSql + Sync))
        .collect();

    if opts.return_ids {
        conn.query_ids(&built.sql, &refs).await
    } else {
        conn.execute(&built.sql, &refs).await?;
        Ok(Vec::new())
    }
}
