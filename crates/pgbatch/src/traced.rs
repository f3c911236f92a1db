//! Traced database connections.
//!
//! Every statement sent through a [`Connection`] runs inside a `tracing`
//! span carrying its SQL and parameter count.

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;

use pgbatch_sql::TableName;
use tokio_postgres::types::ToSql;
use tokio_postgres::{GenericClient, Row};
use tracing::Instrument;

use crate::config::Config;
use crate::insert;
use crate::options::InsertOptions;
use crate::query::scan_id;
use crate::record::Record;
use crate::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something statements can be sent to.
///
/// Implemented for `tokio_postgres::Client`, `tokio_postgres::Transaction`
/// and `deadpool_postgres::Object`. Batched inserts only need a shared
/// reference, so they run the same way on a bare client and inside a
/// transaction.
pub trait Connection: Send + Sync {
    /// Execute a statement, returning the number of rows affected.
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [&'a (dyn ToSql + Sync)],
    ) -> BoxFuture<'a, Result<u64>>;

    /// Execute a query, returning all rows.
    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [&'a (dyn ToSql + Sync)],
    ) -> BoxFuture<'a, Result<Vec<Row>>>;

    /// Execute a query and read an integer id from the first column of each row.
    fn query_ids<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [&'a (dyn ToSql + Sync)],
    ) -> BoxFuture<'a, Result<Vec<i64>>> {
        Box::pin(async move {
            let rows = self.query(sql, params).await?;
            rows.iter().map(scan_id).collect()
        })
    }
}

async fn traced_execute<C>(client: &C, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64>
where
    C: GenericClient + Sync,
{
    let span = tracing::debug_span!(
        "db.execute",
        sql = %sql,
        params = params.len(),
        affected = tracing::field::Empty,
    );
    let affected = client.execute(sql, params).instrument(span.clone()).await?;
    span.record("affected", affected);
    Ok(affected)
}

async fn traced_query<C>(client: &C, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>>
where
    C: GenericClient + Sync,
{
    let span = tracing::debug_span!(
        "db.query",
        sql = %sql,
        params = params.len(),
        rows = tracing::field::Empty,
    );
    let rows = client.query(sql, params).instrument(span.clone()).await?;
    span.record("rows", rows.len());
    Ok(rows)
}

impl Connection for tokio_postgres::Client {
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [&'a (dyn ToSql + Sync)],
    ) -> BoxFuture<'a, Result<u64>> {
        Box::pin(traced_execute(self, sql, params))
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [&'a (dyn ToSql + Sync)],
    ) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(traced_query(self, sql, params))
    }
}

impl Connection for tokio_postgres::Transaction<'_> {
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [&'a (dyn ToSql + Sync)],
    ) -> BoxFuture<'a, Result<u64>> {
        Box::pin(traced_execute(self, sql, params))
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [&'a (dyn ToSql + Sync)],
    ) -> BoxFuture<'a, Result<Vec<Row>>> {
        Box::pin(traced_query(self, sql, params))
    }
}

impl Connection for deadpool_postgres::Object {
    fn execute<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [&'a (dyn ToSql + Sync)],
    ) -> BoxFuture<'a, Result<u64>> {
        // Deref to the underlying Client to avoid recursion
        let client: &tokio_postgres::Client = self;
        Box::pin(traced_execute(client, sql, params))
    }

    fn query<'a>(
        &'a self,
        sql: &'a str,
        params: &'a [&'a (dyn ToSql + Sync)],
    ) -> BoxFuture<'a, Result<Vec<Row>>> {
        let client: &tokio_postgres::Client = self;
        Box::pin(traced_query(client, sql, params))
    }
}

/// A connection pool with batched-insert helpers.
///
/// ```ignore
/// let db = Database::from_config(&Config::from_env()?)?;
/// let ids = db.batch_insert("users", &users).await?;
/// ```
#[derive(Clone)]
pub struct Database {
    pool: deadpool_postgres::Pool,
    placeholder_limit: usize,
}

impl Database {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self {
            pool,
            placeholder_limit: crate::PLACEHOLDER_LIMIT,
        }
    }

    /// Build a pool from validated configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            pool: config.create_pool()?,
            placeholder_limit: config.placeholder_limit,
        })
    }

    /// Get a pooled connection.
    pub async fn get(&self) -> Result<deadpool_postgres::Object> {
        Ok(self.pool.get().await?)
    }

    /// Get the inner pool (for cases where you need the raw pool).
    pub fn pool(&self) -> &deadpool_postgres::Pool {
        &self.pool
    }

    /// Insert `records` into `table` in one transaction, returning generated ids.
    pub async fn batch_insert<R: Record + Sync>(
        &self,
        table: impl Into<TableName>,
        records: &[R],
    ) -> Result<Vec<i64>> {
        self.batch_insert_with_options(table, records, &InsertOptions::new())
            .await
    }

    /// Like [`Database::batch_insert`]. Options without a placeholder limit
    /// use the configured one.
    pub async fn batch_insert_with_options<R: Record + Sync>(
        &self,
        table: impl Into<TableName>,
        records: &[R],
        opts: &InsertOptions,
    ) -> Result<Vec<i64>> {
        let table = table.into();
        let mut conn = self.get().await?;
        let tx = conn.transaction().await?;

        let opts = with_default_limit(opts, self.placeholder_limit);

        match insert::insert_in_transaction(&*tx, &table, records, &opts).await {
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
}

fn with_default_limit(opts: &InsertOptions, limit: usize) -> Cow<'_, InsertOptions> {
    match opts.placeholder_limit {
        Some(_) => Cow::Borrowed(opts),
        None => Cow::Owned(opts.clone().placeholder_limit(limit)),
    }
}
