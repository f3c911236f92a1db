//! Queued statements executed together in one transaction.

use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::query::{Value, sql_params};
use crate::traced::Connection;
use crate::{Error, Result};

/// What to read back from a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fetch {
    /// Only the affected row count.
    #[default]
    None,
    /// Exactly one row.
    One,
    /// Every returned row.
    All,
}

/// One parameterized statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
    pub fetch: Fetch,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
            fetch: Fetch::None,
        }
    }

    /// Bind the next `$n` argument.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn fetch_one(mut self) -> Self {
        self.fetch = Fetch::One;
        self
    }

    pub fn fetch_all(mut self) -> Self {
        self.fetch = Fetch::All;
        self
    }
}

/// Result of one statement, matching its [`Fetch`].
#[derive(Debug)]
pub enum Outcome {
    Affected(u64),
    Row(Row),
    Rows(Vec<Row>),
}

/// A queue of statements.
///
/// ```ignore
/// let mut batch = StatementBatch::new();
/// let debit = "UPDATE account SET balance = balance - $1 WHERE id = $2";
/// let credit = "UPDATE account SET balance = balance + $1 WHERE id = $2";
/// batch
///     .add(Statement::new(debit).bind(10).bind(1))
///     .add(Statement::new(credit).bind(10).bind(2));
/// batch.run(&mut client).await?;
/// ```
#[derive(Debug, Default)]
pub struct StatementBatch {
    statements: Vec<Statement>,
}

impl StatementBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, statement: Statement) -> &mut Self {
        self.statements.push(statement);
        self
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Run every queued statement, in order, on `conn`, and empty the queue.
    ///
    /// Stops at the first failure and leaves the queue as it was, so it can
    /// be run again once the transaction is rolled back. The caller owns
    /// the transaction.
    pub async fn run_in<C>(&mut self, conn: &C) -> Result<Vec<Outcome>>
    where
        C: Connection + ?Sized,
    {
        let mut outcomes = Vec::with_capacity(self.statements.len());

        for statement in &self.statements {
            let sql_params = sql_params(&statement.args);
            let refs: Vec<&(dyn ToSql + Sync)> = sql_params
                .iter()
                .map(|p| p as &(dyn ToSql + Sync))
                .collect();

            let outcome = match statement.fetch {
                Fetch::None => Outcome::Affected(conn.execute(&statement.sql, &refs).await?),
                Fetch::One => {
                    let mut rows = conn.query(&statement.sql, &refs).await?;
                    if rows.len() != 1 {
                        return Err(Error::UnexpectedRowCount {
                            expected: 1,
                            actual: rows.len(),
                        });
                    }
                    Outcome::Row(rows.remove(0))
                }
                Fetch::All => Outcome::Rows(conn.query(&statement.sql, &refs).await?),
            };
            outcomes.push(outcome);
        }

        self.statements.clear();
        Ok(outcomes)
    }

    /// Run the queue in its own transaction: all statements commit, or none do.
    pub async fn run(&mut self, client: &mut tokio_postgres::Client) -> Result<Vec<Outcome>> {
        let tx = client.transaction().await?;
        match self.run_in(&tx).await {
            Ok(outcomes) => {
                tx.commit().await?;
                Ok(outcomes)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(
                        error = %rollback,
                        "rollback after failed statement also failed"
                    );
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::traced::BoxFuture;

    #[derive(Default)]
    struct Log {
        sent: Mutex<Vec<(String, usize)>>,
    }

    impl Connection for Log {
        fn execute<'a>(
            &'a self,
            sql: &'a str,
            params: &'a [&'a (dyn ToSql + Sync)],
        ) -> BoxFuture<'a, Result<u64>> {
            Box::pin(async move {
                if sql.starts_with("FAIL") {
                    return Err(Error::Driver("syntax error".into()));
                }
                self.sent.lock().unwrap().push((sql.to_string(), params.len()));
                Ok(1)
            })
        }

        fn query<'a>(
            &'a self,
            sql: &'a str,
            params: &'a [&'a (dyn ToSql + Sync)],
        ) -> BoxFuture<'a, Result<Vec<Row>>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push((sql.to_string(), params.len()));
                Ok(Vec::new())
            })
        }
    }

    #[tokio::test]
    async fn test_runs_in_order_and_clears_queue() {
        let conn = Log::default();
        let mut batch = StatementBatch::new();
        batch
            .add(Statement::new("UPDATE a SET x = $1").bind(1))
            .add(Statement::new("UPDATE b SET y = $1 WHERE z = $2").bind("v").bind(2i64))
            .add(Statement::new("SELECT 1").fetch_all());

        let outcomes = batch.run_in(&conn).await.unwrap();
        assert!(batch.is_empty());
        assert_eq!(outcomes.len(), 3);
        assert!(matches!(outcomes[0], Outcome::Affected(1)));
        assert!(matches!(&outcomes[2], Outcome::Rows(rows) if rows.is_empty()));

        let sent = conn.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![
                ("UPDATE a SET x = $1".to_string(), 1),
                ("UPDATE b SET y = $1 WHERE z = $2".to_string(), 2),
                ("SELECT 1".to_string(), 0),
            ]
        );
    }

    #[tokio::test]
    async fn test_stops_at_first_failure() {
        let conn = Log::default();
        let mut batch = StatementBatch::new();
        batch
            .add(Statement::new("UPDATE a SET x = 1"))
            .add(Statement::new("FAIL"))
            .add(Statement::new("UPDATE c SET x = 1"));

        let err = batch.run_in(&conn).await.unwrap_err();
        assert!(matches!(err, Error::Driver(_)));
        assert_eq!(conn.sent.lock().unwrap().len(), 1);
        assert_eq!(batch.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_one_needs_a_row() {
        let conn = Log::default();
        let mut batch = StatementBatch::new();
        batch.add(Statement::new("SELECT id FROM users WHERE id = $1").bind(9).fetch_one());

        let err = batch.run_in(&conn).await.unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedRowCount {
                expected: 1,
                actual: 0
            }
        ));
    }
}
