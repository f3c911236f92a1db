use thiserror::Error;
use tokio_postgres::error::SqlState;

#[derive(Debug, Error)]
pub enum Error {
    /// No record contributed a single column.
    #[error("missing columns: no record for table {table} has a column to insert")]
    MissingColumns { table: String },

    /// The insert query was asked to render zero columns.
    #[error("empty inserting fields")]
    EmptyColumns,

    /// Batch size would be zero (no columns, or more columns than placeholders).
    #[error("cannot split {columns} columns into batches under a limit of {ceiling} placeholders")]
    InvalidBatchSize { columns: usize, ceiling: usize },

    /// `ON CONFLICT DO UPDATE` values must come from the row (`excluded.col`),
    /// not from extra bind parameters.
    #[error("ON CONFLICT clause cannot contain placeholders")]
    ConflictParams,

    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("failed to build pool: {0}")]
    BuildPool(#[from] deadpool_postgres::BuildError),

    /// A batch failed to execute; the surrounding transaction is rolled back.
    #[error("batch {}/{count} failed: {source}", .index + 1)]
    Batch {
        index: usize,
        count: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("identifier column has type {ty}, expected an integer type")]
    UnexpectedIdType { ty: String },

    #[error("expected {expected} row(s), got {actual}")]
    UnexpectedRowCount { expected: usize, actual: usize },

    /// Failure raised by a `Connection` implementation that is not tokio-postgres.
    #[error("driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// The underlying Postgres error, looking through batch context.
    pub fn as_postgres(&self) -> Option<&tokio_postgres::Error> {
        match self {
            Error::Postgres(e) => Some(e),
            Error::Batch { source, .. } => source.as_postgres(),
            _ => None,
        }
    }

    /// Whether this is a unique violation on the named constraint.
    pub fn is_unique_violation(&self, constraint: &str) -> bool {
        self.as_postgres()
            .and_then(|e| e.as_db_error())
            .is_some_and(|db| {
                *db.code() == SqlState::UNIQUE_VIOLATION && db.constraint() == Some(constraint)
            })
    }

    /// Whether this error was raised before any statement reached the database.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::MissingColumns { .. }
                | Error::EmptyColumns
                | Error::InvalidBatchSize { .. }
                | Error::ConflictParams
        )
    }
}
