//! Batched inserts for Postgres.
//!
//! This crate provides:
//! - Record descriptors (`record!`) that map struct fields to columns
//! - Batch planning under the 65535 bind parameter limit
//! - One transaction per insert, with progress callbacks and cancellation
//! - Optional foreign key filtering that skips rows pointing at missing parents
//!
//! # Example
//!
//! ```ignore
//! use pgbatch::{record, InsertOptions};
//!
//! struct Comment {
//!     user_id: i32,
//!     body: String,
//! }
//!
//! record!(Comment {
//!     user_id => "user_id",
//!     body => "body",
//! });
//!
//! let ids = pgbatch::batch_insert_with_options(
//!     &mut client,
//!     "comment",
//!     &comments,
//!     &InsertOptions::new().foreign_key("user_id", "users", "id"),
//! )
//! .await?;
//! ```
//!
//! Empty values (`0`, `""`, `false`, `None`, `[]`) are left out of the
//! insert so column defaults apply; list them in `keep_empty` to insert
//! them anyway.

mod config;
mod error;
mod exec;
mod insert;
mod mapper;
mod observer;
mod options;
mod plan;
mod prepare;
pub mod query;
mod record;
mod traced;

pub use config::{Config, DEFAULT_POOL_SIZE};
pub use error::Error;
pub use exec::{Fetch, Outcome, Statement, StatementBatch};
pub use insert::{batch_insert, batch_insert_with_options, insert_in_transaction};
pub use mapper::{ColumnCasts, ColumnMap, MapOptions, column_casts, map_columns, map_columns_with};
pub use observer::{AbortHandle, BatchObserver, InsertEvent, InsertInfo, TracingObserver};
pub use options::{ForeignKey, InsertOptions};
pub use plan::{BatchPlan, Batches, PLACEHOLDER_LIMIT};
pub use prepare::InsertionBuilder;
pub use query::{BuiltInsert, Value, build_batch_insert_query};
pub use record::{ColumnValue, FieldDescriptor, FieldValue, Record};
pub use traced::{BoxFuture, Connection, Database};

pub use pgbatch_sql::{
    ColumnName, ConflictAction, Expr, OnConflict, PgCast, PgType, TableName, UpdateAssignment,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;
