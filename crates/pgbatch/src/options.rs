//! Options for batched inserts.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use pgbatch_sql::{ColumnName, OnConflict, TableName};

use crate::mapper::MapOptions;
use crate::observer::{AbortHandle, BatchObserver};
use crate::plan::PLACEHOLDER_LIMIT;
use crate::{Error, Result};

/// The row a foreign key column must point at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: TableName,
    pub column: ColumnName,
}

/// How a batched insert behaves.
///
/// ```
/// use pgbatch::{InsertOptions, OnConflict};
///
/// let opts = InsertOptions::new()
///     .on_conflict(OnConflict::do_nothing())
///     .keep_empty(["score"])
///     .foreign_key("user_id", "users", "id");
/// assert!(opts.return_ids);
/// ```
#[derive(Clone)]
pub struct InsertOptions {
    pub on_conflict: Option<OnConflict>,

    /// Append `RETURNING <id_column>` and collect generated ids.
    pub return_ids: bool,
    pub id_column: ColumnName,

    /// Columns inserted even when the record holds an empty value.
    pub keep_empty: Vec<ColumnName>,

    /// Rows whose value for one of these columns has no match in the
    /// referenced table are silently skipped.
    pub foreign_keys: IndexMap<ColumnName, ForeignKey>,

    /// Maximum bind parameters per statement. `None` means the pool's
    /// configured limit, or [`PLACEHOLDER_LIMIT`] outside a pool.
    pub placeholder_limit: Option<usize>,

    pub observer: Option<Arc<dyn BatchObserver>>,
    pub abort: Option<AbortHandle>,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            on_conflict: None,
            return_ids: true,
            id_column: "id".into(),
            keep_empty: Vec::new(),
            foreign_keys: IndexMap::new(),
            placeholder_limit: None,
            observer: None,
            abort: None,
        }
    }
}

impl fmt::Debug for InsertOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InsertOptions")
            .field("on_conflict", &self.on_conflict)
            .field("return_ids", &self.return_ids)
            .field("id_column", &self.id_column)
            .field("keep_empty", &self.keep_empty)
            .field("foreign_keys", &self.foreign_keys)
            .field("placeholder_limit", &self.placeholder_limit)
            .field("observer", &self.observer.is_some())
            .field("abort", &self.abort)
            .finish()
    }
}

impl InsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_conflict(mut self, clause: OnConflict) -> Self {
        self.on_conflict = Some(clause);
        self
    }

    /// Do not append `RETURNING`; the insert returns no ids.
    pub fn no_ids(mut self) -> Self {
        self.return_ids = false;
        self
    }

    pub fn id_column(mut self, column: impl Into<ColumnName>) -> Self {
        self.id_column = column.into();
        self
    }

    pub fn keep_empty<C: Into<ColumnName>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.keep_empty.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Only insert rows whose `column` matches `references_table.references_column`.
    pub fn foreign_key(
        mut self,
        column: impl Into<ColumnName>,
        references_table: impl Into<TableName>,
        references_column: impl Into<ColumnName>,
    ) -> Self {
        self.foreign_keys.insert(
            column.into(),
            ForeignKey {
                table: references_table.into(),
                column: references_column.into(),
            },
        );
        self
    }

    pub fn placeholder_limit(mut self, limit: usize) -> Self {
        self.placeholder_limit = Some(limit);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn abort_handle(mut self, handle: AbortHandle) -> Self {
        self.abort = Some(handle);
        self
    }

    pub(crate) fn limit(&self) -> usize {
        self.placeholder_limit.unwrap_or(PLACEHOLDER_LIMIT)
    }

    /// Reject options that could never produce a bindable statement.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.on_conflict.as_ref().is_some_and(OnConflict::has_param) {
            return Err(Error::ConflictParams);
        }
        Ok(())
    }

    pub(crate) fn map_options(&self) -> MapOptions {
        MapOptions::for_insert(self.keep_empty.clone())
    }

    pub(crate) fn filters_foreign_keys(&self) -> bool {
        !self.foreign_keys.is_empty()
    }
}
