//! Progress reporting and cancellation for batched inserts.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use pgbatch_sql::ColumnName;

/// Known once the batch plan has been computed, before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertInfo {
    pub table: String,
    pub columns: Vec<ColumnName>,
    pub record_count: usize,
    pub batch_size: usize,
    pub batch_count: usize,
}

/// Receives progress from a batched insert.
///
/// Both methods run on the inserting task, between statements.
pub trait BatchObserver: Send + Sync {
    /// Called once, after planning and before the first batch.
    fn before_insert(&self, info: &InsertInfo) {
        let _ = info;
    }

    /// Called after each batch succeeds. `ids` is empty when ids are not returned.
    fn batch_inserted(&self, index: usize, ids: &[i64]) {
        let _ = (index, ids);
    }
}

/// Shared stop flag for a running insert.
///
/// The flag is checked before each batch. Once set, no further batch is
/// started; batches already executed stay in the transaction and are
/// committed.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress event, for observers that forward over a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertEvent {
    Started(InsertInfo),
    BatchInserted { index: usize, rows: usize },
}

impl BatchObserver for tokio::sync::mpsc::UnboundedSender<InsertEvent> {
    fn before_insert(&self, info: &InsertInfo) {
        // A dropped receiver only means nobody is listening.
        let _ = self.send(InsertEvent::Started(info.clone()));
    }

    fn batch_inserted(&self, index: usize, ids: &[i64]) {
        let _ = self.send(InsertEvent::BatchInserted {
            index,
            rows: ids.len(),
        });
    }
}

/// Logs progress through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver {
    batch_count: AtomicUsize,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BatchObserver for TracingObserver {
    fn before_insert(&self, info: &InsertInfo) {
        self.batch_count.store(info.batch_count, Ordering::Relaxed);
        tracing::info!(
            table = %info.table,
            records = info.record_count,
            columns = info.columns.len(),
            batch_size = info.batch_size,
            batch_count = info.batch_count,
            "inserting records in batches"
        );
    }

    fn batch_inserted(&self, index: usize, ids: &[i64]) {
        let count = self.batch_count.load(Ordering::Relaxed);
        tracing::debug!(rows = ids.len(), "inserted batch {}/{}", index + 1, count);
    }
}
