//! Split rows into batches that fit under the placeholder limit.

use std::ops::Range;

use crate::observer::AbortHandle;
use crate::{Error, Result};

/// Maximum number of bind parameters Postgres accepts in one statement.
pub const PLACEHOLDER_LIMIT: usize = 65535;

/// How `record_count` rows of `column_count` values are cut into statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub record_count: usize,
    pub column_count: usize,
    /// Rows per batch; the last batch may be shorter.
    pub batch_size: usize,
    pub batch_count: usize,
}

impl BatchPlan {
    /// Plan batches so that `batch_size * column_count <= ceiling`.
    pub fn new(record_count: usize, column_count: usize, ceiling: usize) -> Result<Self> {
        let batch_size = ceiling.checked_div(column_count).unwrap_or(0);
        if batch_size == 0 {
            return Err(Error::InvalidBatchSize {
                columns: column_count,
                ceiling,
            });
        }

        Ok(Self {
            record_count,
            column_count,
            batch_size,
            batch_count: record_count.div_ceil(batch_size),
        })
    }

    /// Row range covered by batch `index`.
    pub fn range(&self, index: usize) -> Range<usize> {
        let start = (index * self.batch_size).min(self.record_count);
        let end = (start + self.batch_size).min(self.record_count);
        start..end
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.batch_count).map(|i| self.range(i))
    }

    /// Iterate over the batches of `rows`, stopping early once `abort` is set.
    pub fn batches<'a, T>(&self, rows: &'a [T], abort: Option<&'a AbortHandle>) -> Batches<'a, T> {
        Batches {
            plan: *self,
            rows,
            next: 0,
            abort,
        }
    }
}

/// Iterator over `(index, rows)` pairs of a [`BatchPlan`].
#[derive(Debug)]
pub struct Batches<'a, T> {
    plan: BatchPlan,
    rows: &'a [T],
    next: usize,
    abort: Option<&'a AbortHandle>,
}

impl<'a, T> Iterator for Batches<'a, T> {
    type Item = (usize, &'a [T]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.plan.batch_count {
            return None;
        }
        if self.abort.is_some_and(AbortHandle::is_aborted) {
            return None;
        }

        let index = self.next;
        self.next += 1;
        Some((index, &self.rows[self.plan.range(index)]))
    }
}
