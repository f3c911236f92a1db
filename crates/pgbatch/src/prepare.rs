//! Build a single-row insert one value at a time.

use pgbatch_sql::{ColumnName, Expr, InsertStmt, TableName, render};

use crate::query::{BuiltInsert, Value};
use crate::{Error, Result};

/// Collects column/value pairs for one row.
///
/// ```
/// use pgbatch::InsertionBuilder;
///
/// let mut row = InsertionBuilder::new();
/// row.add_value("name", "ada")
///     .add_value_when("nickname", "", false)
///     .add_value("age", 36);
///
/// assert_eq!(row.placeholders(), ["$1", "$2"]);
/// let built = row.build("users").unwrap();
/// assert_eq!(built.sql, "INSERT INTO \"users\" (\"name\", \"age\")\nVALUES ($1, $2)");
/// ```
#[derive(Debug, Clone, Default)]
pub struct InsertionBuilder {
    fields: Vec<ColumnName>,
    args: Vec<Value>,
    returning: Option<ColumnName>,
}

impl InsertionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_value(
        &mut self,
        field: impl Into<ColumnName>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.fields.push(field.into());
        self.args.push(value.into());
        self
    }

    /// Add the value only when `check` holds.
    pub fn add_value_when(
        &mut self,
        field: impl Into<ColumnName>,
        value: impl Into<Value>,
        check: bool,
    ) -> &mut Self {
        if check {
            self.add_value(field, value);
        }
        self
    }

    /// Append `RETURNING <column>` to the built statement.
    pub fn returning(&mut self, column: impl Into<ColumnName>) -> &mut Self {
        self.returning = Some(column.into());
        self
    }

    pub fn fields(&self) -> &[ColumnName] {
        &self.fields
    }

    /// `$1`, `$2`, ... one per added value.
    pub fn placeholders(&self) -> Vec<String> {
        (1..=self.args.len()).map(|i| format!("${i}")).collect()
    }

    pub fn arguments(&self) -> &[Value] {
        &self.args
    }

    pub fn build(&self, table: impl Into<TableName>) -> Result<BuiltInsert> {
        if self.fields.is_empty() {
            return Err(Error::EmptyColumns);
        }

        let mut stmt = InsertStmt::new(table.into())
            .columns(self.fields.iter().cloned())
            .row(self.args.iter().map(|_| Expr::param()).collect());
        if let Some(column) = &self.returning {
            stmt = stmt.returning([column.clone()]);
        }

        Ok(BuiltInsert {
            sql: render(&stmt).sql,
            args: self.args.clone(),
        })
    }
}
