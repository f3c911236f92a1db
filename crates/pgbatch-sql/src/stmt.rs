//! SQL statements.

use crate::expr::Expr;
use crate::{ColumnName, TableName};

/// A SELECT statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectStmt {
    /// Selected expressions; empty renders as `*`.
    pub columns: Vec<Expr>,
    pub from: Option<FromClause>,
    pub where_: Option<Expr>,
}

/// A FROM clause.
#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub source: FromSource,
    pub alias: Option<TableName>,
}

/// What a FROM clause reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum FromSource {
    /// A named table
    Table(TableName),

    /// A literal row list: `(VALUES (...), (...)) AS alias (col, ...)`
    Values {
        rows: Vec<Vec<Expr>>,
        columns: Vec<ColumnName>,
    },
}

impl FromClause {
    pub fn table(name: TableName) -> Self {
        Self {
            source: FromSource::Table(name),
            alias: None,
        }
    }

    pub fn aliased(name: TableName, alias: TableName) -> Self {
        Self {
            source: FromSource::Table(name),
            alias: Some(alias),
        }
    }

    pub fn has_param(&self) -> bool {
        match &self.source {
            FromSource::Table(_) => false,
            FromSource::Values { rows, .. } => rows.iter().flatten().any(Expr::has_param),
        }
    }

    /// A VALUES list exposed as a virtual table named `alias`.
    pub fn values(rows: Vec<Vec<Expr>>, alias: TableName, columns: Vec<ColumnName>) -> Self {
        Self {
            source: FromSource::Values { rows, columns },
            alias: Some(alias),
        }
    }
}

impl SelectStmt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, expr: Expr) -> Self {
        self.columns.push(expr);
        self
    }

    pub fn from(mut self, from: FromClause) -> Self {
        self.from = Some(from);
        self
    }

    pub fn where_(mut self, expr: Expr) -> Self {
        self.where_ = Some(expr);
        self
    }

    pub fn has_param(&self) -> bool {
        self.columns.iter().any(Expr::has_param)
            || self.from.as_ref().is_some_and(FromClause::has_param)
            || self.where_.as_ref().is_some_and(Expr::has_param)
    }
}

// ============================================================================
// INSERT statement
// ============================================================================

/// An INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: TableName,
    pub columns: Vec<ColumnName>,
    pub source: InsertSource,
    pub on_conflict: Option<OnConflict>,
    pub returning: Vec<ColumnName>,
}

/// Where the inserted rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// `VALUES (...), (...)`, one inner vec per row
    Values(Vec<Vec<Expr>>),

    /// `SELECT ...`
    Select(Box<SelectStmt>),
}

/// ON CONFLICT clause.
#[derive(Debug, Clone, PartialEq)]
pub enum OnConflict {
    /// `ON CONFLICT [(columns)] action`. An empty column list omits the target.
    Target {
        columns: Vec<ColumnName>,
        action: ConflictAction,
    },

    /// Clause text spliced in verbatim, e.g. `ON CONFLICT ON CONSTRAINT uq_user_email DO NOTHING`.
    Raw(String),
}

impl OnConflict {
    /// `ON CONFLICT DO NOTHING`
    pub fn do_nothing() -> Self {
        OnConflict::Target {
            columns: Vec::new(),
            action: ConflictAction::DoNothing,
        }
    }

    pub fn target(columns: impl IntoIterator<Item = ColumnName>, action: ConflictAction) -> Self {
        OnConflict::Target {
            columns: columns.into_iter().collect(),
            action,
        }
    }

    pub fn raw(clause: impl Into<String>) -> Self {
        OnConflict::Raw(clause.into())
    }

    /// Whether the clause would emit placeholders of its own.
    ///
    /// Inserts bind one argument per value cell, so a clause with
    /// placeholders cannot be bound.
    pub fn has_param(&self) -> bool {
        match self {
            OnConflict::Target {
                action: ConflictAction::DoUpdate(assignments),
                ..
            } => assignments.iter().any(|a| a.value.has_param()),
            OnConflict::Target { .. } | OnConflict::Raw(_) => false,
        }
    }
}

/// What to do on conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictAction {
    /// DO NOTHING
    DoNothing,
    /// DO UPDATE SET ...
    DoUpdate(Vec<UpdateAssignment>),
}

/// An assignment in ON CONFLICT DO UPDATE SET.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateAssignment {
    pub column: ColumnName,
    pub value: Expr,
}

impl UpdateAssignment {
    pub fn new(column: ColumnName, value: Expr) -> Self {
        Self { column, value }
    }
}

impl InsertStmt {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            columns: Vec::new(),
            source: InsertSource::Values(Vec::new()),
            on_conflict: None,
            returning: Vec::new(),
        }
    }

    pub fn columns(mut self, cols: impl IntoIterator<Item = ColumnName>) -> Self {
        self.columns.extend(cols);
        self
    }

    /// Append one row to a `VALUES` source.
    ///
    /// Switches the source back to `VALUES` if it was a `SELECT`.
    pub fn row(mut self, values: Vec<Expr>) -> Self {
        match &mut self.source {
            InsertSource::Values(rows) => rows.push(values),
            InsertSource::Select(_) => self.source = InsertSource::Values(vec![values]),
        }
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = Vec<Expr>>) -> Self {
        for row in rows {
            self = self.row(row);
        }
        self
    }

    pub fn select(mut self, select: SelectStmt) -> Self {
        self.source = InsertSource::Select(Box::new(select));
        self
    }

    pub fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = Some(on_conflict);
        self
    }

    pub fn returning(mut self, cols: impl IntoIterator<Item = ColumnName>) -> Self {
        self.returning.extend(cols);
        self
    }
}
