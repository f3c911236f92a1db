//! Render SQL AST to string.

use std::cell::Cell;
use std::fmt;

use crate::expr::{ColumnRef, Expr};
use crate::stmt::*;
use crate::{Ident, RenderedSql};

/// Rendering context that tracks parameter numbering.
///
/// Uses interior mutability (`Cell`) so that `Render::render` can take `&self`,
/// enabling the `Fmt` wrapper to implement `Display`.
pub struct RenderContext {
    /// Number of placeholders emitted so far.
    params: Cell<usize>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self {
            params: Cell::new(0),
        }
    }

    /// Assign the next placeholder index (1-based).
    fn next_param(&self) -> usize {
        let idx = self.params.get() + 1;
        self.params.set(idx);
        idx
    }

    /// Finish rendering and return how many placeholders were emitted.
    fn into_param_count(self) -> usize {
        self.params.into_inner()
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Wrapper for rendering a `Render` type via `Display`.
///
/// Allows using `write!(f, "{}", Fmt(ctx, &expr))` in format strings.
pub struct Fmt<'a, T: Render>(
    /// The rendering context for parameter tracking.
    &'a RenderContext,
    /// The value to render.
    &'a T,
);

impl<T: Render> fmt::Display for Fmt<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.1.render(self.0, f)
    }
}

// ============================================================================
// Render implementations
// ============================================================================

/// Trait for types that can be rendered to SQL.
pub trait Render {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl Render for Expr {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Param { cast } => {
                let idx = ctx.next_param();
                write!(f, "${idx}")?;
                if let Some(cast) = cast {
                    write!(f, "::{cast}")?;
                }
                Ok(())
            }
            Expr::Column(col) => col.render(ctx, f),
            Expr::Int(n) => write!(f, "{n}"),
            Expr::BinOp { left, op, right } => {
                let left = Fmt(ctx, left.as_ref());
                let right = Fmt(ctx, right.as_ref());
                let op = op.as_str();
                write!(f, "{left} {op} {right}")
            }
            Expr::Exists(select) => {
                let select = Fmt(ctx, select.as_ref());
                write!(f, "EXISTS ({select})")
            }
            Expr::Raw(s) => write!(f, "{s}"),
        }
    }
}

impl Render for ColumnRef {
    fn render(&self, _ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            let table = Ident(table.as_str());
            write!(f, "{table}.")?;
        }
        let column = Ident(self.column.as_str());
        write!(f, "{column}")
    }
}

/// Write `(a, b, c)` with quoted identifiers.
fn write_ident_list<'a>(
    f: &mut fmt::Formatter<'_>,
    names: impl IntoIterator<Item = &'a str>,
) -> fmt::Result {
    write!(f, "(")?;
    for (i, name) in names.into_iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", Ident(name))?;
    }
    write!(f, ")")
}

/// Write `(..), (..)` value rows.
fn write_rows(ctx: &RenderContext, f: &mut fmt::Formatter<'_>, rows: &[Vec<Expr>]) -> fmt::Result {
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "(")?;
        for (j, val) in row.iter().enumerate() {
            if j > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", Fmt(ctx, val))?;
        }
        write!(f, ")")?;
    }
    Ok(())
}

impl Render for SelectStmt {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT")?;

        // Columns
        if self.columns.is_empty() {
            write!(f, " *")?;
        } else {
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, " {}", Fmt(ctx, col))?;
            }
        }

        // FROM
        if let Some(from) = &self.from {
            write!(f, " FROM {}", Fmt(ctx, from))?;
        }

        // WHERE
        if let Some(where_) = &self.where_ {
            let where_ = Fmt(ctx, where_);
            write!(f, " WHERE {where_}")?;
        }

        Ok(())
    }
}

impl Render for FromClause {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            FromSource::Table(table) => {
                let table = Ident(table.as_str());
                write!(f, "{table}")?;
                if let Some(alias) = &self.alias {
                    let alias = Ident(alias.as_str());
                    write!(f, " AS {alias}")?;
                }
            }
            FromSource::Values { rows, columns } => {
                write!(f, "(VALUES ")?;
                write_rows(ctx, f, rows)?;
                write!(f, ")")?;
                if let Some(alias) = &self.alias {
                    let alias = Ident(alias.as_str());
                    write!(f, " AS {alias} ")?;
                    write_ident_list(f, columns.iter().map(|c| c.as_str()))?;
                }
            }
        }
        Ok(())
    }
}

impl Render for InsertStmt {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = Ident(self.table.as_str());
        write!(f, "INSERT INTO {table} ")?;
        write_ident_list(f, self.columns.iter().map(|c| c.as_str()))?;

        match &self.source {
            InsertSource::Values(rows) => {
                write!(f, "\nVALUES ")?;
                write_rows(ctx, f, rows)?;
            }
            InsertSource::Select(select) => {
                write!(f, "\n{}", Fmt(ctx, select.as_ref()))?;
            }
        }

        // ON CONFLICT
        if let Some(conflict) = &self.on_conflict {
            write!(f, "\n{}", Fmt(ctx, conflict))?;
        }

        // RETURNING
        if !self.returning.is_empty() {
            write!(f, "\nRETURNING ")?;
            for (i, col) in self.returning.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                let col = Ident(col.as_str());
                write!(f, "{col}")?;
            }
        }

        Ok(())
    }
}

impl Render for OnConflict {
    fn render(&self, ctx: &RenderContext, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnConflict::Raw(clause) => write!(f, "{}", clause.trim()),
            OnConflict::Target { columns, action } => {
                write!(f, "ON CONFLICT")?;
                if !columns.is_empty() {
                    write!(f, " ")?;
                    write_ident_list(f, columns.iter().map(|c| c.as_str()))?;
                }
                match action {
                    ConflictAction::DoNothing => write!(f, " DO NOTHING"),
                    ConflictAction::DoUpdate(assignments) => {
                        write!(f, " DO UPDATE SET ")?;
                        for (i, assign) in assignments.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            let col = Ident(assign.column.as_str());
                            let val = Fmt(ctx, &assign.value);
                            write!(f, "{col} = {val}")?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }
}

// ============================================================================
// Convenience methods
// ============================================================================

/// Render a statement to SQL.
pub fn render(stmt: &impl Render) -> RenderedSql {
    let ctx = RenderContext::new();
    let sql = format!("{}", Fmt(&ctx, stmt));
    RenderedSql {
        sql,
        param_count: ctx.into_param_count(),
    }
}
