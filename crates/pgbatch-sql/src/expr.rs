//! SQL expressions.

use std::fmt;

use crate::stmt::SelectStmt;
use crate::{ColumnName, TableName};

/// A SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A positional parameter placeholder, numbered at render time.
    Param { cast: Option<PgCast> },
    /// A column reference
    Column(ColumnRef),
    /// An integer literal
    Int(i64),
    /// Binary operation (e.g., a = b, a AND b)
    BinOp {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    /// EXISTS (subquery)
    Exists(Box<SelectStmt>),
    /// Raw SQL (escape hatch)
    Raw(String),
}

/// A Postgres scalar type a placeholder can be cast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Numeric,
    Text,
    Bytea,
    Jsonb,
    Timestamp,
    Timestamptz,
}

impl PgType {
    pub fn as_str(self) -> &'static str {
        match self {
            PgType::Boolean => "boolean",
            PgType::SmallInt => "smallint",
            PgType::Integer => "integer",
            PgType::BigInt => "bigint",
            PgType::Real => "real",
            PgType::Double => "double precision",
            PgType::Numeric => "numeric",
            PgType::Text => "text",
            PgType::Bytea => "bytea",
            PgType::Jsonb => "jsonb",
            PgType::Timestamp => "timestamp without time zone",
            PgType::Timestamptz => "timestamp with time zone",
        }
    }
}

/// An explicit type cast appended to a placeholder (`$1::integer`, `$2::text[]`).
///
/// Postgres infers `text` for untyped parameters inside a `VALUES` list,
/// so inserts that select from one need every type spelled out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgCast {
    Scalar(PgType),
    Array(PgType),
}

impl PgCast {
    /// The array type whose elements have this cast's type.
    ///
    /// Postgres arrays are not nested by type, so an array stays an array.
    pub fn array_of(self) -> Self {
        match self {
            PgCast::Scalar(ty) | PgCast::Array(ty) => PgCast::Array(ty),
        }
    }
}

impl From<PgType> for PgCast {
    fn from(ty: PgType) -> Self {
        PgCast::Scalar(ty)
    }
}

impl fmt::Display for PgCast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgCast::Scalar(ty) => f.write_str(ty.as_str()),
            PgCast::Array(ty) => write!(f, "{}[]", ty.as_str()),
        }
    }
}

/// A column reference, optionally qualified with table/alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<TableName>,
    pub column: ColumnName,
}

impl ColumnRef {
    pub fn new(column: ColumnName) -> Self {
        Self {
            table: None,
            column,
        }
    }

    pub fn qualified(table: TableName, column: ColumnName) -> Self {
        Self {
            table: Some(table),
            column,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Eq,
    And,
}

impl BinOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOp::Eq => "=",
            BinOp::And => "AND",
        }
    }
}

// Convenience constructors
impl Expr {
    /// An uncast placeholder.
    pub fn param() -> Self {
        Expr::Param { cast: None }
    }

    /// A placeholder with an optional cast.
    pub fn cast_param(cast: Option<PgCast>) -> Self {
        Expr::Param { cast }
    }

    pub fn column(name: ColumnName) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    pub fn qualified_column(table: TableName, column: ColumnName) -> Self {
        Expr::Column(ColumnRef::qualified(table, column))
    }

    /// Reference the row proposed for insertion in `ON CONFLICT DO UPDATE`.
    pub fn excluded(column: ColumnName) -> Self {
        Expr::qualified_column("excluded".into(), column)
    }

    pub fn int(n: i64) -> Self {
        Expr::Int(n)
    }

    pub fn exists(select: SelectStmt) -> Self {
        Expr::Exists(Box::new(select))
    }

    /// Create an equality expression: self = other
    pub fn eq(self, other: Expr) -> Self {
        Expr::BinOp {
            left: Box::new(self),
            op: BinOp::Eq,
            right: Box::new(other),
        }
    }

    /// Create an AND expression: self AND other
    pub fn and(self, other: Expr) -> Self {
        Expr::BinOp {
            left: Box::new(self),
            op: BinOp::And,
            right: Box::new(other),
        }
    }

    /// Fold expressions with AND. Returns `None` for an empty input.
    pub fn all(exprs: impl IntoIterator<Item = Expr>) -> Option<Self> {
        exprs.into_iter().reduce(Expr::and)
    }

    /// Whether rendering this expression emits a placeholder.
    pub fn has_param(&self) -> bool {
        match self {
            Expr::Param { .. } => true,
            Expr::BinOp { left, right, .. } => left.has_param() || right.has_param(),
            Expr::Exists(select) => select.has_param(),
            Expr::Column(_) | Expr::Int(_) | Expr::Raw(_) => false,
        }
    }
}
