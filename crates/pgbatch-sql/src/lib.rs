//! SQL AST and rendering for batched inserts.
//!
//! Build statements as a typed AST, then render to a string with automatic
//! positional parameter numbering (`$1`, `$2`, ...) in render order.

use strid::braid;

mod expr;
pub use expr::*;

mod render;
pub use render::*;

mod stmt;
pub use stmt::*;

/// Result of rendering SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSql {
    /// The SQL string with $1, $2, etc. placeholders.
    pub sql: String,

    /// Number of placeholders emitted (the highest `$n`).
    pub param_count: usize,
}

/// The name of a table (or table alias).
#[braid]
pub struct TableName;

/// The name of a column (or column alias).
#[braid]
pub struct ColumnName;

/// A PostgreSQL identifier wrapper.
///
/// Display writes the value escaped and quoted with double quotes.
///
/// # Example
/// ```
/// use pgbatch_sql::Ident;
/// assert_eq!(format!("{}", Ident("user")), "\"user\"");
/// assert_eq!(format!("{}", Ident("bla\"h")), "\"bla\"\"h\"");
/// ```
pub struct Ident<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Ident<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"")?;
        for c in self.0.as_ref().chars() {
            if c == '"' {
                write!(f, "\"\"")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "\"")
    }
}

/// Whether a column tag names a real column.
///
/// Empty tags and the `-` marker mean "not a column".
///
/// ```
/// assert!(pgbatch_sql::is_column_tag("name"));
/// assert!(!pgbatch_sql::is_column_tag(""));
/// assert!(!pgbatch_sql::is_column_tag("-"));
/// ```
pub fn is_column_tag(tag: &str) -> bool {
    !tag.is_empty() && tag != "-"
}
