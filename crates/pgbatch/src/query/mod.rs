//! Runtime values and the statements built from them.

mod build;
mod row;
mod value;

pub use build::{BuiltInsert, build_batch_insert_query, build_insert_for_maps, collect_columns};
pub use row::{SqlParam, scan_id, sql_params};
pub use value::Value;
