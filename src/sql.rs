//! SQL text generation: dialects, select statements and DDL.

pub mod ddl;
pub mod dialect;
pub mod generator;

pub use ddl::create_table;
pub use dialect::SqlDialect;
pub use generator::{to_sql, SqlGenerator, SqlStatement};
