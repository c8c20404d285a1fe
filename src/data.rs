//! Row storage and value types.
//!
//! - **Value / DataType**: the dynamically typed scalar representation shared
//!   by evaluation, the IR and SQL generation
//! - **ColumnValue**: the bridge between Rust types and `Value`, used by
//!   typed columns
//! - **DataSet / DataRow**: in-memory rows of one model; a `DataRow` is the
//!   row handle expressions are evaluated against

pub mod data_set;
pub mod value;

pub use data_set::{DataRow, DataSet};
pub use value::{ColumnValue, DataType, IntegerValue, NumericValue, Value};
