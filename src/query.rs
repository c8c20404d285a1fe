//! Select statements, their builder and the column rewriter used to
//! flatten nested queries.

pub mod builder;
pub mod column_replacer;
pub mod statement;

pub use builder::{Query, QuerySource, SelectBuilder};
pub use column_replacer::ColumnReplacer;
pub use statement::{ColumnMapping, DbFromClause, DbSelectStatement, DbSortSpec, JoinKind};

use crate::expression::ExpressionError;
use crate::model::ColumnId;
use thiserror::Error;

/// Errors raised while building a query.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Select list is empty")]
    EmptySelect,

    #[error("Duplicate output column: {0}")]
    DuplicateColumn(String),

    #[error("Column {column} reads a model that is not in the FROM clause")]
    ModelNotInScope { column: String },

    #[error("Aggregate functions are not allowed in WHERE")]
    AggregateInWhere,

    #[error("Column {column} must appear in GROUP BY or be used in an aggregate function")]
    NotInGroupBy { column: String },

    #[error("Select item {position} targets {target:?}")]
    InvalidTarget { position: usize, target: ColumnId },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error(transparent)]
    Expression(#[from] ExpressionError),
}

pub type QueryResult<T> = Result<T, QueryError>;
