//! Error types for expression construction and evaluation.

use crate::data::DataType;
use thiserror::Error;

/// Errors that can occur while building or evaluating expressions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Type mismatch in {context}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        expected: DataType,
        actual: Option<DataType>,
        context: String,
    },

    #[error("Invalid operand types for operator {operator}: left={left_type:?}, right={right_type:?}")]
    InvalidOperandTypes {
        operator: String,
        left_type: Option<DataType>,
        right_type: Option<DataType>,
    },

    #[error("Column {column} is not readable from a row of model {model}")]
    ColumnNotInRow { column: String, model: u32 },

    #[error("Row has {actual} values but the model declares {expected} columns")]
    RowArity { expected: usize, actual: usize },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Cannot cast {value} to {target:?}")]
    InvalidCast { value: String, target: DataType },

    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    #[error("Function key must not be empty")]
    InvalidFunctionKey,

    #[error("Function {function} expects {expected} arguments, got {actual}")]
    FunctionArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("CASE has {when} WHEN branches but {then} THEN branches")]
    CaseArityMismatch { when: usize, then: usize },

    #[error("No column factory registered for {0:?}")]
    UnregisteredColumnType(DataType),

    #[error("Type check failed for expression '{expression}': {reason}")]
    TypeCheckFailed { expression: String, reason: String },
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
