//! Database expression IR.
//!
//! This module provides:
//! - The immutable expression tree (`DbExpression`) and its node types
//! - A visitor contract with one method per node variant
//! - Type checking and in-memory evaluation built on that visitor

pub mod error;
pub mod eval;
pub mod expr;
pub mod function;
pub mod operator;
pub mod type_checker;
pub mod visitor;

pub use error::{ExpressionError, ExpressionResult};
pub use eval::{evaluate_expression, evaluate_predicate, ExpressionEvaluator};
pub use expr::{
    DbBinaryExpression, DbCaseExpression, DbCastExpression, DbColumnExpression,
    DbConstantExpression, DbExpression, DbFunctionExpression, DbParamExpression,
    DbUnaryExpression,
};
pub use function::FunctionKey;
pub use operator::{BinaryOperator, UnaryOperator};
pub use type_checker::{type_check_expression, TypeChecker};
pub use visitor::DbExpressionVisitor;
