//! Visitor contract over the expression IR.

use crate::expression::expr::{
    DbBinaryExpression, DbCaseExpression, DbCastExpression, DbColumnExpression,
    DbConstantExpression, DbFunctionExpression, DbParamExpression, DbUnaryExpression,
};
use std::rc::Rc;

/// One method per node variant, dispatched by [`DbExpression::accept`].
///
/// There are no default methods: adding a variant breaks every visitor until
/// it handles the new node. Side-effecting visitors use `Output = ()`.
/// Nodes are passed as their `Rc` so a visitor can return them as-is.
///
/// [`DbExpression::accept`]: crate::expression::DbExpression::accept
pub trait DbExpressionVisitor {
    type Output;

    fn visit_binary(&mut self, expr: &Rc<DbBinaryExpression>) -> Self::Output;

    fn visit_unary(&mut self, expr: &Rc<DbUnaryExpression>) -> Self::Output;

    fn visit_case(&mut self, expr: &Rc<DbCaseExpression>) -> Self::Output;

    fn visit_cast(&mut self, expr: &Rc<DbCastExpression>) -> Self::Output;

    fn visit_column(&mut self, expr: &Rc<DbColumnExpression>) -> Self::Output;

    fn visit_constant(&mut self, expr: &Rc<DbConstantExpression>) -> Self::Output;

    fn visit_function(&mut self, expr: &Rc<DbFunctionExpression>) -> Self::Output;

    fn visit_param(&mut self, expr: &Rc<DbParamExpression>) -> Self::Output;
}
