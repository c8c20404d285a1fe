//! Rewrites column references into a select statement's projections.

use crate::expression::{
    DbBinaryExpression, DbCaseExpression, DbCastExpression, DbColumnExpression,
    DbConstantExpression, DbExpression, DbExpressionVisitor, DbFunctionExpression,
    DbParamExpression, DbUnaryExpression,
};
use crate::query::DbSelectStatement;
use log::trace;
use std::rc::Rc;

/// Replaces every reference to a column of `statement`'s model with the
/// expression the statement projects at that column's ordinal.
///
/// The input tree is never modified: nodes on the path to a substitution are
/// rebuilt, leaves are returned as the same node. Every column reference in
/// the input must belong to the statement's model; anything else is a bug in
/// the caller and panics.
pub struct ColumnReplacer<'a> {
    statement: &'a DbSelectStatement,
}

impl<'a> ColumnReplacer<'a> {
    pub fn new(statement: &'a DbSelectStatement) -> Self {
        Self { statement }
    }

    pub fn statement(&self) -> &'a DbSelectStatement {
        self.statement
    }

    pub fn replace(&mut self, expr: &DbExpression) -> DbExpression {
        expr.accept(self)
    }

    fn replace_all(&mut self, exprs: &[DbExpression]) -> Vec<DbExpression> {
        exprs.iter().map(|e| self.replace(e)).collect()
    }
}

impl DbExpressionVisitor for ColumnReplacer<'_> {
    type Output = DbExpression;

    fn visit_binary(&mut self, expr: &Rc<DbBinaryExpression>) -> DbExpression {
        let left = self.replace(expr.left());
        let right = self.replace(expr.right());
        DbExpression::binary(expr.kind(), left, right)
    }

    fn visit_unary(&mut self, expr: &Rc<DbUnaryExpression>) -> DbExpression {
        DbExpression::unary(expr.kind(), self.replace(expr.operand()))
    }

    fn visit_case(&mut self, expr: &Rc<DbCaseExpression>) -> DbExpression {
        let on = expr.on().map(|on| self.replace(on));
        let when = self.replace_all(expr.when());
        let then = self.replace_all(expr.then());
        let else_expr = self.replace(expr.else_expr());
        DbExpression::case_unchecked(on, when, then, else_expr)
    }

    fn visit_cast(&mut self, expr: &Rc<DbCastExpression>) -> DbExpression {
        DbExpression::cast(
            self.replace(expr.operand()),
            expr.source_type(),
            expr.target_type(),
        )
    }

    fn visit_column(&mut self, expr: &Rc<DbColumnExpression>) -> DbExpression {
        let column = expr.column();
        assert_eq!(
            column.model,
            self.statement.model(),
            "column {} does not belong to the model of the statement being replaced",
            expr.name()
        );
        let select = self.statement.select();
        assert!(
            column.ordinal < select.len(),
            "column {} has ordinal {} but the statement projects {} columns",
            expr.name(),
            column.ordinal,
            select.len()
        );
        trace!("Replacing column {} at ordinal {}", expr.name(), column.ordinal);
        select[column.ordinal].source.clone()
    }

    fn visit_constant(&mut self, expr: &Rc<DbConstantExpression>) -> DbExpression {
        DbExpression::Constant(Rc::clone(expr))
    }

    fn visit_function(&mut self, expr: &Rc<DbFunctionExpression>) -> DbExpression {
        if expr.params().is_empty() {
            return DbExpression::Function(Rc::clone(expr));
        }
        let params = self.replace_all(expr.params());
        DbExpression::function_unchecked(expr.key().clone(), params)
    }

    fn visit_param(&mut self, expr: &Rc<DbParamExpression>) -> DbExpression {
        DbExpression::Param(Rc::clone(expr))
    }
}
