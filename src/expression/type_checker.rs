//! Type checking for expression trees.

use crate::data::DataType;
use crate::expression::expr::{
    DbBinaryExpression, DbCaseExpression, DbCastExpression, DbColumnExpression,
    DbConstantExpression, DbExpression, DbFunctionExpression, DbParamExpression,
    DbUnaryExpression,
};
use crate::expression::visitor::DbExpressionVisitor;
use crate::expression::{ExpressionError, ExpressionResult, FunctionKey, UnaryOperator};
use crate::model::ModelSet;
use std::rc::Rc;

/// Type checker for expressions.
///
/// `check` returns the output type, or `None` when it cannot be known
/// statically (a call to a custom function).
pub struct TypeChecker<'a> {
    /// Models whose columns may be referenced; `None` allows any
    scope: Option<&'a ModelSet>,
    aggregate_depth: usize,
}

impl<'a> TypeChecker<'a> {
    pub fn new() -> Self {
        Self {
            scope: None,
            aggregate_depth: 0,
        }
    }

    /// Create a type checker that rejects columns outside `scope`
    pub fn scoped(scope: &'a ModelSet) -> Self {
        Self {
            scope: Some(scope),
            aggregate_depth: 0,
        }
    }

    /// Type check an expression and return its output type
    pub fn check(&mut self, expr: &DbExpression) -> ExpressionResult<Option<DataType>> {
        expr.accept(self)
    }

    /// Check if an expression is valid for use as a filter predicate
    pub fn check_filter_predicate(&mut self, expr: &DbExpression) -> ExpressionResult<()> {
        match self.check(expr)? {
            Some(DataType::Boolean) | None => Ok(()),
            Some(other) => Err(ExpressionError::TypeMismatch {
                expected: DataType::Boolean,
                actual: Some(other),
                context: "filter predicate".to_string(),
            }),
        }
    }

    fn check_all(&mut self, exprs: &[DbExpression]) -> ExpressionResult<Vec<Option<DataType>>> {
        exprs.iter().map(|e| self.check(e)).collect()
    }
}

impl Default for TypeChecker<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(expression: &str, reason: impl Into<String>) -> ExpressionError {
    ExpressionError::TypeCheckFailed {
        expression: expression.to_string(),
        reason: reason.into(),
    }
}

/// Fold branch result types; numeric types widen, anything else must match
fn unify(
    expression: &str,
    acc: Option<DataType>,
    next: Option<DataType>,
) -> ExpressionResult<Option<DataType>> {
    match (acc, next) {
        (None, t) | (t, None) => Ok(t),
        (Some(a), Some(b)) if a == b => Ok(Some(a)),
        (Some(a), Some(b)) => a
            .wider_numeric(b)
            .map(Some)
            .ok_or_else(|| failed(expression, format!("incompatible branch types {} and {}", a, b))),
    }
}

impl DbExpressionVisitor for TypeChecker<'_> {
    type Output = ExpressionResult<Option<DataType>>;

    fn visit_binary(&mut self, expr: &Rc<DbBinaryExpression>) -> Self::Output {
        let left_type = self.check(expr.left())?;
        let right_type = self.check(expr.right())?;
        let op = expr.kind();

        match (left_type, right_type) {
            (Some(lt), Some(rt)) => op.output_type(lt, rt).map(Some).ok_or_else(|| {
                ExpressionError::InvalidOperandTypes {
                    operator: op.as_str().to_string(),
                    left_type: Some(lt),
                    right_type: Some(rt),
                }
            }),
            // Unknown operand types are resolved by the database
            _ if op.is_comparison() => Ok(Some(DataType::Boolean)),
            _ => Ok(None),
        }
    }

    fn visit_unary(&mut self, expr: &Rc<DbUnaryExpression>) -> Self::Output {
        let op = expr.kind();
        match self.check(expr.operand())? {
            Some(ot) => op.output_type(ot).map(Some).ok_or_else(|| {
                ExpressionError::InvalidOperandTypes {
                    operator: op.as_str().to_string(),
                    left_type: Some(ot),
                    right_type: None,
                }
            }),
            None => Ok(match op {
                UnaryOperator::Negate | UnaryOperator::OnesComplement => None,
                _ => Some(DataType::Boolean),
            }),
        }
    }

    fn visit_case(&mut self, expr: &Rc<DbCaseExpression>) -> Self::Output {
        let on_type = match expr.on() {
            Some(on) => self.check(on)?,
            None => None,
        };

        let mut result = None;
        for (when, then) in expr.branches() {
            let when_type = self.check(when)?;
            match (expr.on(), on_type, when_type) {
                (Some(_), Some(on), Some(w)) if on != w && on.wider_numeric(w).is_none() => {
                    return Err(failed(
                        "CASE",
                        format!("WHEN value of type {} does not match {}", w, on),
                    ));
                }
                (None, _, Some(w)) if w != DataType::Boolean => {
                    return Err(ExpressionError::TypeMismatch {
                        expected: DataType::Boolean,
                        actual: Some(w),
                        context: "CASE WHEN condition".to_string(),
                    });
                }
                _ => {}
            }
            let then_type = self.check(then)?;
            result = unify("CASE", result, then_type)?;
        }
        let else_type = self.check(expr.else_expr())?;
        unify("CASE", result, else_type)
    }

    fn visit_cast(&mut self, expr: &Rc<DbCastExpression>) -> Self::Output {
        match self.check(expr.operand())? {
            Some(actual) if actual != expr.source_type() => Err(ExpressionError::TypeMismatch {
                expected: expr.source_type(),
                actual: Some(actual),
                context: "CAST operand".to_string(),
            }),
            _ => Ok(Some(expr.target_type())),
        }
    }

    fn visit_column(&mut self, expr: &Rc<DbColumnExpression>) -> Self::Output {
        if let Some(scope) = self.scope {
            if !scope.contains(expr.column().model) {
                return Err(failed(
                    expr.name(),
                    format!("column of model {} is not in scope", expr.column().model.0),
                ));
            }
        }
        Ok(Some(expr.data_type()))
    }

    fn visit_constant(&mut self, expr: &Rc<DbConstantExpression>) -> Self::Output {
        Ok(Some(expr.data_type()))
    }

    fn visit_function(&mut self, expr: &Rc<DbFunctionExpression>) -> Self::Output {
        let key = expr.key();
        key.check_arity(expr.params().len())?;

        if key.is_aggregate() {
            if self.aggregate_depth > 0 {
                return Err(failed(key.name(), "aggregate functions cannot be nested"));
            }
            self.aggregate_depth += 1;
        }
        let param_types = self.check_all(expr.params());
        if key.is_aggregate() {
            self.aggregate_depth -= 1;
        }
        let param_types = param_types?;

        let first = param_types.first().copied().flatten();
        let valid = match key {
            FunctionKey::Sum | FunctionKey::Avg | FunctionKey::Abs => {
                first.map(|t| t.is_numeric()).unwrap_or(true)
            }
            FunctionKey::Upper | FunctionKey::Lower | FunctionKey::Length => {
                first.map(|t| t == DataType::Varchar).unwrap_or(true)
            }
            FunctionKey::Coalesce => {
                let mut unified = Ok(None);
                for t in &param_types {
                    unified = unified.and_then(|acc| unify(key.name(), acc, *t));
                }
                unified.is_ok()
            }
            _ => true,
        };
        if !valid {
            return Err(ExpressionError::InvalidOperandTypes {
                operator: key.name().to_string(),
                left_type: first,
                right_type: None,
            });
        }
        Ok(key.output_type(&param_types))
    }

    fn visit_param(&mut self, expr: &Rc<DbParamExpression>) -> Self::Output {
        Ok(Some(expr.data_type()))
    }
}

/// Helper function to type check an expression
pub fn type_check_expression(expr: &DbExpression) -> ExpressionResult<Option<DataType>> {
    TypeChecker::new().check(expr)
}
