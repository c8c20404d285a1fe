//! Expression evaluation implementation.
//!
//! The free functions here define operator, cast and function semantics on
//! plain `Value`s. Both the IR evaluator below and the typed column
//! expressions go through them, so a computed column and its lowered IR
//! always agree on results.

use crate::data::{DataRow, DataType, Value};
use crate::expression::expr::{
    DbBinaryExpression, DbCaseExpression, DbCastExpression, DbColumnExpression,
    DbConstantExpression, DbExpression, DbFunctionExpression, DbParamExpression,
    DbUnaryExpression,
};
use crate::expression::visitor::DbExpressionVisitor;
use crate::expression::{
    BinaryOperator, ExpressionError, ExpressionResult, FunctionKey, UnaryOperator,
};
use std::cmp::Ordering;
use std::rc::Rc;

/// Evaluates IR trees against a single row
pub struct ExpressionEvaluator<'a> {
    row: DataRow<'a>,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(row: DataRow<'a>) -> Self {
        Self { row }
    }

    /// Evaluate an expression and return the result
    pub fn evaluate(&mut self, expr: &DbExpression) -> ExpressionResult<Value> {
        expr.accept(self)
    }
}

impl DbExpressionVisitor for ExpressionEvaluator<'_> {
    type Output = ExpressionResult<Value>;

    fn visit_binary(&mut self, expr: &Rc<DbBinaryExpression>) -> Self::Output {
        let left = self.evaluate(expr.left())?;
        let right = self.evaluate(expr.right())?;
        evaluate_binary_op(expr.kind(), left, right)
    }

    fn visit_unary(&mut self, expr: &Rc<DbUnaryExpression>) -> Self::Output {
        let operand = self.evaluate(expr.operand())?;
        evaluate_unary_op(expr.kind(), operand)
    }

    fn visit_case(&mut self, expr: &Rc<DbCaseExpression>) -> Self::Output {
        let on = expr.on().map(|on| self.evaluate(on)).transpose()?;
        for (when, then) in expr.branches() {
            let when = self.evaluate(when)?;
            if case_branch_matches(on.as_ref(), &when)? {
                return self.evaluate(then);
            }
        }
        self.evaluate(expr.else_expr())
    }

    fn visit_cast(&mut self, expr: &Rc<DbCastExpression>) -> Self::Output {
        let value = self.evaluate(expr.operand())?;
        evaluate_cast(value, expr.target_type())
    }

    fn visit_column(&mut self, expr: &Rc<DbColumnExpression>) -> Self::Output {
        let column = expr.column();
        if column.model != self.row.model() {
            return Err(ExpressionError::ColumnNotInRow {
                column: expr.name().to_string(),
                model: self.row.model().0,
            });
        }
        self.row
            .value(column.ordinal)
            .cloned()
            .ok_or_else(|| ExpressionError::ColumnNotInRow {
                column: expr.name().to_string(),
                model: self.row.model().0,
            })
    }

    fn visit_constant(&mut self, expr: &Rc<DbConstantExpression>) -> Self::Output {
        Ok(expr.value().clone())
    }

    fn visit_function(&mut self, expr: &Rc<DbFunctionExpression>) -> Self::Output {
        let key = expr.key();
        if key.is_aggregate() {
            // Aggregates fold over every row of the data set the row belongs to
            let data_set = self.row.data_set();
            let mut values = Vec::with_capacity(data_set.len());
            if let Some(param) = expr.params().first() {
                for row in data_set.rows() {
                    values.push(ExpressionEvaluator::new(row).evaluate(param)?);
                }
            }
            return evaluate_aggregate(key, &values, data_set.len());
        }

        let args = expr
            .params()
            .iter()
            .map(|param| self.evaluate(param))
            .collect::<ExpressionResult<Vec<_>>>()?;
        evaluate_scalar_function(key, args)
    }

    fn visit_param(&mut self, expr: &Rc<DbParamExpression>) -> Self::Output {
        Ok(expr.value().clone())
    }
}

/// Helper function to evaluate an expression against a row
pub fn evaluate_expression(expr: &DbExpression, row: DataRow<'_>) -> ExpressionResult<Value> {
    ExpressionEvaluator::new(row).evaluate(expr)
}

/// Evaluate a predicate; NULL is treated as false, as in a WHERE clause
pub fn evaluate_predicate(expr: &DbExpression, row: DataRow<'_>) -> ExpressionResult<bool> {
    match evaluate_expression(expr, row)? {
        Value::Boolean(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(ExpressionError::TypeMismatch {
            expected: DataType::Boolean,
            actual: other.data_type(),
            context: "predicate".to_string(),
        }),
    }
}

fn invalid_operands(op: BinaryOperator, left: &Value, right: &Value) -> ExpressionError {
    ExpressionError::InvalidOperandTypes {
        operator: op.as_str().to_string(),
        left_type: left.data_type(),
        right_type: right.data_type(),
    }
}

fn invalid_operand(op: &str, operand: &Value) -> ExpressionError {
    ExpressionError::InvalidOperandTypes {
        operator: op.to_string(),
        left_type: operand.data_type(),
        right_type: None,
    }
}

/// Evaluate a binary operation
pub fn evaluate_binary_op(
    op: BinaryOperator,
    left: Value,
    right: Value,
) -> ExpressionResult<Value> {
    // Handle NULL propagation for most operators
    if left.is_null() || right.is_null() {
        return Ok(match op {
            // NULL AND false = false, NULL AND true = NULL
            BinaryOperator::And => match (&left, &right) {
                (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Value::Boolean(false),
                _ => Value::Null,
            },
            // NULL OR true = true, NULL OR false = NULL
            BinaryOperator::Or => match (&left, &right) {
                (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Value::Boolean(true),
                _ => Value::Null,
            },
            _ => Value::Null,
        });
    }

    match op {
        BinaryOperator::Add
        | BinaryOperator::Sub
        | BinaryOperator::Mul
        | BinaryOperator::Div
        | BinaryOperator::Mod
        | BinaryOperator::BitwiseAnd
        | BinaryOperator::BitwiseOr
        | BinaryOperator::BitwiseXor => evaluate_arithmetic(op, &left, &right),

        BinaryOperator::Eq => compare(op, &left, &right, |o| o == Ordering::Equal),
        BinaryOperator::Ne => compare(op, &left, &right, |o| o != Ordering::Equal),
        BinaryOperator::Lt => compare(op, &left, &right, |o| o == Ordering::Less),
        BinaryOperator::Le => compare(op, &left, &right, |o| o != Ordering::Greater),
        BinaryOperator::Gt => compare(op, &left, &right, |o| o == Ordering::Greater),
        BinaryOperator::Ge => compare(op, &left, &right, |o| o != Ordering::Less),

        BinaryOperator::And => match (&left, &right) {
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a && *b)),
            _ => Err(invalid_operands(op, &left, &right)),
        },

        BinaryOperator::Or => match (&left, &right) {
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a || *b)),
            _ => Err(invalid_operands(op, &left, &right)),
        },

        BinaryOperator::Concat => match (&left, &right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => Err(invalid_operands(op, &left, &right)),
        },
    }
}

enum NumericPair {
    Int32(i32, i32),
    Int64(i64, i64),
    Double(f64, f64),
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Int32(n) => Some(*n as i64),
        Value::Int64(n) => Some(*n),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int32(n) => Some(*n as f64),
        Value::Int64(n) => Some(*n as f64),
        Value::Double(n) => Some(*n),
        _ => None,
    }
}

/// Promote both operands to the wider numeric type
fn numeric_pair(left: &Value, right: &Value) -> Option<NumericPair> {
    let wide = left.data_type()?.wider_numeric(right.data_type()?)?;
    match (wide, left, right) {
        (DataType::Int32, Value::Int32(a), Value::Int32(b)) => Some(NumericPair::Int32(*a, *b)),
        (DataType::Int64, _, _) => Some(NumericPair::Int64(as_i64(left)?, as_i64(right)?)),
        (DataType::Double, _, _) => Some(NumericPair::Double(as_f64(left)?, as_f64(right)?)),
        _ => None,
    }
}

macro_rules! integer_op {
    ($name:ident, $t:ty) => {
        fn $name(op: BinaryOperator, a: $t, b: $t) -> ExpressionResult<Option<$t>> {
            Ok(Some(match op {
                BinaryOperator::Add => a.wrapping_add(b),
                BinaryOperator::Sub => a.wrapping_sub(b),
                BinaryOperator::Mul => a.wrapping_mul(b),
                BinaryOperator::Div | BinaryOperator::Mod if b == 0 => {
                    return Err(ExpressionError::DivisionByZero)
                }
                BinaryOperator::Div => a.wrapping_div(b),
                BinaryOperator::Mod => a.wrapping_rem(b),
                BinaryOperator::BitwiseAnd => a & b,
                BinaryOperator::BitwiseOr => a | b,
                BinaryOperator::BitwiseXor => a ^ b,
                _ => return Ok(None),
            }))
        }
    };
}

integer_op!(int32_op, i32);
integer_op!(int64_op, i64);

fn double_op(op: BinaryOperator, a: f64, b: f64) -> ExpressionResult<Option<f64>> {
    Ok(Some(match op {
        BinaryOperator::Add => a + b,
        BinaryOperator::Sub => a - b,
        BinaryOperator::Mul => a * b,
        BinaryOperator::Div | BinaryOperator::Mod if b == 0.0 => {
            return Err(ExpressionError::DivisionByZero)
        }
        BinaryOperator::Div => a / b,
        BinaryOperator::Mod => a % b,
        _ => return Ok(None),
    }))
}

fn evaluate_arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> ExpressionResult<Value> {
    let pair = numeric_pair(left, right).ok_or_else(|| invalid_operands(op, left, right))?;
    let result = match pair {
        NumericPair::Int32(a, b) => int32_op(op, a, b)?.map(Value::Int32),
        NumericPair::Int64(a, b) => int64_op(op, a, b)?.map(Value::Int64),
        NumericPair::Double(a, b) => double_op(op, a, b)?.map(Value::Double),
    };
    result.ok_or_else(|| invalid_operands(op, left, right))
}

/// Order two non-NULL values of comparable types
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    if let Some(pair) = numeric_pair(left, right) {
        return Some(match pair {
            NumericPair::Int32(a, b) => a.cmp(&b),
            NumericPair::Int64(a, b) => a.cmp(&b),
            NumericPair::Double(a, b) => a.total_cmp(&b),
        });
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn compare<F>(op: BinaryOperator, left: &Value, right: &Value, cmp_fn: F) -> ExpressionResult<Value>
where
    F: FnOnce(Ordering) -> bool,
{
    compare_values(left, right)
        .map(|ordering| Value::Boolean(cmp_fn(ordering)))
        .ok_or_else(|| invalid_operands(op, left, right))
}

/// Evaluate a unary operation
pub fn evaluate_unary_op(op: UnaryOperator, operand: Value) -> ExpressionResult<Value> {
    match op {
        UnaryOperator::IsNull => Ok(Value::Boolean(operand.is_null())),
        UnaryOperator::IsNotNull => Ok(Value::Boolean(!operand.is_null())),
        _ if operand.is_null() => Ok(Value::Null),
        UnaryOperator::Not => match operand {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            _ => Err(invalid_operand(op.as_str(), &operand)),
        },
        UnaryOperator::Negate => match operand {
            Value::Int32(n) => Ok(Value::Int32(n.wrapping_neg())),
            Value::Int64(n) => Ok(Value::Int64(n.wrapping_neg())),
            Value::Double(n) => Ok(Value::Double(-n)),
            _ => Err(invalid_operand(op.as_str(), &operand)),
        },
        UnaryOperator::OnesComplement => match operand {
            Value::Int32(n) => Ok(Value::Int32(!n)),
            Value::Int64(n) => Ok(Value::Int64(!n)),
            _ => Err(invalid_operand(op.as_str(), &operand)),
        },
    }
}

/// Whether a CASE branch is taken.
///
/// With an `on` value the branch matches when it equals the WHEN value;
/// otherwise the WHEN value must be TRUE. NULL never matches.
pub fn case_branch_matches(on: Option<&Value>, when: &Value) -> ExpressionResult<bool> {
    match on {
        Some(on) => {
            if on.is_null() || when.is_null() {
                return Ok(false);
            }
            compare_values(on, when)
                .map(|ordering| ordering == Ordering::Equal)
                .ok_or_else(|| invalid_operands(BinaryOperator::Eq, on, when))
        }
        None => match when {
            Value::Boolean(b) => Ok(*b),
            Value::Null => Ok(false),
            other => Err(ExpressionError::TypeMismatch {
                expected: DataType::Boolean,
                actual: other.data_type(),
                context: "CASE WHEN condition".to_string(),
            }),
        },
    }
}

/// Convert a value to the target type
pub fn evaluate_cast(value: Value, target: DataType) -> ExpressionResult<Value> {
    if value.is_null() || value.data_type() == Some(target) {
        return Ok(value);
    }
    let invalid = |value: &Value| ExpressionError::InvalidCast {
        value: format!("{:?}", value),
        target,
    };
    let result = match (&value, target) {
        (Value::Boolean(b), DataType::Int32) => Some(Value::Int32(*b as i32)),
        (Value::Boolean(b), DataType::Int64) => Some(Value::Int64(*b as i64)),
        (Value::Boolean(b), DataType::Double) => Some(Value::Double(*b as i32 as f64)),
        (Value::Boolean(b), DataType::Varchar) => Some(Value::String(b.to_string())),

        (Value::Int32(n), DataType::Boolean) => Some(Value::Boolean(*n != 0)),
        (Value::Int32(n), DataType::Int64) => Some(Value::Int64(*n as i64)),
        (Value::Int32(n), DataType::Double) => Some(Value::Double(*n as f64)),
        (Value::Int32(n), DataType::Varchar) => Some(Value::String(n.to_string())),

        (Value::Int64(n), DataType::Boolean) => Some(Value::Boolean(*n != 0)),
        (Value::Int64(n), DataType::Int32) => i32::try_from(*n).ok().map(Value::Int32),
        (Value::Int64(n), DataType::Double) => Some(Value::Double(*n as f64)),
        (Value::Int64(n), DataType::Varchar) => Some(Value::String(n.to_string())),

        (Value::Double(n), DataType::Boolean) => Some(Value::Boolean(*n != 0.0)),
        (Value::Double(n), DataType::Int32)
            if n.is_finite() && *n >= i32::MIN as f64 && *n <= i32::MAX as f64 =>
        {
            Some(Value::Int32(n.trunc() as i32))
        }
        (Value::Double(n), DataType::Int64)
            // i64::MAX as f64 rounds up to 2^63
            if n.is_finite() && *n >= i64::MIN as f64 && *n < -(i64::MIN as f64) =>
        {
            Some(Value::Int64(n.trunc() as i64))
        }
        (Value::Double(n), DataType::Varchar) => Some(Value::String(n.to_string())),

        (Value::String(s), DataType::Boolean) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Boolean(true)),
            "false" | "0" => Some(Value::Boolean(false)),
            _ => None,
        },
        (Value::String(s), DataType::Int32) => s.trim().parse().ok().map(Value::Int32),
        (Value::String(s), DataType::Int64) => s.trim().parse().ok().map(Value::Int64),
        (Value::String(s), DataType::Double) => s.trim().parse().ok().map(Value::Double),

        _ => None,
    };
    result.ok_or_else(|| invalid(&value))
}

/// Evaluate a non-aggregate function call
pub fn evaluate_scalar_function(key: &FunctionKey, args: Vec<Value>) -> ExpressionResult<Value> {
    key.check_arity(args.len())?;
    match key {
        FunctionKey::Coalesce => Ok(args
            .into_iter()
            .find(|v| !v.is_null())
            .unwrap_or(Value::Null)),

        FunctionKey::Upper | FunctionKey::Lower | FunctionKey::Length | FunctionKey::Abs => {
            let arg = args.into_iter().next().unwrap_or(Value::Null);
            match (key, arg) {
                (_, Value::Null) => Ok(Value::Null),
                (FunctionKey::Upper, Value::String(s)) => Ok(Value::String(s.to_uppercase())),
                (FunctionKey::Lower, Value::String(s)) => Ok(Value::String(s.to_lowercase())),
                (FunctionKey::Length, Value::String(s)) => {
                    Ok(Value::Int32(s.chars().count() as i32))
                }
                (FunctionKey::Abs, Value::Int32(n)) => Ok(Value::Int32(n.wrapping_abs())),
                (FunctionKey::Abs, Value::Int64(n)) => Ok(Value::Int64(n.wrapping_abs())),
                (FunctionKey::Abs, Value::Double(n)) => Ok(Value::Double(n.abs())),
                (key, other) => Err(invalid_operand(key.name(), &other)),
            }
        }

        FunctionKey::Custom(name) => Err(ExpressionError::UnknownFunction { name: name.clone() }),

        aggregate => Err(ExpressionError::TypeCheckFailed {
            expression: aggregate.name().to_string(),
            reason: "aggregate function evaluated as a scalar".to_string(),
        }),
    }
}

/// Fold an aggregate over the parameter values of every row in a group
pub fn evaluate_aggregate(
    key: &FunctionKey,
    values: &[Value],
    row_count: usize,
) -> ExpressionResult<Value> {
    let non_null = values.iter().filter(|v| !v.is_null());
    match key {
        FunctionKey::CountRows => Ok(Value::Int32(row_count as i32)),
        FunctionKey::Count => Ok(Value::Int32(non_null.count() as i32)),
        FunctionKey::Sum => non_null.cloned().try_fold(Value::Null, |acc, v| {
            if acc.is_null() {
                Ok(v)
            } else {
                evaluate_binary_op(BinaryOperator::Add, acc, v)
            }
        }),
        FunctionKey::Avg => {
            let mut total = 0.0;
            let mut count = 0usize;
            for v in non_null {
                total += as_f64(v).ok_or_else(|| invalid_operand(key.name(), v))?;
                count += 1;
            }
            Ok(if count == 0 {
                Value::Null
            } else {
                Value::Double(total / count as f64)
            })
        }
        FunctionKey::Min | FunctionKey::Max => {
            let wanted = if *key == FunctionKey::Min {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best: Option<&Value> = None;
            for v in non_null {
                best = match best {
                    None => Some(v),
                    Some(current) => {
                        let ordering = compare_values(v, current)
                            .ok_or_else(|| invalid_operand(key.name(), v))?;
                        Some(if ordering == wanted { v } else { current })
                    }
                };
            }
            Ok(best.cloned().unwrap_or(Value::Null))
        }
        scalar => Err(ExpressionError::TypeCheckFailed {
            expression: scalar.name().to_string(),
            reason: "scalar function evaluated as an aggregate".to_string(),
        }),
    }
}
