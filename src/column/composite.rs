//! Operator and cast expressions over other columns.

use crate::column::{AnyColumn, ColumnExpression, TypedExpression};
use crate::data::{ColumnValue, DataRow, DataType, Value};
use crate::expression::eval::{evaluate_binary_op, evaluate_cast, evaluate_unary_op};
use crate::expression::{BinaryOperator, DbExpression, ExpressionResult, UnaryOperator};
use crate::model::ModelSet;
use std::cell::OnceCell;
use std::fmt;
use std::marker::PhantomData;

/// `left <kind> right`, producing `T`
pub struct BinaryExpression<T: ColumnValue> {
    kind: BinaryOperator,
    left: AnyColumn,
    right: AnyColumn,
    parent_models: OnceCell<ModelSet>,
    aggregate_models: OnceCell<ModelSet>,
    _marker: PhantomData<T>,
}

impl<T: ColumnValue> BinaryExpression<T> {
    pub fn new(kind: BinaryOperator, left: AnyColumn, right: AnyColumn) -> Self {
        Self {
            kind,
            left,
            right,
            parent_models: OnceCell::new(),
            aggregate_models: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    pub fn kind(&self) -> BinaryOperator {
        self.kind
    }

    pub fn left(&self) -> &AnyColumn {
        &self.left
    }

    pub fn right(&self) -> &AnyColumn {
        &self.right
    }
}

impl<T: ColumnValue> fmt::Debug for BinaryExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryExpression")
            .field("kind", &self.kind)
            .field("left", &self.left)
            .field("right", &self.right)
            .finish()
    }
}

impl<T: ColumnValue> ColumnExpression for BinaryExpression<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn eval(&self, row: DataRow<'_>) -> ExpressionResult<Value> {
        let left = self.left.eval(row)?;
        let right = self.right.eval(row)?;
        evaluate_binary_op(self.kind, left, right)
    }

    fn db_expression(&self) -> DbExpression {
        DbExpression::binary(
            self.kind,
            self.left.db_expression(),
            self.right.db_expression(),
        )
    }

    fn parent_model_set(&self) -> &ModelSet {
        self.parent_models.get_or_init(|| {
            self.left
                .parent_model_set()
                .union(self.right.parent_model_set())
        })
    }

    fn aggregate_model_set(&self) -> &ModelSet {
        self.aggregate_models.get_or_init(|| {
            self.left
                .aggregate_model_set()
                .union(self.right.aggregate_model_set())
        })
    }
}

impl<T: ColumnValue> TypedExpression<T> for BinaryExpression<T> {}

/// `<kind> operand`, producing `T`
pub struct UnaryExpression<T: ColumnValue> {
    kind: UnaryOperator,
    operand: AnyColumn,
    _marker: PhantomData<T>,
}

impl<T: ColumnValue> UnaryExpression<T> {
    pub fn new(kind: UnaryOperator, operand: AnyColumn) -> Self {
        Self {
            kind,
            operand,
            _marker: PhantomData,
        }
    }

    pub fn kind(&self) -> UnaryOperator {
        self.kind
    }

    pub fn operand(&self) -> &AnyColumn {
        &self.operand
    }
}

impl<T: ColumnValue> fmt::Debug for UnaryExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryExpression")
            .field("kind", &self.kind)
            .field("operand", &self.operand)
            .finish()
    }
}

impl<T: ColumnValue> ColumnExpression for UnaryExpression<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn eval(&self, row: DataRow<'_>) -> ExpressionResult<Value> {
        evaluate_unary_op(self.kind, self.operand.eval(row)?)
    }

    fn db_expression(&self) -> DbExpression {
        DbExpression::unary(self.kind, self.operand.db_expression())
    }

    // Same sets as the operand
    fn parent_model_set(&self) -> &ModelSet {
        self.operand.parent_model_set()
    }

    fn aggregate_model_set(&self) -> &ModelSet {
        self.operand.aggregate_model_set()
    }
}

impl<T: ColumnValue> TypedExpression<T> for UnaryExpression<T> {}

/// Converts the operand's values to `T`.
///
/// The source type is the operand's declared type; the target type is `T`.
pub struct CastExpression<T: ColumnValue> {
    operand: AnyColumn,
    _marker: PhantomData<T>,
}

impl<T: ColumnValue> CastExpression<T> {
    pub fn new(operand: AnyColumn) -> Self {
        Self {
            operand,
            _marker: PhantomData,
        }
    }

    pub fn operand(&self) -> &AnyColumn {
        &self.operand
    }

    pub fn source_type(&self) -> DataType {
        self.operand.data_type()
    }
}

impl<T: ColumnValue> fmt::Debug for CastExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastExpression")
            .field("operand", &self.operand)
            .field("target", &T::DATA_TYPE)
            .finish()
    }
}

impl<T: ColumnValue> ColumnExpression for CastExpression<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn eval(&self, row: DataRow<'_>) -> ExpressionResult<Value> {
        evaluate_cast(self.operand.eval(row)?, T::DATA_TYPE)
    }

    fn db_expression(&self) -> DbExpression {
        DbExpression::cast(
            self.operand.db_expression(),
            self.source_type(),
            T::DATA_TYPE,
        )
    }

    fn parent_model_set(&self) -> &ModelSet {
        self.operand.parent_model_set()
    }

    fn aggregate_model_set(&self) -> &ModelSet {
        self.operand.aggregate_model_set()
    }
}

impl<T: ColumnValue> TypedExpression<T> for CastExpression<T> {}
