//! Scalar and aggregate function calls.

use crate::column::{AnyColumn, Column, ColumnExpression, TypedExpression};
use crate::data::{ColumnValue, DataRow, DataType, NumericValue, Value};
use crate::expression::eval::{evaluate_aggregate, evaluate_scalar_function};
use crate::expression::{DbExpression, ExpressionError, ExpressionResult, FunctionKey};
use crate::model::{Model, ModelId, ModelSet};
use std::cell::OnceCell;
use std::fmt;
use std::marker::PhantomData;

/// A non-aggregate function call; reads whatever its parameters read
pub struct FunctionExpression<T: ColumnValue> {
    key: FunctionKey,
    params: Vec<AnyColumn>,
    parent_models: OnceCell<ModelSet>,
    aggregate_models: OnceCell<ModelSet>,
    _marker: PhantomData<T>,
}

impl<T: ColumnValue> FunctionExpression<T> {
    /// Create a scalar call, checking the key and arity
    pub fn new(key: FunctionKey, params: Vec<AnyColumn>) -> ExpressionResult<Self> {
        match &key {
            FunctionKey::Custom(name) if name.trim().is_empty() => {
                return Err(ExpressionError::InvalidFunctionKey)
            }
            key if key.is_aggregate() => {
                return Err(ExpressionError::TypeCheckFailed {
                    expression: key.name().to_string(),
                    reason: "aggregate function used as a scalar".to_string(),
                })
            }
            _ => {}
        }
        key.check_arity(params.len())?;
        Ok(Self::new_unchecked(key, params))
    }

    fn new_unchecked(key: FunctionKey, params: Vec<AnyColumn>) -> Self {
        Self {
            key,
            params,
            parent_models: OnceCell::new(),
            aggregate_models: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &FunctionKey {
        &self.key
    }

    pub fn params(&self) -> &[AnyColumn] {
        &self.params
    }
}

impl<T: ColumnValue> fmt::Debug for FunctionExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionExpression")
            .field("key", &self.key)
            .field("params", &self.params)
            .finish()
    }
}

impl<T: ColumnValue> ColumnExpression for FunctionExpression<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn eval(&self, row: DataRow<'_>) -> ExpressionResult<Value> {
        let args = self
            .params
            .iter()
            .map(|p| p.eval(row))
            .collect::<ExpressionResult<Vec<_>>>()?;
        evaluate_scalar_function(&self.key, args)
    }

    fn db_expression(&self) -> DbExpression {
        DbExpression::function_unchecked(
            self.key.clone(),
            self.params.iter().map(AnyColumn::db_expression).collect(),
        )
    }

    fn parent_model_set(&self) -> &ModelSet {
        self.parent_models
            .get_or_init(|| self.params.iter().map(AnyColumn::parent_model_set).collect())
    }

    fn aggregate_model_set(&self) -> &ModelSet {
        self.aggregate_models
            .get_or_init(|| self.params.iter().map(AnyColumn::aggregate_model_set).collect())
    }
}

impl<T: ColumnValue> TypedExpression<T> for FunctionExpression<T> {}

/// An aggregate function call.
///
/// Reads no model directly: everything its parameter reads, aggregated or
/// not, is read through the aggregate.
pub struct AggregateExpression<T: ColumnValue> {
    key: FunctionKey,
    param: Option<AnyColumn>,
    /// Model counted by `COUNT(*)`
    counted: Option<ModelId>,
    aggregate_models: OnceCell<ModelSet>,
    _marker: PhantomData<T>,
}

impl<T: ColumnValue> AggregateExpression<T> {
    fn new(key: FunctionKey, param: Option<AnyColumn>, counted: Option<ModelId>) -> Self {
        debug_assert!(key.is_aggregate());
        Self {
            key,
            param,
            counted,
            aggregate_models: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &FunctionKey {
        &self.key
    }

    pub fn param(&self) -> Option<&AnyColumn> {
        self.param.as_ref()
    }
}

impl<T: ColumnValue> fmt::Debug for AggregateExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateExpression")
            .field("key", &self.key)
            .field("param", &self.param)
            .field("counted", &self.counted)
            .finish()
    }
}

impl<T: ColumnValue> ColumnExpression for AggregateExpression<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    /// The group is every row of the row's data set
    fn eval(&self, row: DataRow<'_>) -> ExpressionResult<Value> {
        let data_set = row.data_set();
        let values = match &self.param {
            Some(param) => data_set
                .rows()
                .map(|r| param.eval(r))
                .collect::<ExpressionResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        evaluate_aggregate(&self.key, &values, data_set.len())
    }

    fn db_expression(&self) -> DbExpression {
        DbExpression::function_unchecked(
            self.key.clone(),
            self.param.iter().map(AnyColumn::db_expression).collect(),
        )
    }

    fn parent_model_set(&self) -> &ModelSet {
        ModelSet::empty()
    }

    fn aggregate_model_set(&self) -> &ModelSet {
        self.aggregate_models.get_or_init(|| match (&self.param, self.counted) {
            (Some(param), _) => param
                .parent_model_set()
                .union(param.aggregate_model_set()),
            (None, Some(model)) => ModelSet::single(model),
            (None, None) => ModelSet::new(),
        })
    }
}

impl<T: ColumnValue> TypedExpression<T> for AggregateExpression<T> {}

fn aggregate<S: ColumnValue, T: ColumnValue>(key: FunctionKey, param: &Column<S>) -> Column<T> {
    AggregateExpression::<T>::new(key, Some(param.as_any().clone()), None).make_column()
}

fn scalar<T: ColumnValue>(key: FunctionKey, params: Vec<AnyColumn>) -> Column<T> {
    FunctionExpression::new_unchecked(key, params).make_column()
}

/// `COUNT(*)` over the rows of `model`
pub fn count_rows(model: &Model) -> Column<i32> {
    AggregateExpression::new(FunctionKey::CountRows, None, Some(model.id())).make_column()
}

/// Call a function the crate has no built-in key for. The call lowers to
/// SQL as written but cannot be evaluated in memory.
pub fn call_function<T: ColumnValue>(
    name: &str,
    params: Vec<AnyColumn>,
) -> ExpressionResult<Column<T>> {
    let key = FunctionKey::custom(name)?;
    Ok(scalar(key, params))
}

impl<T: NumericValue> Column<T> {
    pub fn sum(&self) -> Column<T> {
        aggregate(FunctionKey::Sum, self)
    }

    pub fn avg(&self) -> Column<f64> {
        aggregate(FunctionKey::Avg, self)
    }

    pub fn abs(&self) -> Column<T> {
        scalar(FunctionKey::Abs, vec![self.as_any().clone()])
    }
}

impl<T: ColumnValue> Column<T> {
    /// Number of non-NULL values
    pub fn count(&self) -> Column<i32> {
        aggregate(FunctionKey::Count, self)
    }

    pub fn min(&self) -> Column<T> {
        aggregate(FunctionKey::Min, self)
    }

    pub fn max(&self) -> Column<T> {
        aggregate(FunctionKey::Max, self)
    }

    /// This column's value, or `fallback` where it is NULL
    pub fn coalesce(&self, fallback: &Column<T>) -> Column<T> {
        scalar(
            FunctionKey::Coalesce,
            vec![self.as_any().clone(), fallback.as_any().clone()],
        )
    }
}

impl Column<String> {
    pub fn upper(&self) -> Column<String> {
        scalar(FunctionKey::Upper, vec![self.as_any().clone()])
    }

    pub fn lower(&self) -> Column<String> {
        scalar(FunctionKey::Lower, vec![self.as_any().clone()])
    }

    pub fn length(&self) -> Column<i32> {
        scalar(FunctionKey::Length, vec![self.as_any().clone()])
    }
}
