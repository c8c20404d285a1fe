//! Leaf expressions: literal values and statement parameters.

use crate::column::{ColumnExpression, TypedExpression};
use crate::data::{ColumnValue, DataRow, DataType, Value};
use crate::expression::{DbExpression, ExpressionResult};
use crate::model::ModelSet;

/// A literal value. Reads no model.
#[derive(Debug, Clone)]
pub struct ValueExpression<T: ColumnValue> {
    value: Option<T>,
}

impl<T: ColumnValue> ValueExpression<T> {
    pub fn new(value: Option<T>) -> Self {
        Self { value }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

impl<T: ColumnValue> ColumnExpression for ValueExpression<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn eval(&self, _row: DataRow<'_>) -> ExpressionResult<Value> {
        Ok(Value::from(self.value.clone()))
    }

    fn db_expression(&self) -> DbExpression {
        DbExpression::constant(Value::from(self.value.clone()), T::DATA_TYPE)
    }

    fn parent_model_set(&self) -> &ModelSet {
        ModelSet::empty()
    }

    fn aggregate_model_set(&self) -> &ModelSet {
        ModelSet::empty()
    }
}

impl<T: ColumnValue> TypedExpression<T> for ValueExpression<T> {}

/// A value sent as a statement parameter instead of inlined in SQL text
#[derive(Debug, Clone)]
pub struct ParamExpression<T: ColumnValue> {
    name: String,
    value: Option<T>,
}

impl<T: ColumnValue> ParamExpression<T> {
    pub fn new(name: impl Into<String>, value: Option<T>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: ColumnValue> ColumnExpression for ParamExpression<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn eval(&self, _row: DataRow<'_>) -> ExpressionResult<Value> {
        Ok(Value::from(self.value.clone()))
    }

    fn db_expression(&self) -> DbExpression {
        DbExpression::param(&self.name, Value::from(self.value.clone()), T::DATA_TYPE)
    }

    fn parent_model_set(&self) -> &ModelSet {
        ModelSet::empty()
    }

    fn aggregate_model_set(&self) -> &ModelSet {
        ModelSet::empty()
    }
}

impl<T: ColumnValue> TypedExpression<T> for ParamExpression<T> {}
