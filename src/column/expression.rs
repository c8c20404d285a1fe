use crate::column::{Column, ColumnSource};
use crate::data::{ColumnValue, DataRow, DataType, Value};
use crate::expression::{DbExpression, ExpressionResult};
use crate::model::ModelSet;
use std::fmt;
use std::rc::Rc;

/// The computation behind a computed column.
///
/// Implementations are immutable once built. `db_expression` builds a new IR
/// tree on every call and has no side effects. The two model sets are
/// computed at most once per instance.
pub trait ColumnExpression: fmt::Debug {
    fn data_type(&self) -> DataType;

    /// Evaluate against a single row
    fn eval(&self, row: DataRow<'_>) -> ExpressionResult<Value>;

    /// Lower to IR
    fn db_expression(&self) -> DbExpression;

    /// Models read without aggregation
    fn parent_model_set(&self) -> &ModelSet;

    /// Models read through an aggregate function
    fn aggregate_model_set(&self) -> &ModelSet;
}

/// A column expression producing values of `T`
pub trait TypedExpression<T: ColumnValue>: ColumnExpression + Sized + 'static {
    fn eval_typed(&self, row: DataRow<'_>) -> ExpressionResult<Option<T>> {
        T::from_value(self.eval(row)?)
    }

    /// Wrap this expression in a new computed column
    fn make_column(self) -> Column<T> {
        Column::from_source(String::new(), ColumnSource::Computed(Rc::new(self)))
    }
}
