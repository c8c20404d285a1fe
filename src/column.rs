//! Typed, model-aware columns and the expressions that compute them.
//!
//! A column is either stored (a slot of a model, identified by `ColumnId`)
//! or computed (owns a `ColumnExpression`). Both evaluate against a
//! `DataRow`, lower to a `DbExpression` and report the models they read.

pub mod case;
pub mod composite;
pub mod expression;
pub mod function;
pub mod literal;
pub mod ops;
pub mod registry;

pub use case::{Case, CaseExpression, CaseNextWhen, CaseOn, CaseThen, CaseWhen};
pub use composite::{BinaryExpression, CastExpression, UnaryExpression};
pub use expression::{ColumnExpression, TypedExpression};
pub use function::{call_function, count_rows, AggregateExpression, FunctionExpression};
pub use literal::{ParamExpression, ValueExpression};
pub use registry::{ColumnFactory, ColumnRegistry};

use crate::data::{ColumnValue, DataRow, DataType, Value};
use crate::expression::{DbExpression, ExpressionError, ExpressionResult};
use crate::model::{ColumnId, ColumnSort, ModelSet, SortDirection};
use std::cell::OnceCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Where a column's values come from
#[derive(Debug, Clone)]
pub enum ColumnSource {
    Stored(ColumnId),
    Computed(Rc<dyn ColumnExpression>),
}

struct ColumnNode {
    name: String,
    data_type: DataType,
    source: ColumnSource,
    /// `{model}` for a stored column, filled on first access
    stored_models: OnceCell<ModelSet>,
}

/// Untyped column handle. Clones share the same column.
#[derive(Clone)]
pub struct AnyColumn(Rc<ColumnNode>);

impl AnyColumn {
    pub(crate) fn new(name: String, data_type: DataType, source: ColumnSource) -> Self {
        if let ColumnSource::Computed(expr) = &source {
            assert_eq!(
                expr.data_type(),
                data_type,
                "expression type does not match column {}",
                name
            );
        }
        AnyColumn(Rc::new(ColumnNode {
            name,
            data_type,
            source,
            stored_models: OnceCell::new(),
        }))
    }

    /// Materialize a computed column for an expression whose type is only
    /// known at runtime
    pub fn from_expression(
        name: impl Into<String>,
        expression: Rc<dyn ColumnExpression>,
    ) -> ExpressionResult<Self> {
        ColumnRegistry::global().make_column(
            expression.data_type(),
            name.into(),
            ColumnSource::Computed(expression),
        )
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn data_type(&self) -> DataType {
        self.0.data_type
    }

    pub fn source(&self) -> &ColumnSource {
        &self.0.source
    }

    /// Stored column identity; `None` for a computed column
    pub fn id(&self) -> Option<ColumnId> {
        match &self.0.source {
            ColumnSource::Stored(id) => Some(*id),
            ColumnSource::Computed(_) => None,
        }
    }

    pub fn expression(&self) -> Option<&Rc<dyn ColumnExpression>> {
        match &self.0.source {
            ColumnSource::Stored(_) => None,
            ColumnSource::Computed(expr) => Some(expr),
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self.0.source, ColumnSource::Stored(_))
    }

    pub fn eval(&self, row: DataRow<'_>) -> ExpressionResult<Value> {
        match &self.0.source {
            ColumnSource::Stored(id) => {
                let not_in_row = || ExpressionError::ColumnNotInRow {
                    column: self.name().to_string(),
                    model: row.model().0,
                };
                if id.model != row.model() {
                    return Err(not_in_row());
                }
                row.value(id.ordinal).cloned().ok_or_else(not_in_row)
            }
            ColumnSource::Computed(expr) => expr.eval(row),
        }
    }

    /// Lower to IR
    pub fn db_expression(&self) -> DbExpression {
        match &self.0.source {
            ColumnSource::Stored(id) => DbExpression::column(*id, self.name(), self.data_type()),
            ColumnSource::Computed(expr) => expr.db_expression(),
        }
    }

    /// Models read without aggregation
    pub fn parent_model_set(&self) -> &ModelSet {
        match &self.0.source {
            ColumnSource::Stored(id) => self
                .0
                .stored_models
                .get_or_init(|| ModelSet::single(id.model)),
            ColumnSource::Computed(expr) => expr.parent_model_set(),
        }
    }

    /// Models read through an aggregate function
    pub fn aggregate_model_set(&self) -> &ModelSet {
        match &self.0.source {
            ColumnSource::Stored(_) => ModelSet::empty(),
            ColumnSource::Computed(expr) => expr.aggregate_model_set(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        !self.aggregate_model_set().is_empty()
    }

    pub fn asc(&self) -> ColumnSort {
        ColumnSort::new(self.clone(), SortDirection::Ascending)
    }

    pub fn desc(&self) -> ColumnSort {
        ColumnSort::new(self.clone(), SortDirection::Descending)
    }

    /// Same column, not just an equal one
    pub fn ptr_eq(&self, other: &AnyColumn) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Recover the typed handle
    pub fn typed<T: ColumnValue>(&self) -> ExpressionResult<Column<T>> {
        if self.data_type() != T::DATA_TYPE {
            return Err(ExpressionError::TypeMismatch {
                expected: T::DATA_TYPE,
                actual: Some(self.data_type()),
                context: format!("column {}", self.name()),
            });
        }
        Ok(Column {
            inner: self.clone(),
            _marker: PhantomData,
        })
    }
}

impl fmt::Debug for AnyColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AnyColumn");
        s.field("name", &self.0.name)
            .field("data_type", &self.0.data_type);
        match &self.0.source {
            ColumnSource::Stored(id) => s.field("id", id),
            ColumnSource::Computed(expr) => s.field("expression", expr),
        };
        s.finish()
    }
}

impl AsRef<AnyColumn> for AnyColumn {
    fn as_ref(&self) -> &AnyColumn {
        self
    }
}

/// A column whose values are of Rust type `T`
pub struct Column<T: ColumnValue> {
    inner: AnyColumn,
    _marker: PhantomData<T>,
}

impl<T: ColumnValue> Column<T> {
    pub(crate) fn from_source(name: String, source: ColumnSource) -> Self {
        Column {
            inner: AnyColumn::new(name, T::DATA_TYPE, source),
            _marker: PhantomData,
        }
    }

    /// A constant column
    pub fn value(value: T) -> Self {
        ValueExpression::new(Some(value)).make_column()
    }

    /// A constant NULL column
    pub fn null() -> Self {
        ValueExpression::<T>::new(None).make_column()
    }

    /// A column bound to a statement parameter
    pub fn param(name: impl Into<String>, value: Option<T>) -> Self {
        ParamExpression::new(name, value).make_column()
    }

    pub fn as_any(&self) -> &AnyColumn {
        &self.inner
    }

    pub fn into_any(self) -> AnyColumn {
        self.inner
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    pub fn id(&self) -> Option<ColumnId> {
        self.inner.id()
    }

    pub fn eval(&self, row: DataRow<'_>) -> ExpressionResult<Option<T>> {
        T::from_value(self.inner.eval(row)?)
    }

    pub fn db_expression(&self) -> DbExpression {
        self.inner.db_expression()
    }

    pub fn parent_model_set(&self) -> &ModelSet {
        self.inner.parent_model_set()
    }

    pub fn aggregate_model_set(&self) -> &ModelSet {
        self.inner.aggregate_model_set()
    }

    pub fn asc(&self) -> ColumnSort {
        self.inner.asc()
    }

    pub fn desc(&self) -> ColumnSort {
        self.inner.desc()
    }
}

impl<T: ColumnValue> Clone for Column<T> {
    fn clone(&self) -> Self {
        Column {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ColumnValue> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl<T: ColumnValue> AsRef<AnyColumn> for Column<T> {
    fn as_ref(&self) -> &AnyColumn {
        &self.inner
    }
}

impl<T: ColumnValue> From<Column<T>> for AnyColumn {
    fn from(column: Column<T>) -> Self {
        column.inner
    }
}
