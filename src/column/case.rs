//! CASE expressions and their typed builder.
//!
//! ```
//! use vibeorm::column::{Case, Column};
//!
//! let grade: Column<i32> = Column::value(2);
//! let label: Column<String> = Case::on(&grade)
//!     .when(&Column::value(1))
//!     .then(&Column::value("low".to_string()))
//!     .when(&Column::value(2))
//!     .then(&Column::value("high".to_string()))
//!     .else_(&Column::value("unknown".to_string()));
//! assert!(label.parent_model_set().is_empty());
//! ```
//!
//! The builder only offers `else_` after a `then`, so WHEN and THEN lists
//! always pair up.

use crate::column::{AnyColumn, Column, ColumnExpression, TypedExpression};
use crate::data::{ColumnValue, DataRow, DataType, Value};
use crate::expression::eval::case_branch_matches;
use crate::expression::{DbExpression, ExpressionResult};
use crate::model::ModelSet;
use std::cell::OnceCell;
use std::fmt;
use std::marker::PhantomData;

pub struct CaseExpression<T: ColumnValue> {
    on: Option<AnyColumn>,
    when: Vec<AnyColumn>,
    then: Vec<AnyColumn>,
    else_expr: AnyColumn,
    parent_models: OnceCell<ModelSet>,
    aggregate_models: OnceCell<ModelSet>,
    _marker: PhantomData<T>,
}

impl<T: ColumnValue> CaseExpression<T> {
    fn new(
        on: Option<AnyColumn>,
        when: Vec<AnyColumn>,
        then: Vec<AnyColumn>,
        else_expr: AnyColumn,
    ) -> Self {
        assert_eq!(when.len(), then.len(), "CASE branches must pair up");
        Self {
            on,
            when,
            then,
            else_expr,
            parent_models: OnceCell::new(),
            aggregate_models: OnceCell::new(),
            _marker: PhantomData,
        }
    }

    fn all_columns(&self) -> impl Iterator<Item = &AnyColumn> {
        self.on
            .iter()
            .chain(self.when.iter())
            .chain(self.then.iter())
            .chain(std::iter::once(&self.else_expr))
    }
}

impl<T: ColumnValue> fmt::Debug for CaseExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaseExpression")
            .field("on", &self.on)
            .field("when", &self.when)
            .field("then", &self.then)
            .field("else", &self.else_expr)
            .finish()
    }
}

impl<T: ColumnValue> ColumnExpression for CaseExpression<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn eval(&self, row: DataRow<'_>) -> ExpressionResult<Value> {
        let on = self.on.as_ref().map(|on| on.eval(row)).transpose()?;
        for (when, then) in self.when.iter().zip(self.then.iter()) {
            if case_branch_matches(on.as_ref(), &when.eval(row)?)? {
                return then.eval(row);
            }
        }
        self.else_expr.eval(row)
    }

    fn db_expression(&self) -> DbExpression {
        DbExpression::case_unchecked(
            self.on.as_ref().map(AnyColumn::db_expression),
            self.when.iter().map(AnyColumn::db_expression).collect(),
            self.then.iter().map(AnyColumn::db_expression).collect(),
            self.else_expr.db_expression(),
        )
    }

    fn parent_model_set(&self) -> &ModelSet {
        self.parent_models
            .get_or_init(|| self.all_columns().map(AnyColumn::parent_model_set).collect())
    }

    fn aggregate_model_set(&self) -> &ModelSet {
        self.aggregate_models
            .get_or_init(|| self.all_columns().map(AnyColumn::aggregate_model_set).collect())
    }
}

impl<T: ColumnValue> TypedExpression<T> for CaseExpression<T> {}

/// Entry point of the CASE builder
pub struct Case;

impl Case {
    /// `CASE on WHEN value THEN ...`: each WHEN value is compared to `on`
    pub fn on<S: ColumnValue>(on: &Column<S>) -> CaseOn<S> {
        CaseOn {
            on: on.as_any().clone(),
            _marker: PhantomData,
        }
    }

    /// `CASE WHEN condition THEN ...`
    pub fn when(condition: &Column<bool>) -> CaseWhen<bool> {
        CaseWhen {
            on: None,
            when: vec![condition.as_any().clone()],
            _marker: PhantomData,
        }
    }
}

pub struct CaseOn<S> {
    on: AnyColumn,
    _marker: PhantomData<S>,
}

impl<S: ColumnValue> CaseOn<S> {
    pub fn when(self, value: &Column<S>) -> CaseWhen<S> {
        CaseWhen {
            on: Some(self.on),
            when: vec![value.as_any().clone()],
            _marker: PhantomData,
        }
    }
}

/// First WHEN given; the first THEN fixes the result type
pub struct CaseWhen<S> {
    on: Option<AnyColumn>,
    when: Vec<AnyColumn>,
    _marker: PhantomData<S>,
}

impl<S: ColumnValue> CaseWhen<S> {
    pub fn then<T: ColumnValue>(self, result: &Column<T>) -> CaseThen<S, T> {
        CaseThen {
            on: self.on,
            when: self.when,
            then: vec![result.as_any().clone()],
            _marker: PhantomData,
        }
    }
}

pub struct CaseThen<S, T> {
    on: Option<AnyColumn>,
    when: Vec<AnyColumn>,
    then: Vec<AnyColumn>,
    _marker: PhantomData<(S, T)>,
}

impl<S: ColumnValue, T: ColumnValue> CaseThen<S, T> {
    pub fn when(self, value: &Column<S>) -> CaseNextWhen<S, T> {
        let mut when = self.when;
        when.push(value.as_any().clone());
        CaseNextWhen {
            on: self.on,
            when,
            then: self.then,
            _marker: PhantomData,
        }
    }

    pub fn else_(self, result: &Column<T>) -> Column<T> {
        CaseExpression::<T>::new(self.on, self.when, self.then, result.as_any().clone())
            .make_column()
    }
}

pub struct CaseNextWhen<S, T> {
    on: Option<AnyColumn>,
    when: Vec<AnyColumn>,
    then: Vec<AnyColumn>,
    _marker: PhantomData<(S, T)>,
}

impl<S: ColumnValue, T: ColumnValue> CaseNextWhen<S, T> {
    pub fn then(self, result: &Column<T>) -> CaseThen<S, T> {
        let mut then = self.then;
        then.push(result.as_any().clone());
        CaseThen {
            on: self.on,
            when: self.when,
            then,
            _marker: PhantomData,
        }
    }
}
