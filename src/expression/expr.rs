//! Expression IR definitions.
//!
//! A `DbExpression` is a cheap-to-clone handle: every variant holds its node
//! behind an `Rc`, so rewriting passes can share untouched subtrees and hand
//! back the very same node when nothing changes. Nodes never change after
//! construction.

use crate::data::{DataType, Value};
use crate::expression::function::FunctionKey;
use crate::expression::operator::{BinaryOperator, UnaryOperator};
use crate::expression::visitor::DbExpressionVisitor;
use crate::expression::{ExpressionError, ExpressionResult};
use crate::model::ColumnId;
use std::rc::Rc;

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum DbExpression {
    Binary(Rc<DbBinaryExpression>),
    Unary(Rc<DbUnaryExpression>),
    Case(Rc<DbCaseExpression>),
    Cast(Rc<DbCastExpression>),
    Column(Rc<DbColumnExpression>),
    Constant(Rc<DbConstantExpression>),
    Function(Rc<DbFunctionExpression>),
    Param(Rc<DbParamExpression>),
}

#[derive(Debug, PartialEq)]
pub struct DbBinaryExpression {
    kind: BinaryOperator,
    left: DbExpression,
    right: DbExpression,
}

impl DbBinaryExpression {
    pub fn kind(&self) -> BinaryOperator {
        self.kind
    }

    pub fn left(&self) -> &DbExpression {
        &self.left
    }

    pub fn right(&self) -> &DbExpression {
        &self.right
    }
}

#[derive(Debug, PartialEq)]
pub struct DbUnaryExpression {
    kind: UnaryOperator,
    operand: DbExpression,
}

impl DbUnaryExpression {
    pub fn kind(&self) -> UnaryOperator {
        self.kind
    }

    pub fn operand(&self) -> &DbExpression {
        &self.operand
    }
}

/// `CASE [on] WHEN .. THEN .. ELSE .. END`
///
/// With an `on` expression each WHEN value is compared against it; without
/// one each WHEN is a Boolean condition.
#[derive(Debug, PartialEq)]
pub struct DbCaseExpression {
    on: Option<DbExpression>,
    when: Vec<DbExpression>,
    then: Vec<DbExpression>,
    else_expr: DbExpression,
}

impl DbCaseExpression {
    pub fn on(&self) -> Option<&DbExpression> {
        self.on.as_ref()
    }

    pub fn when(&self) -> &[DbExpression] {
        &self.when
    }

    pub fn then(&self) -> &[DbExpression] {
        &self.then
    }

    pub fn else_expr(&self) -> &DbExpression {
        &self.else_expr
    }

    /// WHEN/THEN pairs in order
    pub fn branches(&self) -> impl Iterator<Item = (&DbExpression, &DbExpression)> {
        self.when.iter().zip(self.then.iter())
    }
}

#[derive(Debug, PartialEq)]
pub struct DbCastExpression {
    operand: DbExpression,
    source_type: DataType,
    target_type: DataType,
}

impl DbCastExpression {
    pub fn operand(&self) -> &DbExpression {
        &self.operand
    }

    pub fn source_type(&self) -> DataType {
        self.source_type
    }

    pub fn target_type(&self) -> DataType {
        self.target_type
    }
}

/// Reference to a stored column. Identity only; the column is looked up by id.
#[derive(Debug, PartialEq)]
pub struct DbColumnExpression {
    column: ColumnId,
    name: String,
    data_type: DataType,
}

impl DbColumnExpression {
    pub fn column(&self) -> ColumnId {
        self.column
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

#[derive(Debug, PartialEq)]
pub struct DbConstantExpression {
    value: Value,
    data_type: DataType,
}

impl DbConstantExpression {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

#[derive(Debug, PartialEq)]
pub struct DbFunctionExpression {
    key: FunctionKey,
    params: Vec<DbExpression>,
}

impl DbFunctionExpression {
    pub fn key(&self) -> &FunctionKey {
        &self.key
    }

    pub fn params(&self) -> &[DbExpression] {
        &self.params
    }
}

/// A value bound late, at statement execution, instead of inlined as a literal
#[derive(Debug, PartialEq)]
pub struct DbParamExpression {
    name: String,
    value: Value,
    data_type: DataType,
}

impl DbParamExpression {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl DbExpression {
    /// Create a binary operation expression
    pub fn binary(kind: BinaryOperator, left: DbExpression, right: DbExpression) -> Self {
        DbExpression::Binary(Rc::new(DbBinaryExpression { kind, left, right }))
    }

    /// Create a unary operation expression
    pub fn unary(kind: UnaryOperator, operand: DbExpression) -> Self {
        DbExpression::Unary(Rc::new(DbUnaryExpression { kind, operand }))
    }

    /// Create a CASE expression; `when` and `then` must pair up
    pub fn case(
        on: Option<DbExpression>,
        when: Vec<DbExpression>,
        then: Vec<DbExpression>,
        else_expr: DbExpression,
    ) -> ExpressionResult<Self> {
        if when.len() != then.len() || when.is_empty() {
            return Err(ExpressionError::CaseArityMismatch {
                when: when.len(),
                then: then.len(),
            });
        }
        Ok(Self::case_unchecked(on, when, then, else_expr))
    }

    /// Callers guarantee `when.len() == then.len()`
    pub(crate) fn case_unchecked(
        on: Option<DbExpression>,
        when: Vec<DbExpression>,
        then: Vec<DbExpression>,
        else_expr: DbExpression,
    ) -> Self {
        debug_assert_eq!(when.len(), then.len());
        DbExpression::Case(Rc::new(DbCaseExpression {
            on,
            when,
            then,
            else_expr,
        }))
    }

    pub fn cast(operand: DbExpression, source_type: DataType, target_type: DataType) -> Self {
        DbExpression::Cast(Rc::new(DbCastExpression {
            operand,
            source_type,
            target_type,
        }))
    }

    /// Create a column reference expression
    pub fn column(column: ColumnId, name: impl Into<String>, data_type: DataType) -> Self {
        DbExpression::Column(Rc::new(DbColumnExpression {
            column,
            name: name.into(),
            data_type,
        }))
    }

    /// Create a literal expression
    pub fn constant(value: Value, data_type: DataType) -> Self {
        debug_assert!(value.is_compatible_with(data_type));
        DbExpression::Constant(Rc::new(DbConstantExpression { value, data_type }))
    }

    pub fn param(name: impl Into<String>, value: Value, data_type: DataType) -> Self {
        DbExpression::Param(Rc::new(DbParamExpression {
            name: name.into(),
            value,
            data_type,
        }))
    }

    /// Create a function call expression, checking the key and arity
    pub fn function(key: FunctionKey, params: Vec<DbExpression>) -> ExpressionResult<Self> {
        if let FunctionKey::Custom(name) = &key {
            if name.trim().is_empty() {
                return Err(ExpressionError::InvalidFunctionKey);
            }
        }
        key.check_arity(params.len())?;
        Ok(Self::function_unchecked(key, params))
    }

    /// Callers guarantee a valid key and arity
    pub(crate) fn function_unchecked(key: FunctionKey, params: Vec<DbExpression>) -> Self {
        DbExpression::Function(Rc::new(DbFunctionExpression { key, params }))
    }

    pub fn and(left: DbExpression, right: DbExpression) -> Self {
        Self::binary(BinaryOperator::And, left, right)
    }

    pub fn eq(left: DbExpression, right: DbExpression) -> Self {
        Self::binary(BinaryOperator::Eq, left, right)
    }

    /// Double-dispatch into the visitor method for this variant
    pub fn accept<V>(&self, visitor: &mut V) -> V::Output
    where
        V: DbExpressionVisitor + ?Sized,
    {
        match self {
            DbExpression::Binary(e) => visitor.visit_binary(e),
            DbExpression::Unary(e) => visitor.visit_unary(e),
            DbExpression::Case(e) => visitor.visit_case(e),
            DbExpression::Cast(e) => visitor.visit_cast(e),
            DbExpression::Column(e) => visitor.visit_column(e),
            DbExpression::Constant(e) => visitor.visit_constant(e),
            DbExpression::Function(e) => visitor.visit_function(e),
            DbExpression::Param(e) => visitor.visit_param(e),
        }
    }

    /// Check if this expression reads no column
    pub fn is_constant(&self) -> bool {
        match self {
            DbExpression::Constant(_) | DbExpression::Param(_) => true,
            DbExpression::Column(_) => false,
            DbExpression::Binary(e) => e.left.is_constant() && e.right.is_constant(),
            DbExpression::Unary(e) => e.operand.is_constant(),
            DbExpression::Cast(e) => e.operand.is_constant(),
            DbExpression::Function(e) => {
                e.key != FunctionKey::CountRows && e.params.iter().all(|p| p.is_constant())
            }
            DbExpression::Case(e) => {
                e.on.as_ref().map(|on| on.is_constant()).unwrap_or(true)
                    && e.when.iter().all(|w| w.is_constant())
                    && e.then.iter().all(|t| t.is_constant())
                    && e.else_expr.is_constant()
            }
        }
    }

    /// Same node instance, not just structurally equal
    pub fn ptr_eq(&self, other: &DbExpression) -> bool {
        match (self, other) {
            (DbExpression::Binary(a), DbExpression::Binary(b)) => Rc::ptr_eq(a, b),
            (DbExpression::Unary(a), DbExpression::Unary(b)) => Rc::ptr_eq(a, b),
            (DbExpression::Case(a), DbExpression::Case(b)) => Rc::ptr_eq(a, b),
            (DbExpression::Cast(a), DbExpression::Cast(b)) => Rc::ptr_eq(a, b),
            (DbExpression::Column(a), DbExpression::Column(b)) => Rc::ptr_eq(a, b),
            (DbExpression::Constant(a), DbExpression::Constant(b)) => Rc::ptr_eq(a, b),
            (DbExpression::Function(a), DbExpression::Function(b)) => Rc::ptr_eq(a, b),
            (DbExpression::Param(a), DbExpression::Param(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
