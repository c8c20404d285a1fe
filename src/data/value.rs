use crate::expression::{ExpressionError, ExpressionResult};
use std::fmt;

/// Data types a column can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Double,
    Varchar,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64 | DataType::Double)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64)
    }

    /// The wider of two numeric types (Int32 < Int64 < Double)
    pub fn wider_numeric(self, other: DataType) -> Option<DataType> {
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        Some(self.max(other))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "Boolean",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Double => "Double",
            DataType::Varchar => "Varchar",
        };
        f.write_str(name)
    }
}

/// A single scalar value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
}

impl Value {
    /// Get the data type of this value
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Double(_) => Some(DataType::Double),
            Value::String(_) => Some(DataType::Varchar),
        }
    }

    /// Check if this value can be stored in a column of the given data type
    pub fn is_compatible_with(&self, data_type: DataType) -> bool {
        match (self, data_type) {
            (Value::Null, _) => true, // NULL is compatible with any type
            (Value::Boolean(_), DataType::Boolean) => true,
            (Value::Int32(_), DataType::Int32) => true,
            (Value::Int64(_), DataType::Int64) => true,
            (Value::Double(_), DataType::Double) => true,
            (Value::String(_), DataType::Varchar) => true,
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl<T: ColumnValue> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(ColumnValue::into_value).unwrap_or(Value::Null)
    }
}

/// Rust types that can back a typed column.
///
/// `from_value` maps NULL to `None` and widens integers where no precision is
/// lost; every other mismatch is an error.
pub trait ColumnValue: Clone + fmt::Debug + PartialEq + 'static {
    const DATA_TYPE: DataType;

    fn into_value(self) -> Value;

    fn from_value(value: Value) -> ExpressionResult<Option<Self>>;
}

/// Types that support arithmetic operators
pub trait NumericValue: ColumnValue {}

/// Types that support bitwise operators
pub trait IntegerValue: NumericValue {}

fn mismatch(expected: DataType, value: &Value) -> ExpressionError {
    ExpressionError::TypeMismatch {
        expected,
        actual: value.data_type(),
        context: "column value conversion".to_string(),
    }
}

impl ColumnValue for bool {
    const DATA_TYPE: DataType = DataType::Boolean;

    fn into_value(self) -> Value {
        Value::Boolean(self)
    }

    fn from_value(value: Value) -> ExpressionResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Boolean(b) => Ok(Some(b)),
            other => Err(mismatch(Self::DATA_TYPE, &other)),
        }
    }
}

impl ColumnValue for i32 {
    const DATA_TYPE: DataType = DataType::Int32;

    fn into_value(self) -> Value {
        Value::Int32(self)
    }

    fn from_value(value: Value) -> ExpressionResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Int32(n) => Ok(Some(n)),
            other => Err(mismatch(Self::DATA_TYPE, &other)),
        }
    }
}

impl ColumnValue for i64 {
    const DATA_TYPE: DataType = DataType::Int64;

    fn into_value(self) -> Value {
        Value::Int64(self)
    }

    fn from_value(value: Value) -> ExpressionResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Int32(n) => Ok(Some(n as i64)),
            Value::Int64(n) => Ok(Some(n)),
            other => Err(mismatch(Self::DATA_TYPE, &other)),
        }
    }
}

impl ColumnValue for f64 {
    const DATA_TYPE: DataType = DataType::Double;

    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn from_value(value: Value) -> ExpressionResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Int32(n) => Ok(Some(n as f64)),
            Value::Int64(n) => Ok(Some(n as f64)),
            Value::Double(n) => Ok(Some(n)),
            other => Err(mismatch(Self::DATA_TYPE, &other)),
        }
    }
}

impl ColumnValue for String {
    const DATA_TYPE: DataType = DataType::Varchar;

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: Value) -> ExpressionResult<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Err(mismatch(Self::DATA_TYPE, &other)),
        }
    }
}

impl NumericValue for i32 {}
impl NumericValue for i64 {}
impl NumericValue for f64 {}

impl IntegerValue for i32 {}
impl IntegerValue for i64 {}
