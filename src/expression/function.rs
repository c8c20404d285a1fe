//! Function identities used by function-call nodes.

use crate::data::DataType;
use crate::expression::{ExpressionError, ExpressionResult};
use std::fmt;

/// Identity of a function called from an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FunctionKey {
    // Aggregates
    Count,
    /// `COUNT(*)`: takes no parameters
    CountRows,
    Sum,
    Avg,
    Min,
    Max,

    // Scalars
    Coalesce,
    Upper,
    Lower,
    Length,
    Abs,

    /// A function the crate knows nothing about; emitted verbatim in SQL
    Custom(String),
}

impl FunctionKey {
    /// Create a key for a user-defined function
    pub fn custom(name: impl Into<String>) -> ExpressionResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ExpressionError::InvalidFunctionKey);
        }
        Ok(FunctionKey::Custom(name))
    }

    pub fn name(&self) -> &str {
        match self {
            FunctionKey::Count | FunctionKey::CountRows => "COUNT",
            FunctionKey::Sum => "SUM",
            FunctionKey::Avg => "AVG",
            FunctionKey::Min => "MIN",
            FunctionKey::Max => "MAX",
            FunctionKey::Coalesce => "COALESCE",
            FunctionKey::Upper => "UPPER",
            FunctionKey::Lower => "LOWER",
            FunctionKey::Length => "LENGTH",
            FunctionKey::Abs => "ABS",
            FunctionKey::Custom(name) => name,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            FunctionKey::Count
                | FunctionKey::CountRows
                | FunctionKey::Sum
                | FunctionKey::Avg
                | FunctionKey::Min
                | FunctionKey::Max
        )
    }

    /// Check the number of parameters passed to this function
    pub fn check_arity(&self, actual: usize) -> ExpressionResult<()> {
        let (valid, expected) = match self {
            FunctionKey::CountRows => (actual == 0, "0"),
            FunctionKey::Coalesce => (actual >= 1, "at least 1"),
            FunctionKey::Custom(_) => (true, "any"),
            _ => (actual == 1, "1"),
        };
        if valid {
            Ok(())
        } else {
            Err(ExpressionError::FunctionArgumentCount {
                function: self.name().to_string(),
                expected: expected.to_string(),
                actual,
            })
        }
    }

    /// Result type given the parameter types; `None` when it cannot be known
    pub fn output_type(&self, params: &[Option<DataType>]) -> Option<DataType> {
        match self {
            FunctionKey::Count | FunctionKey::CountRows | FunctionKey::Length => {
                Some(DataType::Int32)
            }
            FunctionKey::Avg => Some(DataType::Double),
            FunctionKey::Upper | FunctionKey::Lower => Some(DataType::Varchar),
            FunctionKey::Sum | FunctionKey::Min | FunctionKey::Max | FunctionKey::Abs => {
                params.first().copied().flatten()
            }
            FunctionKey::Coalesce => params.iter().copied().flatten().next(),
            FunctionKey::Custom(_) => None,
        }
    }
}

impl fmt::Display for FunctionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
