//! Primary key and unique constraint metadata consumed by DDL generation.

use crate::column::AnyColumn;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// A column with a sort direction, as used in keys and ORDER BY
#[derive(Debug, Clone)]
pub struct ColumnSort {
    pub column: AnyColumn,
    pub direction: SortDirection,
}

impl ColumnSort {
    pub fn new(column: AnyColumn, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Primary,
    Unique,
}

/// Information about a key constraint
#[derive(Debug, Clone)]
pub struct KeyConstraint {
    pub kind: KeyKind,
    /// Constraint name used in DDL
    pub name: String,
    /// Key columns in key order
    pub columns: Vec<ColumnSort>,
    /// Only meaningful for SQL Server
    pub clustered: bool,
}

impl KeyConstraint {
    /// Check whether a stored column ordinal is part of this key
    pub fn contains_ordinal(&self, ordinal: usize) -> bool {
        self.columns
            .iter()
            .any(|sort| sort.column.id().map(|id| id.ordinal) == Some(ordinal))
    }
}

impl fmt::Display for KeyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            KeyKind::Primary => "PRIMARY KEY",
            KeyKind::Unique => "UNIQUE",
        };
        let columns = self
            .columns
            .iter()
            .map(|sort| format!("{} {}", sort.column.name(), sort.direction.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} {} ({})", kind, self.name, columns)
    }
}
