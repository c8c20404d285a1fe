//! Registry of column factories keyed by data type.
//!
//! Some columns are only known by `DataType` at runtime, like the output
//! columns of a select statement. The registry maps each type to a function
//! that builds the matching typed `Column<T>`.

use crate::column::{AnyColumn, Column, ColumnSource};
use crate::data::{ColumnValue, DataType};
use crate::expression::{ExpressionError, ExpressionResult};
use dashmap::DashMap;
use log::debug;
use std::sync::OnceLock;

/// Builds a column of one concrete type
pub type ColumnFactory = fn(String, ColumnSource) -> AnyColumn;

fn make_typed<T: ColumnValue>(name: String, source: ColumnSource) -> AnyColumn {
    Column::<T>::from_source(name, source).into_any()
}

pub struct ColumnRegistry {
    factories: DashMap<DataType, ColumnFactory>,
}

impl ColumnRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    pub fn with_builtin_types() -> Self {
        let registry = Self::new();
        registry.register::<bool>();
        registry.register::<i32>();
        registry.register::<i64>();
        registry.register::<f64>();
        registry.register::<String>();
        registry
    }

    /// The process-wide registry, populated with the built-in types on first use
    pub fn global() -> &'static ColumnRegistry {
        static REGISTRY: OnceLock<ColumnRegistry> = OnceLock::new();
        REGISTRY.get_or_init(Self::with_builtin_types)
    }

    pub fn register<T: ColumnValue>(&self) {
        debug!("Registering column factory for {}", T::DATA_TYPE);
        self.factories.insert(T::DATA_TYPE, make_typed::<T>);
    }

    pub fn is_registered(&self, data_type: DataType) -> bool {
        self.factories.contains_key(&data_type)
    }

    pub fn make_column(
        &self,
        data_type: DataType,
        name: String,
        source: ColumnSource,
    ) -> ExpressionResult<AnyColumn> {
        let factory = self
            .factories
            .get(&data_type)
            .map(|entry| *entry.value())
            .ok_or(ExpressionError::UnregisteredColumnType(data_type))?;
        Ok(factory(name, source))
    }
}

impl Default for ColumnRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnId, ModelId};
    use std::thread;

    #[test]
    fn test_global_registry_has_builtin_types() {
        let registry = ColumnRegistry::global();
        for data_type in [
            DataType::Boolean,
            DataType::Int32,
            DataType::Int64,
            DataType::Double,
            DataType::Varchar,
        ] {
            assert!(registry.is_registered(data_type));
        }
        assert!(std::ptr::eq(registry, ColumnRegistry::global()));
    }

    #[test]
    fn test_make_column() {
        let registry = ColumnRegistry::with_builtin_types();
        let id = ColumnId::new(ModelId(9), 2);
        let column = registry
            .make_column(DataType::Double, "Freight".to_string(), ColumnSource::Stored(id))
            .unwrap();

        assert_eq!(column.name(), "Freight");
        assert_eq!(column.data_type(), DataType::Double);
        assert_eq!(column.id(), Some(id));
        assert!(column.typed::<f64>().is_ok());
    }

    #[test]
    fn test_unregistered_type() {
        let registry = ColumnRegistry::new();
        let source = ColumnSource::Stored(ColumnId::new(ModelId(1), 0));
        assert!(matches!(
            registry.make_column(DataType::Int32, "X".to_string(), source),
            Err(ExpressionError::UnregisteredColumnType(DataType::Int32))
        ));

        registry.register::<i32>();
        assert!(registry.is_registered(DataType::Int32));
        assert!(!registry.is_registered(DataType::Varchar));
    }

    #[test]
    fn test_concurrent_first_access() {
        let handles: Vec<_> = (0..4)
            .map(|_| thread::spawn(|| ColumnRegistry::global().is_registered(DataType::Int64)))
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
