//! Models: named row shapes that own stored columns and key metadata.

pub mod key;
pub mod model_set;

pub use key::{ColumnSort, KeyConstraint, KeyKind, SortDirection};
pub use model_set::ModelSet;

use crate::column::{AnyColumn, Column, ColumnRegistry, ColumnSource};
use crate::data::{ColumnValue, DataType};
use crate::expression::ExpressionResult;
use anyhow::{bail, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_MODEL_ID: AtomicU32 = AtomicU32::new(1);

/// Unique identifier for a model, allocated per process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u32);

impl ModelId {
    fn next() -> Self {
        ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of a stored column: its model and zero-based ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId {
    pub model: ModelId,
    pub ordinal: usize,
}

impl ColumnId {
    pub fn new(model: ModelId, ordinal: usize) -> Self {
        Self { model, ordinal }
    }
}

#[derive(Debug)]
pub struct Model {
    id: ModelId,
    name: String,
    columns: Vec<AnyColumn>,
    primary_key: Option<KeyConstraint>,
    unique_constraints: Vec<KeyConstraint>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ModelId::next(),
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            unique_constraints: Vec::new(),
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn next_column_id(&self) -> ColumnId {
        ColumnId::new(self.id, self.columns.len())
    }

    /// Append a stored column at the next ordinal
    pub fn add_column<T: ColumnValue>(&mut self, name: impl Into<String>) -> Column<T> {
        let source = ColumnSource::Stored(self.next_column_id());
        let column = Column::<T>::from_source(name.into(), source);
        self.columns.push(column.as_any().clone());
        column
    }

    /// Append a stored column whose type is only known at runtime
    pub fn add_column_of_type(
        &mut self,
        name: impl Into<String>,
        data_type: DataType,
    ) -> ExpressionResult<AnyColumn> {
        let source = ColumnSource::Stored(self.next_column_id());
        let column = ColumnRegistry::global().make_column(data_type, name.into(), source)?;
        self.columns.push(column.clone());
        Ok(column)
    }

    pub fn columns(&self) -> &[AnyColumn] {
        &self.columns
    }

    pub fn column(&self, ordinal: usize) -> Option<&AnyColumn> {
        self.columns.get(ordinal)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&AnyColumn> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Column types in ordinal order
    pub fn schema(&self) -> Vec<DataType> {
        self.columns.iter().map(|c| c.data_type()).collect()
    }

    pub fn primary_key(&self) -> Option<&KeyConstraint> {
        self.primary_key.as_ref()
    }

    pub fn unique_constraints(&self) -> &[KeyConstraint] {
        &self.unique_constraints
    }

    /// Whether a column is part of the primary key or a unique constraint
    pub fn is_key_column(&self, ordinal: usize) -> bool {
        self.primary_key
            .iter()
            .chain(self.unique_constraints.iter())
            .any(|key| key.contains_ordinal(ordinal))
    }

    pub fn is_primary_key_column(&self, ordinal: usize) -> bool {
        self.primary_key
            .as_ref()
            .map_or(false, |key| key.contains_ordinal(ordinal))
    }

    pub fn set_primary_key(
        &mut self,
        name: impl Into<String>,
        columns: Vec<ColumnSort>,
        clustered: bool,
    ) -> Result<()> {
        let key = self.validate_key(KeyKind::Primary, name.into(), columns, clustered)?;
        if let Some(existing) = &self.primary_key {
            log::debug!(
                "Replacing primary key {} on model {}",
                existing.name,
                self.name
            );
        }
        self.primary_key = Some(key);
        Ok(())
    }

    pub fn add_unique_constraint(
        &mut self,
        name: impl Into<String>,
        columns: Vec<ColumnSort>,
        clustered: bool,
    ) -> Result<()> {
        let key = self.validate_key(KeyKind::Unique, name.into(), columns, clustered)?;
        if self.unique_constraints.iter().any(|k| k.name == key.name) {
            bail!("Duplicate constraint name {} on model {}", key.name, self.name);
        }
        self.unique_constraints.push(key);
        Ok(())
    }

    fn validate_key(
        &self,
        kind: KeyKind,
        name: String,
        columns: Vec<ColumnSort>,
        clustered: bool,
    ) -> Result<KeyConstraint> {
        if name.trim().is_empty() {
            bail!("Key constraint on model {} has an empty name", self.name);
        }
        if columns.is_empty() {
            bail!("Key constraint {} has no columns", name);
        }

        let mut seen = HashSet::new();
        for sort in &columns {
            let id = match sort.column.id() {
                Some(id) if id.model == self.id => id,
                _ => bail!(
                    "Column {} of key {} is not a stored column of model {}",
                    sort.column.name(),
                    name,
                    self.name
                ),
            };
            if !seen.insert(id.ordinal) {
                bail!("Column {} appears twice in key {}", sort.column.name(), name);
            }
        }

        Ok(KeyConstraint {
            kind,
            name,
            columns,
            clustered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> (Model, Column<i32>, Column<String>, Column<f64>) {
        let mut model = Model::new("Product");
        let id = model.add_column::<i32>("ProductID");
        let name = model.add_column::<String>("Name");
        let price = model.add_column::<f64>("ListPrice");
        (model, id, name, price)
    }

    #[test]
    fn test_model_ids_are_unique() {
        let a = Model::new("A");
        let b = Model::new("A");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_columns() {
        let (model, id, name, price) = product();

        assert_eq!(model.columns().len(), 3);
        assert_eq!(id.id(), Some(ColumnId::new(model.id(), 0)));
        assert_eq!(name.id(), Some(ColumnId::new(model.id(), 1)));
        assert_eq!(price.id(), Some(ColumnId::new(model.id(), 2)));
        assert_eq!(
            model.schema(),
            vec![DataType::Int32, DataType::Varchar, DataType::Double]
        );
        assert_eq!(model.column_by_name("Name").map(|c| c.data_type()), Some(DataType::Varchar));
        assert!(model.column_by_name("Missing").is_none());
        assert!(model.column(1).unwrap().ptr_eq(name.as_any()));
    }

    #[test]
    fn test_add_column_of_type() -> Result<()> {
        let mut model = Model::new("Derived");
        let column = model.add_column_of_type("Total", DataType::Int64)?;
        assert_eq!(column.data_type(), DataType::Int64);
        assert_eq!(column.id(), Some(ColumnId::new(model.id(), 0)));
        assert!(column.typed::<i64>().is_ok());
        Ok(())
    }

    #[test]
    fn test_primary_key() -> Result<()> {
        let (mut model, id, name, _) = product();

        model.set_primary_key("PK_Product", vec![id.asc()], true)?;
        model.add_unique_constraint("UK_Product_Name", vec![name.asc()], false)?;

        let pk = model.primary_key().unwrap();
        assert_eq!(pk.kind, KeyKind::Primary);
        assert!(pk.clustered);
        assert!(model.is_key_column(0));
        assert!(model.is_key_column(1));
        assert!(!model.is_key_column(2));
        assert!(model.is_primary_key_column(0));
        assert!(!model.is_primary_key_column(1));
        assert_eq!(pk.to_string(), "PRIMARY KEY PK_Product (ProductID ASC)");
        Ok(())
    }

    #[test]
    fn test_invalid_keys() {
        let (mut model, id, name, price) = product();
        let other = Model::new("Other").add_column::<i32>("X");

        assert!(model.set_primary_key("PK", vec![], false).is_err());
        assert!(model
            .set_primary_key("PK", vec![id.asc(), id.desc()], false)
            .is_err());
        assert!(model.set_primary_key("PK", vec![other.asc()], false).is_err());

        // Computed columns cannot be key columns
        let doubled = price.clone() * Column::value(2.0);
        assert!(model.add_unique_constraint("UK", vec![doubled.asc()], false).is_err());

        assert!(model.add_unique_constraint("UK", vec![name.asc()], false).is_ok());
        assert!(model.add_unique_constraint("UK", vec![id.asc()], false).is_err());
        assert!(model.primary_key().is_none());
    }
}
