use crate::data::{DataType, Value};
use crate::expression::{ExpressionError, ExpressionResult};
use crate::model::{Model, ModelId};

/// In-memory rows belonging to one model
#[derive(Debug, Clone)]
pub struct DataSet {
    model: ModelId,
    schema: Vec<DataType>,
    rows: Vec<Vec<Value>>,
}

impl DataSet {
    pub fn new(model: &Model) -> Self {
        Self {
            model: model.id(),
            schema: model.schema(),
            rows: Vec::new(),
        }
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn schema(&self) -> &[DataType] {
        &self.schema
    }

    /// Append a row and return its ordinal
    pub fn add_row(&mut self, values: Vec<Value>) -> ExpressionResult<usize> {
        if values.len() != self.schema.len() {
            return Err(ExpressionError::RowArity {
                expected: self.schema.len(),
                actual: values.len(),
            });
        }
        for (value, data_type) in values.iter().zip(self.schema.iter()) {
            if !value.is_compatible_with(*data_type) {
                return Err(ExpressionError::TypeMismatch {
                    expected: *data_type,
                    actual: value.data_type(),
                    context: "data set row".to_string(),
                });
            }
        }
        self.rows.push(values);
        Ok(self.rows.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, ordinal: usize) -> Option<DataRow<'_>> {
        if ordinal < self.rows.len() {
            Some(DataRow {
                data_set: self,
                ordinal,
            })
        } else {
            None
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = DataRow<'_>> + '_ {
        (0..self.rows.len()).map(move |ordinal| DataRow {
            data_set: self,
            ordinal,
        })
    }
}

/// Handle to a single row of a `DataSet`
#[derive(Debug, Clone, Copy)]
pub struct DataRow<'a> {
    data_set: &'a DataSet,
    ordinal: usize,
}

impl<'a> DataRow<'a> {
    pub fn data_set(&self) -> &'a DataSet {
        self.data_set
    }

    pub fn model(&self) -> ModelId {
        self.data_set.model
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Value stored at the given column ordinal
    pub fn value(&self, column_ordinal: usize) -> Option<&'a Value> {
        self.data_set.rows[self.ordinal].get(column_ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product_model() -> Model {
        let mut model = Model::new("Product");
        model.add_column::<i32>("ProductID");
        model.add_column::<String>("Name");
        model
    }

    #[test]
    fn test_add_and_read_rows() {
        let model = product_model();
        let mut data_set = DataSet::new(&model);
        assert!(data_set.is_empty());

        let first = data_set
            .add_row(vec![Value::Int32(1), Value::String("Bike".to_string())])
            .unwrap();
        data_set
            .add_row(vec![Value::Int32(2), Value::Null])
            .unwrap();

        assert_eq!(first, 0);
        assert_eq!(data_set.len(), 2);

        let row = data_set.row(1).unwrap();
        assert_eq!(row.model(), model.id());
        assert_eq!(row.value(0), Some(&Value::Int32(2)));
        assert_eq!(row.value(1), Some(&Value::Null));
        assert_eq!(row.value(2), None);
        assert!(data_set.row(2).is_none());
        assert_eq!(data_set.rows().count(), 2);
    }

    #[test]
    fn test_add_row_validation() {
        let model = product_model();
        let mut data_set = DataSet::new(&model);

        assert!(matches!(
            data_set.add_row(vec![Value::Int32(1)]),
            Err(ExpressionError::RowArity {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            data_set.add_row(vec![Value::String("x".to_string()), Value::Null]),
            Err(ExpressionError::TypeMismatch { .. })
        ));
        assert!(data_set.is_empty());
    }
}
