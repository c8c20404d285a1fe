//! Operator overloads and comparison methods that compose columns.
//!
//! Arithmetic needs a numeric column type and bitwise operators an integer
//! one, so `name + 1` on a string column does not compile. Operators are
//! implemented for both owned columns and references.

use crate::column::{BinaryExpression, CastExpression, Column, TypedExpression, UnaryExpression};
use crate::data::{ColumnValue, IntegerValue, NumericValue};
use crate::expression::{BinaryOperator, UnaryOperator};
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Sub};

fn binary<S: ColumnValue, T: ColumnValue>(
    kind: BinaryOperator,
    left: &Column<S>,
    right: &Column<S>,
) -> Column<T> {
    BinaryExpression::<T>::new(kind, left.as_any().clone(), right.as_any().clone()).make_column()
}

fn unary<S: ColumnValue, T: ColumnValue>(kind: UnaryOperator, operand: &Column<S>) -> Column<T> {
    UnaryExpression::<T>::new(kind, operand.as_any().clone()).make_column()
}

macro_rules! binary_operator {
    ($trait:ident, $method:ident, $kind:expr, $bound:ident) => {
        impl<T: $bound> $trait for Column<T> {
            type Output = Column<T>;

            fn $method(self, rhs: Column<T>) -> Column<T> {
                binary($kind, &self, &rhs)
            }
        }

        impl<'a, T: $bound> $trait<&'a Column<T>> for &'a Column<T> {
            type Output = Column<T>;

            fn $method(self, rhs: &'a Column<T>) -> Column<T> {
                binary($kind, self, rhs)
            }
        }
    };
}

binary_operator!(Add, add, BinaryOperator::Add, NumericValue);
binary_operator!(Sub, sub, BinaryOperator::Sub, NumericValue);
binary_operator!(Mul, mul, BinaryOperator::Mul, NumericValue);
binary_operator!(Div, div, BinaryOperator::Div, NumericValue);
binary_operator!(Rem, rem, BinaryOperator::Mod, NumericValue);
binary_operator!(BitAnd, bitand, BinaryOperator::BitwiseAnd, IntegerValue);
binary_operator!(BitOr, bitor, BinaryOperator::BitwiseOr, IntegerValue);
binary_operator!(BitXor, bitxor, BinaryOperator::BitwiseXor, IntegerValue);

impl<T: NumericValue> Neg for Column<T> {
    type Output = Column<T>;

    fn neg(self) -> Column<T> {
        unary(UnaryOperator::Negate, &self)
    }
}

impl<T: NumericValue> Neg for &Column<T> {
    type Output = Column<T>;

    fn neg(self) -> Column<T> {
        unary(UnaryOperator::Negate, self)
    }
}

impl Not for Column<bool> {
    type Output = Column<bool>;

    fn not(self) -> Column<bool> {
        unary(UnaryOperator::Not, &self)
    }
}

impl Not for &Column<bool> {
    type Output = Column<bool>;

    fn not(self) -> Column<bool> {
        unary(UnaryOperator::Not, self)
    }
}

impl<T: ColumnValue> Column<T> {
    pub fn equal(&self, other: &Column<T>) -> Column<bool> {
        binary(BinaryOperator::Eq, self, other)
    }

    pub fn not_equal(&self, other: &Column<T>) -> Column<bool> {
        binary(BinaryOperator::Ne, self, other)
    }

    pub fn less_than(&self, other: &Column<T>) -> Column<bool> {
        binary(BinaryOperator::Lt, self, other)
    }

    pub fn less_than_or_equal(&self, other: &Column<T>) -> Column<bool> {
        binary(BinaryOperator::Le, self, other)
    }

    pub fn greater_than(&self, other: &Column<T>) -> Column<bool> {
        binary(BinaryOperator::Gt, self, other)
    }

    pub fn greater_than_or_equal(&self, other: &Column<T>) -> Column<bool> {
        binary(BinaryOperator::Ge, self, other)
    }

    pub fn is_null(&self) -> Column<bool> {
        unary(UnaryOperator::IsNull, self)
    }

    pub fn is_not_null(&self) -> Column<bool> {
        unary(UnaryOperator::IsNotNull, self)
    }

    /// Convert to another column type
    pub fn cast<U: ColumnValue>(&self) -> Column<U> {
        CastExpression::<U>::new(self.as_any().clone()).make_column()
    }
}

impl<T: IntegerValue> Column<T> {
    /// Bitwise NOT
    pub fn ones_complement(&self) -> Column<T> {
        unary(UnaryOperator::OnesComplement, self)
    }
}

impl Column<bool> {
    pub fn and(&self, other: &Column<bool>) -> Column<bool> {
        binary(BinaryOperator::And, self, other)
    }

    pub fn or(&self, other: &Column<bool>) -> Column<bool> {
        binary(BinaryOperator::Or, self, other)
    }
}

impl Column<String> {
    pub fn concat(&self, other: &Column<String>) -> Column<String> {
        binary(BinaryOperator::Concat, self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{DataSet, DataType, Value};
    use crate::expression::DbExpression;
    use crate::model::{Model, ModelSet};

    fn product() -> (Model, Column<i32>, Column<f64>, Column<String>, DataSet) {
        let mut model = Model::new("Product");
        let qty = model.add_column::<i32>("Qty");
        let price = model.add_column::<f64>("Price");
        let name = model.add_column::<String>("Name");
        let mut data_set = DataSet::new(&model);
        data_set
            .add_row(vec![
                Value::Int32(3),
                Value::Double(12.5),
                Value::String("Chain".to_string()),
            ])
            .unwrap();
        (model, qty, price, name, data_set)
    }

    #[test]
    fn test_arithmetic_operators() {
        let (_, qty, price, _, data_set) = product();
        let row = data_set.row(0).unwrap();

        assert_eq!((&qty + &Column::value(2)).eval(row).unwrap(), Some(5));
        assert_eq!((qty.clone() - Column::value(5)).eval(row).unwrap(), Some(-2));
        assert_eq!((&qty * &qty).eval(row).unwrap(), Some(9));
        assert_eq!((&qty / &Column::value(2)).eval(row).unwrap(), Some(1));
        assert_eq!((&qty % &Column::value(2)).eval(row).unwrap(), Some(1));
        assert_eq!((-&price).eval(row).unwrap(), Some(-12.5));
        assert_eq!(
            (price.clone() * qty.cast::<f64>()).eval(row).unwrap(),
            Some(37.5)
        );
    }

    #[test]
    fn test_bitwise_operators() {
        let (_, qty, _, _, data_set) = product();
        let row = data_set.row(0).unwrap();

        assert_eq!((&qty & &Column::value(1)).eval(row).unwrap(), Some(1));
        assert_eq!((&qty | &Column::value(4)).eval(row).unwrap(), Some(7));
        assert_eq!((&qty ^ &Column::value(1)).eval(row).unwrap(), Some(2));
        assert_eq!(qty.ones_complement().eval(row).unwrap(), Some(-4));
    }

    #[test]
    fn test_comparisons_and_logic() {
        let (_, qty, price, name, data_set) = product();
        let row = data_set.row(0).unwrap();

        let cheap = price.less_than(&Column::value(20.0));
        let many = qty.greater_than_or_equal(&Column::value(5));
        assert_eq!(cheap.eval(row).unwrap(), Some(true));
        assert_eq!(many.eval(row).unwrap(), Some(false));
        assert_eq!(cheap.and(&many).eval(row).unwrap(), Some(false));
        assert_eq!(cheap.or(&many).eval(row).unwrap(), Some(true));
        assert_eq!((!&many).eval(row).unwrap(), Some(true));
        assert_eq!(
            name.equal(&Column::value("Chain".to_string())).eval(row).unwrap(),
            Some(true)
        );
        assert_eq!(name.is_null().eval(row).unwrap(), Some(false));
        assert_eq!(
            name.concat(&Column::value("ring".to_string())).eval(row).unwrap(),
            Some("Chainring".to_string())
        );
    }

    #[test]
    fn test_null_comparison_is_unknown() {
        let (_, qty, _, _, data_set) = product();
        let row = data_set.row(0).unwrap();

        assert_eq!(qty.equal(&Column::null()).eval(row).unwrap(), None);
        assert_eq!(Column::<i32>::null().is_null().eval(row).unwrap(), Some(true));
    }

    #[test]
    fn test_operators_lower_to_ir() {
        let (model, qty, price, _, _) = product();
        let line_total = &price * &qty.cast::<f64>();

        let expected = DbExpression::binary(
            BinaryOperator::Mul,
            price.db_expression(),
            DbExpression::cast(qty.db_expression(), DataType::Int32, DataType::Double),
        );
        assert_eq!(line_total.db_expression(), expected);
        assert_eq!(line_total.parent_model_set(), &ModelSet::single(model.id()));
        assert_eq!(line_total.data_type(), DataType::Double);
    }
}
