//! Renders expression trees and select statements as SQL text.

use crate::data::Value;
use crate::expression::{
    BinaryOperator, DbBinaryExpression, DbCaseExpression, DbCastExpression, DbColumnExpression,
    DbConstantExpression, DbExpression, DbExpressionVisitor, DbFunctionExpression,
    DbParamExpression, DbUnaryExpression, FunctionKey, UnaryOperator,
};
use crate::model::ModelId;
use crate::query::{DbFromClause, DbSelectStatement};
use crate::sql::SqlDialect;
use anyhow::bail;
use std::collections::HashMap;
use std::fmt::{self, Write};
use std::rc::Rc;

/// Generated SQL text with its parameter values in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Visitor that appends SQL for each node it visits.
///
/// Parameters are collected in the order they are written. Every table or
/// subquery in a FROM clause gets an alias `t0`, `t1`, ... and column
/// references to its model are qualified with it.
pub struct SqlGenerator {
    dialect: SqlDialect,
    sql: String,
    params: Vec<Value>,
    aliases: HashMap<ModelId, String>,
    next_alias: usize,
    error: Option<String>,
}

impl SqlGenerator {
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            params: Vec::new(),
            aliases: HashMap::new(),
            next_alias: 0,
            error: None,
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Why the last generation failed, when the failure has a known cause
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn generate_expression(&mut self, expr: &DbExpression) -> fmt::Result {
        expr.accept(self)
    }

    pub fn generate_select(&mut self, statement: &DbSelectStatement) -> fmt::Result {
        self.assign_aliases(statement.from());

        self.sql.push_str("SELECT ");
        for (i, mapping) in statement.select().iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.generate_expression(&mapping.source)?;
            let alias = self.dialect.quote_identifier(&mapping.name);
            write!(self.sql, " AS {}", alias)?;
        }

        self.sql.push_str(" FROM ");
        self.generate_from(statement.from())?;

        if let Some(where_expr) = statement.where_expr() {
            self.sql.push_str(" WHERE ");
            self.generate_expression(where_expr)?;
        }
        if !statement.group_by().is_empty() {
            self.sql.push_str(" GROUP BY ");
            self.generate_list(statement.group_by())?;
        }
        if let Some(having) = statement.having() {
            self.sql.push_str(" HAVING ");
            self.generate_expression(having)?;
        }
        if !statement.order_by().is_empty() {
            self.sql.push_str(" ORDER BY ");
            for (i, sort) in statement.order_by().iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.generate_expression(&sort.expression)?;
                write!(self.sql, " {}", sort.direction.as_str())?;
            }
        }

        let paging = self.dialect.paging_clause(
            !statement.order_by().is_empty(),
            statement.offset(),
            statement.fetch(),
        );
        self.sql.push_str(&paging);
        Ok(())
    }

    pub fn finish(self) -> SqlStatement {
        SqlStatement {
            sql: self.sql,
            params: self.params,
        }
    }

    /// Aliases for the sources directly under `from`; nested subqueries
    /// assign their own when they are generated.
    fn assign_aliases(&mut self, from: &DbFromClause) {
        match from {
            DbFromClause::Table { model, .. } => self.assign_alias(*model),
            DbFromClause::Subquery(statement) => self.assign_alias(statement.model()),
            DbFromClause::Join { left, right, .. } => {
                self.assign_aliases(left);
                self.assign_aliases(right);
            }
        }
    }

    fn assign_alias(&mut self, model: ModelId) {
        let alias = format!("t{}", self.next_alias);
        self.next_alias += 1;
        self.aliases.insert(model, alias);
    }

    fn alias(&self, model: ModelId) -> &str {
        self.aliases.get(&model).map(String::as_str).unwrap_or_default()
    }

    fn generate_from(&mut self, from: &DbFromClause) -> fmt::Result {
        match from {
            DbFromClause::Table { name, model } => {
                let table = self.dialect.quote_identifier(name);
                let alias = self.alias(*model).to_string();
                write!(self.sql, "{} {}", table, alias)
            }
            DbFromClause::Subquery(statement) => {
                let alias = self.alias(statement.model()).to_string();
                self.sql.push('(');
                self.generate_select(statement)?;
                write!(self.sql, ") {}", alias)
            }
            DbFromClause::Join {
                kind,
                left,
                right,
                on,
            } => {
                self.generate_from(left)?;
                write!(self.sql, " {} ", kind.as_str())?;
                self.generate_from(right)?;
                if let Some(on) = on {
                    self.sql.push_str(" ON ");
                    self.generate_expression(on)?;
                }
                Ok(())
            }
        }
    }

    fn generate_list(&mut self, exprs: &[DbExpression]) -> fmt::Result {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.generate_expression(expr)?;
        }
        Ok(())
    }

    fn write_value(&mut self, value: &Value) -> fmt::Result {
        match value {
            Value::Null => self.sql.push_str("NULL"),
            Value::Boolean(b) => self.sql.push_str(self.dialect.boolean_literal(*b)),
            Value::Int32(n) => write!(self.sql, "{}", n)?,
            Value::Int64(n) => write!(self.sql, "{}", n)?,
            Value::Double(n) if n.is_finite() => write!(self.sql, "{:?}", n)?,
            Value::Double(n) => match self.dialect.non_finite_literal(*n) {
                Some(literal) => self.sql.push_str(literal),
                None => {
                    self.error = Some(format!(
                        "{:?} has no literal form in {:?}",
                        n, self.dialect
                    ));
                    return Err(fmt::Error);
                }
            },
            Value::String(s) => {
                let literal = self.dialect.string_literal(s);
                self.sql.push_str(&literal);
            }
        }
        Ok(())
    }
}

impl DbExpressionVisitor for SqlGenerator {
    type Output = fmt::Result;

    fn visit_binary(&mut self, expr: &Rc<DbBinaryExpression>) -> fmt::Result {
        let operator = match expr.kind() {
            BinaryOperator::Concat => self.dialect.concat_operator(),
            BinaryOperator::BitwiseXor => match self.dialect.xor_operator() {
                Some(operator) => operator,
                None => {
                    // a ^ b == (a | b) - (a & b)
                    self.sql.push_str("((");
                    expr.left().accept(self)?;
                    self.sql.push_str(" | ");
                    expr.right().accept(self)?;
                    self.sql.push_str(") - (");
                    expr.left().accept(self)?;
                    self.sql.push_str(" & ");
                    expr.right().accept(self)?;
                    self.sql.push_str("))");
                    return Ok(());
                }
            },
            kind => kind.as_str(),
        };
        self.sql.push('(');
        expr.left().accept(self)?;
        write!(self.sql, " {} ", operator)?;
        expr.right().accept(self)?;
        self.sql.push(')');
        Ok(())
    }

    fn visit_unary(&mut self, expr: &Rc<DbUnaryExpression>) -> fmt::Result {
        let kind = expr.kind();
        self.sql.push('(');
        if kind.is_postfix() {
            expr.operand().accept(self)?;
            write!(self.sql, " {}", kind.as_str())?;
        } else {
            match kind {
                UnaryOperator::Not => self.sql.push_str("NOT "),
                _ => self.sql.push_str(kind.as_str()),
            }
            let start = self.sql.len();
            expr.operand().accept(self)?;
            // "--" would start a line comment
            if self.sql[start..].starts_with('-') {
                self.sql.insert(start, ' ');
            }
        }
        self.sql.push(')');
        Ok(())
    }

    fn visit_case(&mut self, expr: &Rc<DbCaseExpression>) -> fmt::Result {
        self.sql.push_str("CASE");
        if let Some(on) = expr.on() {
            self.sql.push(' ');
            on.accept(self)?;
        }
        for (when, then) in expr.branches() {
            self.sql.push_str(" WHEN ");
            when.accept(self)?;
            self.sql.push_str(" THEN ");
            then.accept(self)?;
        }
        self.sql.push_str(" ELSE ");
        expr.else_expr().accept(self)?;
        self.sql.push_str(" END");
        Ok(())
    }

    fn visit_cast(&mut self, expr: &Rc<DbCastExpression>) -> fmt::Result {
        self.sql.push_str("CAST(");
        expr.operand().accept(self)?;
        write!(self.sql, " AS {})", self.dialect.type_name(expr.target_type()))
    }

    fn visit_column(&mut self, expr: &Rc<DbColumnExpression>) -> fmt::Result {
        let name = self.dialect.quote_identifier(expr.name());
        match self.aliases.get(&expr.column().model) {
            Some(alias) => write!(self.sql, "{}.{}", alias, name),
            None => write!(self.sql, "{}", name),
        }
    }

    fn visit_constant(&mut self, expr: &Rc<DbConstantExpression>) -> fmt::Result {
        self.write_value(expr.value())
    }

    fn visit_function(&mut self, expr: &Rc<DbFunctionExpression>) -> fmt::Result {
        match expr.key() {
            FunctionKey::CountRows => {
                self.sql.push_str("COUNT(*)");
                return Ok(());
            }
            FunctionKey::Length => self.sql.push_str(self.dialect.length_function()),
            key => self.sql.push_str(key.name()),
        }
        self.sql.push('(');
        self.generate_list(expr.params())?;
        self.sql.push(')');
        Ok(())
    }

    fn visit_param(&mut self, expr: &Rc<DbParamExpression>) -> fmt::Result {
        self.params.push(expr.value().clone());
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
        Ok(())
    }
}

/// Render a select statement in one call
pub fn to_sql(statement: &DbSelectStatement, dialect: SqlDialect) -> anyhow::Result<SqlStatement> {
    let mut generator = SqlGenerator::new(dialect);
    if let Err(err) = generator.generate_select(statement) {
        match generator.error() {
            Some(reason) => bail!("Failed to generate SQL: {}", reason),
            None => return Err(err.into()),
        }
    }
    Ok(generator.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataType;
    use crate::model::{ColumnId, SortDirection};
    use crate::query::{ColumnMapping, DbSortSpec, JoinKind};

    fn col(model: u32, ordinal: usize, name: &str, data_type: DataType) -> DbExpression {
        DbExpression::column(ColumnId::new(ModelId(model), ordinal), name, data_type)
    }

    fn int(n: i32) -> DbExpression {
        DbExpression::constant(Value::Int32(n), DataType::Int32)
    }

    fn expression_sql(expr: &DbExpression, dialect: SqlDialect) -> SqlStatement {
        let mut generator = SqlGenerator::new(dialect);
        generator.generate_expression(expr).unwrap();
        generator.finish()
    }

    #[test]
    fn test_expression_sql() {
        let qty = col(1, 0, "OrderQty", DataType::Int32);
        let expr = DbExpression::binary(
            BinaryOperator::And,
            DbExpression::binary(BinaryOperator::Gt, qty.clone(), int(5)),
            DbExpression::unary(UnaryOperator::IsNotNull, qty.clone()),
        );
        assert_eq!(
            expression_sql(&expr, SqlDialect::Postgres).sql,
            "((\"OrderQty\" > 5) AND (\"OrderQty\" IS NOT NULL))"
        );

        let not = DbExpression::unary(
            UnaryOperator::Not,
            DbExpression::constant(Value::Boolean(true), DataType::Boolean),
        );
        assert_eq!(expression_sql(&not, SqlDialect::Postgres).sql, "(NOT TRUE)");
        assert_eq!(expression_sql(&not, SqlDialect::SqlServer).sql, "(NOT 1)");

        let neg = DbExpression::unary(UnaryOperator::Negate, qty);
        assert_eq!(expression_sql(&neg, SqlDialect::Sqlite).sql, "(-\"OrderQty\")");
    }

    #[test]
    fn test_literals() {
        let name = DbExpression::constant(Value::String("O'Neil".to_string()), DataType::Varchar);
        assert_eq!(expression_sql(&name, SqlDialect::Postgres).sql, "'O''Neil'");
        assert_eq!(expression_sql(&name, SqlDialect::SqlServer).sql, "N'O''Neil'");

        let price = DbExpression::constant(Value::Double(2.0), DataType::Double);
        assert_eq!(expression_sql(&price, SqlDialect::Postgres).sql, "2.0");

        let null = DbExpression::constant(Value::Null, DataType::Int32);
        assert_eq!(expression_sql(&null, SqlDialect::Postgres).sql, "NULL");
    }

    #[test]
    fn test_negated_negative_literal() {
        let negated = DbExpression::unary(UnaryOperator::Negate, int(-5));
        assert_eq!(expression_sql(&negated, SqlDialect::Postgres).sql, "(- -5)");

        let twice = DbExpression::unary(UnaryOperator::Negate, negated);
        assert_eq!(expression_sql(&twice, SqlDialect::Postgres).sql, "(-(- -5))");
    }

    #[test]
    fn test_non_finite_doubles() -> anyhow::Result<()> {
        let double = |n: f64| DbExpression::constant(Value::Double(n), DataType::Double);

        assert_eq!(
            expression_sql(&double(f64::NAN), SqlDialect::Postgres).sql,
            "'NaN'::float8"
        );
        assert_eq!(
            expression_sql(&double(f64::NEG_INFINITY), SqlDialect::Postgres).sql,
            "'-Infinity'::float8"
        );
        assert_eq!(
            expression_sql(&double(f64::INFINITY), SqlDialect::Sqlite).sql,
            "9e999"
        );

        let mut generator = SqlGenerator::new(SqlDialect::SqlServer);
        assert!(generator.generate_expression(&double(f64::INFINITY)).is_err());
        assert!(generator.error().unwrap().contains("inf"));

        let statement = DbSelectStatement::new(
            ModelId(2),
            vec![ColumnMapping {
                source: double(f64::NAN),
                target: ColumnId::new(ModelId(2), 0),
                name: "X".to_string(),
            }],
            DbFromClause::Table {
                name: "Product".to_string(),
                model: ModelId(1),
            },
        )?;
        let err = to_sql(&statement, SqlDialect::SqlServer).unwrap_err();
        assert!(err.to_string().contains("no literal form"));
        assert!(to_sql(&statement, SqlDialect::Postgres).is_ok());
        Ok(())
    }

    #[test]
    fn test_params_are_collected_in_order() {
        let expr = DbExpression::binary(
            BinaryOperator::Add,
            DbExpression::param("a", Value::Int32(1), DataType::Int32),
            DbExpression::param("b", Value::Int32(2), DataType::Int32),
        );

        let pg = expression_sql(&expr, SqlDialect::Postgres);
        assert_eq!(pg.sql, "($1 + $2)");
        assert_eq!(pg.params, vec![Value::Int32(1), Value::Int32(2)]);
        assert_eq!(expression_sql(&expr, SqlDialect::SqlServer).sql, "(@p1 + @p2)");
        assert_eq!(expression_sql(&expr, SqlDialect::Sqlite).sql, "(?1 + ?2)");
    }

    #[test]
    fn test_dialect_operators() {
        let name = col(1, 0, "Name", DataType::Varchar);
        let concat = DbExpression::binary(
            BinaryOperator::Concat,
            name,
            DbExpression::constant(Value::String("!".to_string()), DataType::Varchar),
        );
        assert_eq!(expression_sql(&concat, SqlDialect::Postgres).sql, "(\"Name\" || '!')");
        assert_eq!(expression_sql(&concat, SqlDialect::SqlServer).sql, "([Name] + N'!')");

        let xor = DbExpression::binary(BinaryOperator::BitwiseXor, int(6), int(3));
        assert_eq!(expression_sql(&xor, SqlDialect::Postgres).sql, "(6 # 3)");
        assert_eq!(expression_sql(&xor, SqlDialect::SqlServer).sql, "(6 ^ 3)");
        assert_eq!(
            expression_sql(&xor, SqlDialect::Sqlite).sql,
            "((6 | 3) - (6 & 3))"
        );
    }

    #[test]
    fn test_case_cast_and_functions() {
        let qty = col(1, 0, "Qty", DataType::Int32);
        let case = DbExpression::case(
            Some(qty.clone()),
            vec![int(1)],
            vec![DbExpression::constant(Value::String("one".to_string()), DataType::Varchar)],
            DbExpression::constant(Value::String("many".to_string()), DataType::Varchar),
        )
        .unwrap();
        assert_eq!(
            expression_sql(&case, SqlDialect::Postgres).sql,
            "CASE \"Qty\" WHEN 1 THEN 'one' ELSE 'many' END"
        );

        let cast = DbExpression::cast(qty.clone(), DataType::Int32, DataType::Double);
        assert_eq!(
            expression_sql(&cast, SqlDialect::SqlServer).sql,
            "CAST([Qty] AS FLOAT)"
        );

        let count = DbExpression::function(FunctionKey::CountRows, vec![]).unwrap();
        assert_eq!(expression_sql(&count, SqlDialect::Postgres).sql, "COUNT(*)");

        let name = col(1, 1, "Name", DataType::Varchar);
        let length = DbExpression::function(FunctionKey::Length, vec![name.clone()]).unwrap();
        assert_eq!(expression_sql(&length, SqlDialect::SqlServer).sql, "LEN([Name])");
        assert_eq!(expression_sql(&length, SqlDialect::Sqlite).sql, "LENGTH(\"Name\")");

        let coalesce =
            DbExpression::function(FunctionKey::Coalesce, vec![name, qty]).unwrap();
        assert_eq!(
            expression_sql(&coalesce, SqlDialect::Postgres).sql,
            "COALESCE(\"Name\", \"Qty\")"
        );
    }

    fn product_select() -> DbSelectStatement {
        DbSelectStatement::new(
            ModelId(2),
            vec![
                ColumnMapping {
                    source: col(1, 0, "ProductID", DataType::Int32),
                    target: ColumnId::new(ModelId(2), 0),
                    name: "ID".to_string(),
                },
                ColumnMapping {
                    source: col(1, 1, "ListPrice", DataType::Double),
                    target: ColumnId::new(ModelId(2), 1),
                    name: "Price".to_string(),
                },
            ],
            DbFromClause::Table {
                name: "Product".to_string(),
                model: ModelId(1),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_simple_select() -> anyhow::Result<()> {
        let statement = product_select()
            .with_where(Some(DbExpression::binary(
                BinaryOperator::Gt,
                col(1, 1, "ListPrice", DataType::Double),
                DbExpression::param("min", Value::Double(10.0), DataType::Double),
            )))
            .with_order_by(vec![DbSortSpec {
                expression: col(1, 1, "ListPrice", DataType::Double),
                direction: SortDirection::Descending,
            }])
            .with_paging(Some(20), Some(10));

        let pg = to_sql(&statement, SqlDialect::Postgres)?;
        assert_eq!(
            pg.sql,
            "SELECT t0.\"ProductID\" AS \"ID\", t0.\"ListPrice\" AS \"Price\" \
             FROM \"Product\" t0 WHERE (t0.\"ListPrice\" > $1) \
             ORDER BY t0.\"ListPrice\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(pg.params, vec![Value::Double(10.0)]);

        let mssql = to_sql(&statement, SqlDialect::SqlServer)?;
        assert!(mssql
            .sql
            .ends_with("ORDER BY t0.[ListPrice] DESC OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"));
        Ok(())
    }

    #[test]
    fn test_nested_select_aliases() -> anyhow::Result<()> {
        let inner = Rc::new(product_select());
        let outer = DbSelectStatement::new(
            ModelId(3),
            vec![ColumnMapping {
                source: DbExpression::binary(
                    BinaryOperator::Mul,
                    col(2, 1, "Price", DataType::Double),
                    DbExpression::constant(Value::Double(2.0), DataType::Double),
                ),
                target: ColumnId::new(ModelId(3), 0),
                name: "Doubled".to_string(),
            }],
            DbFromClause::Subquery(inner),
        )?;

        let sql = to_sql(&outer, SqlDialect::Postgres)?.sql;
        assert_eq!(
            sql,
            "SELECT (t0.\"Price\" * 2.0) AS \"Doubled\" FROM \
             (SELECT t1.\"ProductID\" AS \"ID\", t1.\"ListPrice\" AS \"Price\" \
             FROM \"Product\" t1) t0"
        );
        Ok(())
    }

    #[test]
    fn test_join_and_group_by() -> anyhow::Result<()> {
        let header_id = col(5, 0, "SalesOrderID", DataType::Int32);
        let detail_id = col(6, 0, "SalesOrderID", DataType::Int32);
        let qty = col(6, 1, "OrderQty", DataType::Int32);
        let total = DbExpression::function(FunctionKey::Sum, vec![qty])?;

        let statement = DbSelectStatement::new(
            ModelId(7),
            vec![
                ColumnMapping {
                    source: header_id.clone(),
                    target: ColumnId::new(ModelId(7), 0),
                    name: "SalesOrderID".to_string(),
                },
                ColumnMapping {
                    source: total.clone(),
                    target: ColumnId::new(ModelId(7), 1),
                    name: "TotalQty".to_string(),
                },
            ],
            DbFromClause::Join {
                kind: JoinKind::LeftOuter,
                left: Box::new(DbFromClause::Table {
                    name: "SalesOrderHeader".to_string(),
                    model: ModelId(5),
                }),
                right: Box::new(DbFromClause::Table {
                    name: "SalesOrderDetail".to_string(),
                    model: ModelId(6),
                }),
                on: Some(DbExpression::eq(header_id.clone(), detail_id)),
            },
        )?
        .with_group_by(vec![header_id])
        .with_having(Some(DbExpression::binary(BinaryOperator::Gt, total, int(1))))
        .with_aggregated(true);

        let sql = to_sql(&statement, SqlDialect::Sqlite)?.sql;
        assert_eq!(
            sql,
            "SELECT t0.\"SalesOrderID\" AS \"SalesOrderID\", SUM(t1.\"OrderQty\") AS \"TotalQty\" \
             FROM \"SalesOrderHeader\" t0 LEFT JOIN \"SalesOrderDetail\" t1 \
             ON (t0.\"SalesOrderID\" = t1.\"SalesOrderID\") \
             GROUP BY t0.\"SalesOrderID\" HAVING (SUM(t1.\"OrderQty\") > 1)"
        );
        Ok(())
    }
}
