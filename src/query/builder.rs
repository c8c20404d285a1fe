//! Builds select statements from typed columns.

use crate::column::{AnyColumn, Column};
use crate::data::ColumnValue;
use crate::expression::{
    DbBinaryExpression, DbCaseExpression, DbCastExpression, DbColumnExpression,
    DbConstantExpression, DbExpression, DbExpressionVisitor, DbFunctionExpression,
    DbParamExpression, DbUnaryExpression, TypeChecker,
};
use crate::model::{ColumnSort, Model, ModelSet};
use crate::query::{
    ColumnMapping, DbFromClause, DbSelectStatement, DbSortSpec, JoinKind, QueryError,
    QueryResult,
};
use log::debug;
use std::collections::HashSet;
use std::rc::Rc;

/// Something a select statement can read from
pub trait QuerySource {
    fn from_clause(&self) -> DbFromClause;
}

impl QuerySource for Model {
    fn from_clause(&self) -> DbFromClause {
        DbFromClause::Table {
            name: self.name().to_string(),
            model: self.id(),
        }
    }
}

impl QuerySource for Query {
    fn from_clause(&self) -> DbFromClause {
        DbFromClause::Subquery(Rc::clone(&self.statement))
    }
}

/// A built select statement together with the model of its output rows
#[derive(Debug)]
pub struct Query {
    model: Model,
    statement: Rc<DbSelectStatement>,
}

impl Query {
    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn statement(&self) -> &Rc<DbSelectStatement> {
        &self.statement
    }

    /// Output column by name, for use in an outer query
    pub fn column<T: ColumnValue>(&self, name: &str) -> QueryResult<Column<T>> {
        let column = self
            .model
            .column_by_name(name)
            .ok_or_else(|| QueryError::UnknownColumn(name.to_string()))?;
        Ok(column.typed::<T>()?)
    }
}

pub struct SelectBuilder {
    from: DbFromClause,
    select: Vec<(String, AnyColumn)>,
    filters: Vec<Column<bool>>,
    group_by: Vec<AnyColumn>,
    having: Vec<Column<bool>>,
    order_by: Vec<ColumnSort>,
    offset: Option<usize>,
    fetch: Option<usize>,
}

impl SelectBuilder {
    pub fn new(source: &impl QuerySource) -> Self {
        Self {
            from: source.from_clause(),
            select: Vec::new(),
            filters: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            offset: None,
            fetch: None,
        }
    }

    pub fn from_model(model: &Model) -> Self {
        Self::new(model)
    }

    pub fn from_query(query: &Query) -> Self {
        Self::new(query)
    }

    pub fn join(
        mut self,
        kind: JoinKind,
        source: &impl QuerySource,
        on: Option<&Column<bool>>,
    ) -> Self {
        let left = self.from;
        self.from = DbFromClause::Join {
            kind,
            left: Box::new(left),
            right: Box::new(source.from_clause()),
            on: on.map(Column::db_expression),
        };
        self
    }

    /// Project `column` as output column `name`
    pub fn select<T: ColumnValue>(mut self, name: &str, column: &Column<T>) -> Self {
        self.select.push((name.to_string(), column.as_any().clone()));
        self
    }

    /// Add a WHERE predicate; several predicates are AND-ed
    pub fn filter(mut self, predicate: &Column<bool>) -> Self {
        self.filters.push(predicate.clone());
        self
    }

    pub fn group_by<T: ColumnValue>(mut self, column: &Column<T>) -> Self {
        self.group_by.push(column.as_any().clone());
        self
    }

    pub fn having(mut self, predicate: &Column<bool>) -> Self {
        self.having.push(predicate.clone());
        self
    }

    pub fn order_by(mut self, sort: ColumnSort) -> Self {
        self.order_by.push(sort);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn fetch(mut self, fetch: usize) -> Self {
        self.fetch = Some(fetch);
        self
    }

    fn check_scope(scope: &ModelSet, name: &str, column: &AnyColumn) -> QueryResult<()> {
        if column.parent_model_set().is_subset(scope)
            && column.aggregate_model_set().is_subset(scope)
        {
            Ok(())
        } else {
            Err(QueryError::ModelNotInScope {
                column: name.to_string(),
            })
        }
    }

    fn combine(predicates: &[Column<bool>]) -> Option<DbExpression> {
        predicates
            .iter()
            .map(Column::db_expression)
            .reduce(DbExpression::and)
    }

    /// Validate and build the statement; `name` names the output model
    pub fn build(self, name: &str) -> QueryResult<Query> {
        if self.select.is_empty() {
            return Err(QueryError::EmptySelect);
        }

        let mut names = HashSet::new();
        for (column_name, _) in &self.select {
            if !names.insert(column_name.as_str()) {
                return Err(QueryError::DuplicateColumn(column_name.clone()));
            }
        }

        let scope = self.from.models();
        for (column_name, column) in &self.select {
            Self::check_scope(&scope, column_name, column)?;
        }

        let mut checker = TypeChecker::scoped(&scope);
        for predicate in &self.filters {
            if predicate.as_any().is_aggregate() {
                return Err(QueryError::AggregateInWhere);
            }
            checker.check_filter_predicate(&predicate.db_expression())?;
        }
        for predicate in &self.having {
            checker.check_filter_predicate(&predicate.db_expression())?;
        }
        for column in &self.group_by {
            Self::check_scope(&scope, column.name(), column)?;
        }
        for sort in &self.order_by {
            Self::check_scope(&scope, sort.column.name(), &sort.column)?;
        }

        let aggregated = !self.group_by.is_empty()
            || !self.having.is_empty()
            || self.select.iter().any(|(_, c)| c.is_aggregate());
        let group_by: Vec<DbExpression> =
            self.group_by.iter().map(AnyColumn::db_expression).collect();
        if aggregated {
            let mut grouped = GroupedCheck::new(&group_by);
            let having = self.having.iter().map(|p| ("HAVING", p.as_any()));
            let order_by = self.order_by.iter().map(|s| {
                let name = s.column.name();
                (if name.is_empty() { "ORDER BY" } else { name }, &s.column)
            });
            let items = self
                .select
                .iter()
                .map(|(n, c)| (n.as_str(), c))
                .chain(having)
                .chain(order_by);
            for (label, column) in items {
                if !grouped.check(&column.db_expression()) {
                    return Err(QueryError::NotInGroupBy {
                        column: label.to_string(),
                    });
                }
            }
        }

        let mut model = Model::new(name);
        let mut select = Vec::with_capacity(self.select.len());
        for (column_name, column) in &self.select {
            let output = model.add_column_of_type(column_name.as_str(), column.data_type())?;
            let target = output
                .id()
                .ok_or_else(|| QueryError::UnknownColumn(column_name.clone()))?;
            select.push(ColumnMapping {
                source: column.db_expression(),
                target,
                name: column_name.clone(),
            });
        }

        let order_by = self
            .order_by
            .iter()
            .map(|sort| DbSortSpec {
                expression: sort.column.db_expression(),
                direction: sort.direction,
            })
            .collect();

        let statement = DbSelectStatement::new(model.id(), select, self.from)?
            .with_where(Self::combine(&self.filters))
            .with_group_by(group_by)
            .with_having(Self::combine(&self.having))
            .with_order_by(order_by)
            .with_paging(self.offset, self.fetch)
            .with_aggregated(aggregated);

        debug!(
            "Built query {} (model {}) with {} columns, aggregated: {}",
            name,
            model.id().0,
            model.columns().len(),
            aggregated
        );
        Ok(Query {
            model,
            statement: Rc::new(statement),
        })
    }
}

/// Whether an expression only reads rows through GROUP BY expressions or
/// aggregates.
struct GroupedCheck<'a> {
    group_by: &'a [DbExpression],
}

impl<'a> GroupedCheck<'a> {
    fn new(group_by: &'a [DbExpression]) -> Self {
        Self { group_by }
    }

    fn check(&mut self, expr: &DbExpression) -> bool {
        self.group_by.contains(expr) || expr.accept(self)
    }
}

impl DbExpressionVisitor for GroupedCheck<'_> {
    type Output = bool;

    fn visit_binary(&mut self, expr: &Rc<DbBinaryExpression>) -> bool {
        self.check(expr.left()) && self.check(expr.right())
    }

    fn visit_unary(&mut self, expr: &Rc<DbUnaryExpression>) -> bool {
        self.check(expr.operand())
    }

    fn visit_case(&mut self, expr: &Rc<DbCaseExpression>) -> bool {
        expr.on().map_or(true, |on| self.check(on))
            && expr.when().iter().all(|e| self.check(e))
            && expr.then().iter().all(|e| self.check(e))
            && self.check(expr.else_expr())
    }

    fn visit_cast(&mut self, expr: &Rc<DbCastExpression>) -> bool {
        self.check(expr.operand())
    }

    fn visit_column(&mut self, _expr: &Rc<DbColumnExpression>) -> bool {
        false
    }

    fn visit_constant(&mut self, _expr: &Rc<DbConstantExpression>) -> bool {
        true
    }

    fn visit_function(&mut self, expr: &Rc<DbFunctionExpression>) -> bool {
        expr.key().is_aggregate() || expr.params().iter().all(|e| self.check(e))
    }

    fn visit_param(&mut self, _expr: &Rc<DbParamExpression>) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::count_rows;
    use crate::data::DataType;
    use crate::expression::ExpressionError;
    use crate::model::ColumnId;

    struct Detail {
        model: Model,
        order_id: Column<i32>,
        qty: Column<i32>,
        price: Column<f64>,
    }

    fn detail() -> Detail {
        let mut model = Model::new("SalesOrderDetail");
        let order_id = model.add_column::<i32>("SalesOrderID");
        let qty = model.add_column::<i32>("OrderQty");
        let price = model.add_column::<f64>("UnitPrice");
        Detail {
            model,
            order_id,
            qty,
            price,
        }
    }

    #[test]
    fn test_build_projection() -> anyhow::Result<()> {
        let d = detail();
        let line_total = &d.price * &d.qty.cast::<f64>();
        let query = SelectBuilder::from_model(&d.model)
            .select("SalesOrderID", &d.order_id)
            .select("LineTotal", &line_total)
            .filter(&d.qty.greater_than(&Column::value(0)))
            .order_by(line_total.desc())
            .fetch(10)
            .build("OrderLine")?;

        let statement = query.statement();
        assert_eq!(query.model().name(), "OrderLine");
        assert_eq!(query.model().schema(), vec![DataType::Int32, DataType::Double]);
        assert_eq!(statement.model(), query.model().id());
        assert_eq!(statement.select().len(), 2);
        assert_eq!(statement.select()[1].target, ColumnId::new(query.model().id(), 1));
        assert_eq!(statement.source(1), Some(&line_total.db_expression()));
        assert!(statement.where_expr().is_some());
        assert_eq!(statement.fetch(), Some(10));
        assert!(!statement.is_aggregated());

        let out: Column<f64> = query.column("LineTotal")?;
        assert_eq!(out.id(), Some(ColumnId::new(query.model().id(), 1)));
        assert!(matches!(
            query.column::<i32>("LineTotal"),
            Err(QueryError::Expression(ExpressionError::TypeMismatch { .. }))
        ));
        assert!(matches!(
            query.column::<i32>("Nope"),
            Err(QueryError::UnknownColumn(_))
        ));
        Ok(())
    }

    #[test]
    fn test_filters_are_combined() -> anyhow::Result<()> {
        let d = detail();
        let a = d.qty.greater_than(&Column::value(0));
        let b = d.price.less_than(&Column::value(100.0));
        let query = SelectBuilder::from_model(&d.model)
            .select("OrderQty", &d.qty)
            .filter(&a)
            .filter(&b)
            .build("Filtered")?;

        assert_eq!(
            query.statement().where_expr(),
            Some(&DbExpression::and(a.db_expression(), b.db_expression()))
        );
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_select_lists() {
        let d = detail();
        assert!(matches!(
            SelectBuilder::from_model(&d.model).build("Empty"),
            Err(QueryError::EmptySelect)
        ));
        assert!(matches!(
            SelectBuilder::from_model(&d.model)
                .select("X", &d.qty)
                .select("X", &d.price)
                .build("Dup"),
            Err(QueryError::DuplicateColumn(name)) if name == "X"
        ));

        let other = detail();
        assert!(matches!(
            SelectBuilder::from_model(&d.model)
                .select("Qty", &other.qty)
                .build("Foreign"),
            Err(QueryError::ModelNotInScope { .. })
        ));
    }

    #[test]
    fn test_rejects_invalid_predicates() {
        let d = detail();
        assert!(matches!(
            SelectBuilder::from_model(&d.model)
                .select("Qty", &d.qty)
                .filter(&d.qty.sum().greater_than(&Column::value(10)))
                .build("AggWhere"),
            Err(QueryError::AggregateInWhere)
        ));

        let other = detail();
        assert!(matches!(
            SelectBuilder::from_model(&d.model)
                .select("Qty", &d.qty)
                .filter(&other.qty.is_null())
                .build("ForeignWhere"),
            Err(QueryError::Expression(ExpressionError::TypeCheckFailed { .. }))
        ));
    }

    #[test]
    fn test_group_by() -> anyhow::Result<()> {
        let d = detail();
        let total = d.qty.sum();
        let query = SelectBuilder::from_model(&d.model)
            .select("SalesOrderID", &d.order_id)
            .select("TotalQty", &total)
            .select("Lines", &count_rows(&d.model))
            .group_by(&d.order_id)
            .having(&total.greater_than(&Column::value(1)))
            .build("OrderTotals")?;

        let statement = query.statement();
        assert!(statement.is_aggregated());
        assert_eq!(statement.group_by(), &[d.order_id.db_expression()]);
        assert!(statement.having().is_some());

        assert!(matches!(
            SelectBuilder::from_model(&d.model)
                .select("OrderQty", &d.qty)
                .select("TotalQty", &total)
                .group_by(&d.order_id)
                .build("Bad"),
            Err(QueryError::NotInGroupBy { column }) if column == "OrderQty"
        ));
        Ok(())
    }

    #[test]
    fn test_expressions_over_grouped_columns() -> anyhow::Result<()> {
        let d = detail();
        let shifted = &d.order_id * &Column::value(10);
        let mixed = &d.order_id + &d.qty.sum();
        let query = SelectBuilder::from_model(&d.model)
            .select("Shifted", &shifted)
            .select("Mixed", &mixed)
            .select("Label", &Column::value("order".to_string()))
            .group_by(&d.order_id)
            .order_by(mixed.desc())
            .build("Grouped")?;
        assert!(query.statement().is_aggregated());

        // An ungrouped column inside an otherwise valid expression
        let partly = &d.qty + &d.qty.sum();
        assert!(matches!(
            SelectBuilder::from_model(&d.model)
                .select("Partly", &partly)
                .group_by(&d.order_id)
                .build("Bad"),
            Err(QueryError::NotInGroupBy { column }) if column == "Partly"
        ));
        Ok(())
    }

    #[test]
    fn test_having_and_order_by_must_be_grouped() {
        let d = detail();
        assert!(matches!(
            SelectBuilder::from_model(&d.model)
                .select("SalesOrderID", &d.order_id)
                .group_by(&d.order_id)
                .having(&d.qty.greater_than(&Column::value(1)))
                .build("BadHaving"),
            Err(QueryError::NotInGroupBy { column }) if column == "HAVING"
        ));
        assert!(matches!(
            SelectBuilder::from_model(&d.model)
                .select("SalesOrderID", &d.order_id)
                .group_by(&d.order_id)
                .order_by(d.price.asc())
                .build("BadOrder"),
            Err(QueryError::NotInGroupBy { column }) if column == "UnitPrice"
        ));
        assert!(SelectBuilder::from_model(&d.model)
            .select("SalesOrderID", &d.order_id)
            .group_by(&d.order_id)
            .having(&d.qty.sum().greater_than(&Column::value(1)))
            .order_by(d.order_id.asc())
            .build("Good")
            .is_ok());
    }

    #[test]
    fn test_subquery_and_join() -> anyhow::Result<()> {
        let d = detail();
        let inner = SelectBuilder::from_model(&d.model)
            .select("SalesOrderID", &d.order_id)
            .select("Qty", &d.qty)
            .build("Inner")?;

        let qty: Column<i32> = inner.column("Qty")?;
        let outer = SelectBuilder::from_query(&inner)
            .select("Doubled", &(&qty * &Column::value(2)))
            .build("Outer")?;
        assert!(matches!(
            outer.statement().from(),
            DbFromClause::Subquery(s) if Rc::ptr_eq(s, inner.statement())
        ));

        // Base columns are out of scope once the FROM clause is the subquery
        assert!(SelectBuilder::from_query(&inner)
            .select("Qty", &d.qty)
            .build("Wrong")
            .is_err());

        let mut header = Model::new("SalesOrderHeader");
        let header_id = header.add_column::<i32>("SalesOrderID");
        let joined = SelectBuilder::from_model(&header)
            .join(
                JoinKind::Inner,
                &d.model,
                Some(&header_id.equal(&d.order_id)),
            )
            .select("SalesOrderID", &header_id)
            .select("OrderQty", &d.qty)
            .build("Joined")?;
        assert_eq!(joined.statement().from().models().len(), 2);
        Ok(())
    }
}
