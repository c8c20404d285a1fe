//! Select statement IR.

use crate::expression::DbExpression;
use crate::model::{ColumnId, ModelId, ModelSet, SortDirection};
use crate::query::{ColumnReplacer, QueryError, QueryResult};
use log::debug;
use std::rc::Rc;

/// One projected output column: `source AS name`, stored at `target`
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    pub source: DbExpression,
    pub target: ColumnId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    Cross,
}

impl JoinKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::LeftOuter => "LEFT JOIN",
            JoinKind::RightOuter => "RIGHT JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DbFromClause {
    Table {
        name: String,
        model: ModelId,
    },
    Subquery(Rc<DbSelectStatement>),
    Join {
        kind: JoinKind,
        left: Box<DbFromClause>,
        right: Box<DbFromClause>,
        on: Option<DbExpression>,
    },
}

impl DbFromClause {
    /// Models whose columns are readable from this clause
    pub fn models(&self) -> ModelSet {
        match self {
            DbFromClause::Table { model, .. } => ModelSet::single(*model),
            DbFromClause::Subquery(statement) => ModelSet::single(statement.model()),
            DbFromClause::Join { left, right, .. } => left.models().union(&right.models()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbSortSpec {
    pub expression: DbExpression,
    pub direction: SortDirection,
}

/// `SELECT .. FROM .. WHERE .. GROUP BY .. HAVING .. ORDER BY ..`
///
/// The output columns belong to `model`; the mapping at position `i`
/// targets ordinal `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct DbSelectStatement {
    model: ModelId,
    select: Vec<ColumnMapping>,
    from: DbFromClause,
    where_expr: Option<DbExpression>,
    group_by: Vec<DbExpression>,
    having: Option<DbExpression>,
    order_by: Vec<DbSortSpec>,
    offset: Option<usize>,
    fetch: Option<usize>,
    aggregated: bool,
}

impl DbSelectStatement {
    pub fn new(
        model: ModelId,
        select: Vec<ColumnMapping>,
        from: DbFromClause,
    ) -> QueryResult<Self> {
        if select.is_empty() {
            return Err(QueryError::EmptySelect);
        }
        for (position, mapping) in select.iter().enumerate() {
            if mapping.target.model != model || mapping.target.ordinal != position {
                return Err(QueryError::InvalidTarget {
                    position,
                    target: mapping.target,
                });
            }
        }
        Ok(Self {
            model,
            select,
            from,
            where_expr: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            offset: None,
            fetch: None,
            aggregated: false,
        })
    }

    pub fn with_where(mut self, where_expr: Option<DbExpression>) -> Self {
        self.where_expr = where_expr;
        self
    }

    pub fn with_group_by(mut self, group_by: Vec<DbExpression>) -> Self {
        self.group_by = group_by;
        self
    }

    pub fn with_having(mut self, having: Option<DbExpression>) -> Self {
        self.having = having;
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<DbSortSpec>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_paging(mut self, offset: Option<usize>, fetch: Option<usize>) -> Self {
        self.offset = offset;
        self.fetch = fetch;
        self
    }

    pub fn with_aggregated(mut self, aggregated: bool) -> Self {
        self.aggregated = aggregated;
        self
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn select(&self) -> &[ColumnMapping] {
        &self.select
    }

    pub fn from(&self) -> &DbFromClause {
        &self.from
    }

    pub fn where_expr(&self) -> Option<&DbExpression> {
        self.where_expr.as_ref()
    }

    pub fn group_by(&self) -> &[DbExpression] {
        &self.group_by
    }

    pub fn having(&self) -> Option<&DbExpression> {
        self.having.as_ref()
    }

    pub fn order_by(&self) -> &[DbSortSpec] {
        &self.order_by
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn fetch(&self) -> Option<usize> {
        self.fetch
    }

    pub fn is_aggregated(&self) -> bool {
        self.aggregated
    }

    /// Source expression projected at `ordinal`
    pub fn source(&self, ordinal: usize) -> Option<&DbExpression> {
        self.select.get(ordinal).map(|m| &m.source)
    }

    /// Whether an outer statement may read through this one column by column
    fn is_simple_projection(&self) -> bool {
        !self.aggregated
            && self.group_by.is_empty()
            && self.having.is_none()
            && self.order_by.is_empty()
            && self.offset.is_none()
            && self.fetch.is_none()
    }

    /// Flatten `SELECT .. FROM (inner)` into a single statement over the
    /// inner statement's FROM clause.
    ///
    /// Returns `None` unless the FROM clause is a subquery that only projects
    /// and filters.
    pub fn inline_subquery(&self) -> Option<DbSelectStatement> {
        let inner = match &self.from {
            DbFromClause::Subquery(inner) if inner.is_simple_projection() => inner,
            _ => return None,
        };

        let mut replacer = ColumnReplacer::new(inner);
        let select = self
            .select
            .iter()
            .map(|m| ColumnMapping {
                source: replacer.replace(&m.source),
                target: m.target,
                name: m.name.clone(),
            })
            .collect();
        let outer_where = self.where_expr.as_ref().map(|e| replacer.replace(e));
        let where_expr = match (inner.where_expr.clone(), outer_where) {
            (Some(inner_where), Some(outer_where)) => {
                Some(DbExpression::and(inner_where, outer_where))
            }
            (inner_where, outer_where) => inner_where.or(outer_where),
        };
        let group_by = self.group_by.iter().map(|e| replacer.replace(e)).collect();
        let having = self.having.as_ref().map(|e| replacer.replace(e));
        let order_by = self
            .order_by
            .iter()
            .map(|s| DbSortSpec {
                expression: replacer.replace(&s.expression),
                direction: s.direction,
            })
            .collect();

        debug!(
            "Inlined subquery of model {} into statement of model {}",
            inner.model.0, self.model.0
        );
        Some(DbSelectStatement {
            model: self.model,
            select,
            from: inner.from.clone(),
            where_expr,
            group_by,
            having,
            order_by,
            offset: self.offset,
            fetch: self.fetch,
            aggregated: self.aggregated,
        })
    }
}
