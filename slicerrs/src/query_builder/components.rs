//! Resolved query components collected from a QueryRequest.
//!
//! This is the intermediate representation between the raw request and
//! the query plans: every field definition is lowered to SQL against the
//! request's table aliases, and filters are split by the clause they feed.

use std::collections::HashSet;

use crate::error::{Result, SlicerError};
use crate::models::{DataType, Expr, Filter, QueryFilter, QueryRequest, ResultSetFilter};
use crate::sql_ast::{Join, SqlExpr, TableRef};

use super::filters::render_filter_expr;
use super::render::expr_to_sql;
use super::resolve::TableAliases;

/// A dimension ready for SQL generation.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedDimension {
    pub key: String,
    pub alias: String,
    pub data_type: DataType,
    pub expr: SqlExpr,
    /// Carries `Modifier::Rollup`: collapsed in the totals statements.
    pub totals: bool,
    /// Named in the request's rollup set: wrapped in `ROLLUP(...)`.
    pub rollup: bool,
    /// False for result-set columns computed from aggregates.
    pub grouped: bool,
}

impl ResolvedDimension {
    pub fn is_flagged(&self) -> bool {
        self.totals || self.rollup
    }
}

/// A metric ready for SQL generation.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedMetric {
    pub key: String,
    pub alias: String,
    pub expr: SqlExpr,
}

/// A WHERE filter; the field expression is kept apart from the predicate so
/// comparison queries can shift it.
#[derive(Clone, Debug)]
pub struct ResolvedFilter {
    pub filter: Filter,
    pub field_expr: SqlExpr,
}

impl ResolvedFilter {
    pub fn predicate(&self) -> Result<SqlExpr> {
        render_filter_expr(self.field_expr.clone(), &self.filter)
    }

    pub fn predicate_on(&self, expr: SqlExpr) -> Result<SqlExpr> {
        render_filter_expr(expr, &self.filter)
    }
}

/// All resolved components needed to build the statements of a request.
#[derive(Clone, Debug)]
pub struct QueryComponents {
    pub tables: TableAliases,
    pub from: TableRef,
    pub joins: Vec<Join>,
    /// Declared dimensions in request order.
    pub dimensions: Vec<ResolvedDimension>,
    pub metrics: Vec<ResolvedMetric>,
    pub filters: Vec<ResolvedFilter>,
    pub having: Vec<SqlExpr>,
    pub result_sets: Vec<ResultSetFilter>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Resolve all components from a query request.
pub fn resolve_components(request: &QueryRequest) -> Result<QueryComponents> {
    if request.dimensions.is_empty() && request.metrics.is_empty() {
        return Err(SlicerError::EmptyProjection);
    }

    let mut seen = HashSet::new();
    for key in request
        .dimensions
        .iter()
        .map(|d| d.key())
        .chain(request.metrics.iter().map(|m| m.key()))
    {
        if !seen.insert(key) {
            return Err(SlicerError::DuplicateAlias(crate::models::alias_for(key)));
        }
    }

    let tables = TableAliases::for_request(request)?;
    let from = tables.base_ref();
    let joins = request
        .joins
        .iter()
        .enumerate()
        .map(|(idx, join)| {
            Ok(Join {
                join_type: join.join_type.into(),
                table: tables.join_ref(idx)?,
                on: split_conjunction(&join.on)
                    .into_iter()
                    .map(|e| expr_to_sql(e, &tables))
                    .collect::<Result<Vec<_>>>()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let dimensions = request
        .dimensions
        .iter()
        .map(|d| {
            Ok(ResolvedDimension {
                key: d.key().to_string(),
                alias: d.field.alias(),
                data_type: d.field.data_type,
                expr: expr_to_sql(&d.field.definition, &tables)?,
                totals: d.is_totals(),
                rollup: false,
                grouped: true,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let metrics = request
        .metrics
        .iter()
        .map(|m| {
            Ok(ResolvedMetric {
                key: m.key().to_string(),
                alias: m.field.alias(),
                expr: expr_to_sql(&m.field.definition, &tables)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut filters = Vec::new();
    let mut having = Vec::new();
    let mut result_sets = Vec::new();
    for f in &request.filters {
        match f {
            QueryFilter::Dimension(filter) => {
                let resolved = ResolvedFilter {
                    filter: filter.clone(),
                    field_expr: expr_to_sql(&filter.field.definition, &tables)?,
                };
                // surface malformed values before any statement is built
                resolved.predicate()?;
                filters.push(resolved);
            }
            QueryFilter::Metric(filter) => {
                let expr = expr_to_sql(&filter.field.definition, &tables)?;
                having.push(render_filter_expr(expr, filter)?);
            }
            QueryFilter::ResultSet(rs) => result_sets.push(rs.clone()),
        }
    }

    Ok(QueryComponents {
        tables,
        from,
        joins,
        dimensions,
        metrics,
        filters,
        having,
        result_sets,
        limit: request.limit,
        offset: request.offset,
    })
}

/// `a AND b AND c` as `[a, b, c]`, so join conditions render like the
/// rest of the ON clauses.
fn split_conjunction(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Binary {
            op: crate::models::BinaryOp::And,
            left,
            right,
        } => {
            let mut parts = split_conjunction(left);
            parts.extend(split_conjunction(right));
            parts
        }
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BinaryOp, Dimension, Field, Join as RequestJoin, JoinType, Metric};

    fn request() -> QueryRequest {
        QueryRequest::new("clicks")
            .join(RequestJoin::new(
                "devices",
                Expr::binary(
                    BinaryOp::And,
                    Expr::binary(
                        BinaryOp::Eq,
                        Expr::column("device_id"),
                        Expr::table_column("devices", "id"),
                    ),
                    Expr::binary(
                        BinaryOp::Eq,
                        Expr::column("tenant"),
                        Expr::table_column("devices", "tenant"),
                    ),
                ),
                JoinType::Left,
            ))
            .dimension(Dimension::new(
                Field::new("device", DataType::Text, Expr::table_column("devices", "name"))
                    .unwrap(),
            ))
            .metric(Metric::new(
                Field::new("clicks", DataType::Number, Expr::sum(Expr::column("clicks")))
                    .unwrap(),
            ))
    }

    #[test]
    fn resolves_joined_columns_against_aliases() {
        let components = resolve_components(&request()).unwrap();
        assert_eq!(components.from.alias.as_deref(), Some("t0"));
        assert_eq!(components.joins.len(), 1);
        assert_eq!(components.joins[0].on.len(), 2);
        assert_eq!(
            components.dimensions[0].expr,
            SqlExpr::column(Some("t1"), "name")
        );
        assert_eq!(components.metrics[0].alias, "$clicks");
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let request = request().metric(Metric::new(
            Field::new("device", DataType::Number, Expr::sum(Expr::column("x"))).unwrap(),
        ));
        assert!(matches!(
            resolve_components(&request),
            Err(SlicerError::DuplicateAlias(alias)) if alias == "$device"
        ));
    }

    #[test]
    fn empty_projection_is_rejected() {
        let request = QueryRequest::new("clicks");
        assert!(matches!(
            resolve_components(&request),
            Err(SlicerError::EmptyProjection)
        ));
    }

    #[test]
    fn unknown_tables_are_rejected() {
        let request = QueryRequest::new("clicks").dimension(Dimension::new(
            Field::new("x", DataType::Text, Expr::table_column("ghost", "x")).unwrap(),
        ));
        assert!(matches!(
            resolve_components(&request),
            Err(SlicerError::UnknownTable(t)) if t == "ghost"
        ));
    }
}
