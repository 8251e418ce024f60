//! Query planner orchestration.
//!
//! Compilation runs in a fixed order:
//! 1. Resolve all components from the request
//! 2. Rewrite dimensions for result-set filters
//! 3. Order and group dimensions (rollup planning)
//! 4. Bind references to their anchor dimensions
//! 5. Validate output aliases
//! 6. Build the base statement and one statement per totals-dimension

use std::collections::HashSet;

use crate::config::CompilerConfig;
use crate::error::{Result, SlicerError};
use crate::models::QueryRequest;
use crate::output::{CompiledQuery, CompiledStatement, StatementKind};
use crate::sql_ast::{SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr};

use super::components::{resolve_components, QueryComponents, ResolvedDimension};
use super::plan::{ComparedPlan, ComparisonJoin, FlatPlan, QueryPlan, BASE_ALIAS};
use super::references::{resolve_references, transform_metric, ResolvedReference};
use super::result_set::apply_result_sets;
use super::rollup::RollupPlan;

/// Compile a request into its statements.
pub fn compile(request: &QueryRequest, config: &CompilerConfig) -> Result<CompiledQuery> {
    let components = resolve_components(request)?;
    let dimensions = apply_result_sets(
        components.dimensions.clone(),
        &components.result_sets,
        &components.tables,
    )?;
    let dimensions = RollupPlan::build(dimensions, &request.rollup)?;
    // comparison sub-queries see the declared dimensions only
    let declared = RollupPlan::partitioned(components.dimensions.clone());
    let references = resolve_references(&request.references, &components.dimensions)?;

    let builder = StatementBuilder {
        components: &components,
        dimensions: &dimensions,
        declared: &declared,
        references: &references,
        config,
    };
    builder.validate_aliases()?;

    let totals_keys = dimensions.totals_keys();
    let mut statements = vec![CompiledStatement {
        kind: StatementKind::Base,
        query: builder.build(&[])?,
    }];
    for idx in 0..totals_keys.len() {
        let collapsed = &totals_keys[idx..];
        statements.push(CompiledStatement {
            kind: StatementKind::Totals {
                dimensions: collapsed.to_vec(),
            },
            query: builder.build(collapsed)?,
        });
    }

    tracing::debug!(
        table = %request.table,
        statements = statements.len(),
        dimensions = ?dimensions.keys(),
        references = references.len(),
        "compiled request"
    );

    Ok(CompiledQuery {
        statements,
        dimension_keys: dimensions.keys(),
        metric_keys: components.metrics.iter().map(|m| m.key.clone()).collect(),
        rollup_keys: dimensions
            .dimensions
            .iter()
            .filter(|d| d.rollup)
            .map(|d| d.key.clone())
            .collect(),
        references: request.references.clone(),
        totals_marker: config.totals_marker.clone(),
    })
}

struct StatementBuilder<'a> {
    components: &'a QueryComponents,
    dimensions: &'a RollupPlan,
    declared: &'a RollupPlan,
    references: &'a [ResolvedReference],
    config: &'a CompilerConfig,
}

impl StatementBuilder<'_> {
    /// Every output column of every statement must have its own alias.
    fn validate_aliases(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let base = self
            .dimensions
            .dimensions
            .iter()
            .map(|d| d.alias.clone())
            .chain(self.components.metrics.iter().map(|m| m.alias.clone()));
        let compared = self.references.iter().flat_map(|r| {
            std::iter::once(r.column_alias(&r.anchor_alias)).chain(
                self.components
                    .metrics
                    .iter()
                    .map(move |m| r.column_alias(&m.alias)),
            )
        });
        for alias in base.chain(compared) {
            if !seen.insert(alias.clone()) {
                return Err(SlicerError::DuplicateAlias(alias));
            }
        }
        Ok(())
    }

    /// Build one statement with the `collapsed` dimensions replaced by the
    /// totals marker.
    fn build(&self, collapsed: &[String]) -> Result<SelectQuery> {
        let base = self.base_plan(collapsed)?;
        if self.references.is_empty() {
            return Ok(QueryPlan::Flat(base).into_select_query());
        }

        let mut compared = ComparedPlan::new(base);
        for reference in self.references {
            let alias = reference.name.as_str();
            compared.select.push(SelectItem {
                expr: SqlExpr::column(Some(alias), &reference.anchor_alias),
                alias: Some(reference.column_alias(&reference.anchor_alias)),
            });
            for metric in &self.components.metrics {
                compared.select.push(SelectItem {
                    expr: transform_metric(
                        reference.reference.modifier,
                        SqlExpr::column(Some(BASE_ALIAS), &metric.alias),
                        SqlExpr::column(Some(alias), &metric.alias),
                        self.config.guard_percentage_division,
                    ),
                    alias: Some(reference.column_alias(&metric.alias)),
                });
            }
            compared.comparisons.push(ComparisonJoin {
                alias: alias.to_string(),
                query: self.comparison_plan(reference, collapsed)?,
                join_type: self.config.reference_join.into(),
                on: self.join_predicate(reference, collapsed),
            });
        }
        compared.order_by = self.dimensions.order_by(Some(BASE_ALIAS));
        Ok(QueryPlan::Compared(compared).into_select_query())
    }

    fn base_plan(&self, collapsed: &[String]) -> Result<FlatPlan> {
        let c = self.components;
        let mut plan = FlatPlan::new(c.from.clone());
        plan.joins = c.joins.clone();
        plan.select = self
            .dimensions
            .dimensions
            .iter()
            .map(|d| self.dimension_item(d, collapsed))
            .collect();
        plan.select.extend(c.metrics.iter().map(|m| SelectItem {
            expr: m.expr.clone(),
            alias: Some(m.alias.clone()),
        }));
        plan.filters = c
            .filters
            .iter()
            .map(|f| f.predicate())
            .collect::<Result<Vec<_>>>()?;
        plan.group_by = self.dimensions.group_by(true);
        plan.having = c.having.clone();
        plan.order_by = self.dimensions.order_by(None);
        plan.limit = c.limit;
        plan.offset = c.offset;
        Ok(plan)
    }

    /// Declared dimensions and metrics over the same tables, with filters on
    /// the anchor's columns shifted by the reference interval. No result-set rewrite,
    /// no ROLLUP, no HAVING.
    fn comparison_plan(&self, reference: &ResolvedReference, collapsed: &[String]) -> Result<FlatPlan> {
        let c = self.components;
        let mut plan = FlatPlan::new(c.from.clone());
        plan.joins = c.joins.clone();
        plan.select = self
            .declared
            .dimensions
            .iter()
            .map(|d| self.dimension_item(d, collapsed))
            .collect();
        plan.select.extend(c.metrics.iter().map(|m| SelectItem {
            expr: m.expr.clone(),
            alias: Some(m.alias.clone()),
        }));
        plan.filters = c
            .filters
            .iter()
            .map(|f| {
                if reference.constrains_anchor(&f.filter.field.key, &f.field_expr) {
                    f.predicate_on(reference.shift(f.field_expr.clone()))
                } else {
                    f.predicate()
                }
            })
            .collect::<Result<Vec<_>>>()?;
        plan.group_by = self.declared.group_by(false);
        Ok(plan)
    }

    /// `base.<anchor> = cmp.<anchor> - INTERVAL` AND equality on every other
    /// comparison dimension.
    fn join_predicate(&self, reference: &ResolvedReference, collapsed: &[String]) -> Vec<SqlExpr> {
        let alias = reference.name.as_str();
        let anchor = SqlExpr::column(Some(alias), &reference.anchor_alias);
        // a collapsed anchor holds the marker on both sides
        let anchor = if collapsed.contains(&reference.anchor_key) {
            anchor
        } else {
            reference.shift(anchor)
        };
        let mut on = vec![SqlExpr::binary(
            SqlBinaryOperator::Eq,
            SqlExpr::column(Some(BASE_ALIAS), &reference.anchor_alias),
            anchor,
        )];
        on.extend(
            self.declared
                .dimensions
                .iter()
                .filter(|d| d.key != reference.anchor_key)
                .map(|d| {
                    SqlExpr::binary(
                        SqlBinaryOperator::Eq,
                        SqlExpr::column(Some(BASE_ALIAS), &d.alias),
                        SqlExpr::column(Some(alias), &d.alias),
                    )
                }),
        );
        on
    }

    fn dimension_item(&self, dim: &ResolvedDimension, collapsed: &[String]) -> SelectItem {
        let expr = if collapsed.contains(&dim.key) {
            SqlExpr::Literal(serde_json::Value::String(self.config.totals_marker.clone()))
        } else {
            dim.expr.clone()
        };
        SelectItem {
            expr,
            alias: Some(dim.alias.clone()),
        }
    }
}
