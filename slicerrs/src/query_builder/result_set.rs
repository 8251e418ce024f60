//! Result-set rewriting.
//!
//! A result-set filter never restricts rows. It turns its dimension into a
//! `CASE WHEN <predicate> THEN <set> ELSE <complement> END` column, either in
//! place of the filtered dimension or as an extra `set(<predicate>)` column.

use std::collections::HashSet;

use serde_json::Value;

use crate::error::{Result, SlicerError};
use crate::models::{alias_for, DataType, ResultSetFilter};
use crate::sql_ast::SqlExpr;

use super::components::ResolvedDimension;
use super::filters::{describe_filter, render_filter_expr};
use super::render::expr_to_sql;
use super::resolve::TableAliases;

/// Apply every result-set filter, in declaration order, to the dimensions.
pub(crate) fn apply_result_sets(
    mut dimensions: Vec<ResolvedDimension>,
    result_sets: &[ResultSetFilter],
    tables: &TableAliases,
) -> Result<Vec<ResolvedDimension>> {
    // keys whose column already holds a CASE from an earlier filter
    let mut rewritten = HashSet::new();
    for rs in result_sets {
        let field = &rs.filter.field;
        let text = describe_filter(&rs.filter)?;
        let raw = expr_to_sql(&field.definition, tables)?;
        let case = case_expr(rs, &text, raw.clone())?;
        let position = dimensions.iter().position(|d| d.key == field.key);

        // grouping by an aggregate is invalid, the column is only selected
        if field.definition.is_aggregate() {
            dimensions.push(pseudo_dimension(&text, case, false));
            continue;
        }

        if rs.will_replace_referenced_dimension && !rewritten.insert(field.key.clone()) {
            return Err(SlicerError::InvalidRequest(format!(
                "dimension {} is already replaced by another result-set filter",
                field.key
            )));
        }

        match (rs.will_replace_referenced_dimension, position) {
            (true, Some(idx)) => dimensions[idx].expr = case,
            (true, None) => dimensions.push(ResolvedDimension {
                key: field.key.clone(),
                alias: field.alias(),
                data_type: field.data_type,
                expr: case,
                totals: false,
                rollup: false,
                grouped: true,
            }),
            (false, Some(idx)) => dimensions.insert(idx, pseudo_dimension(&text, case, true)),
            (false, None) => dimensions.push(pseudo_dimension(&text, case, true)),
        }
    }
    Ok(dimensions)
}

fn case_expr(rs: &ResultSetFilter, text: &str, raw: SqlExpr) -> Result<SqlExpr> {
    let (set_label, complement_label) = match (&rs.set_label, &rs.complement_label) {
        (None, None) => (
            Some(format!("set({text})")),
            Some(format!("complement({text})")),
        ),
        (set, complement) => (set.clone(), complement.clone()),
    };
    let then = label(set_label);
    let otherwise = if rs.will_group_complement {
        label(complement_label)
    } else {
        raw.clone()
    };
    Ok(SqlExpr::Case {
        branches: vec![(render_filter_expr(raw, &rs.filter)?, then)],
        else_expr: Box::new(otherwise),
    })
}

fn label(text: Option<String>) -> SqlExpr {
    SqlExpr::Literal(text.map(Value::String).unwrap_or(Value::Null))
}

fn pseudo_dimension(text: &str, expr: SqlExpr, grouped: bool) -> ResolvedDimension {
    let key = format!("set({text})");
    ResolvedDimension {
        alias: alias_for(&key),
        key,
        data_type: DataType::Text,
        expr,
        totals: false,
        rollup: false,
        grouped,
    }
}
