//! Queries listing the distinct values of dimensions, e.g. to populate
//! filter choices.

use crate::error::{Result, SlicerError};
use crate::models::QueryRequest;
use crate::sql_ast::{SelectItem, SelectQuery};

use super::components::resolve_components;
use super::plan::FlatPlan;

/// `SELECT DISTINCT <dimensions> FROM ... WHERE <dimension filters> LIMIT n`.
/// Metrics, references, rollups and result sets play no part.
pub fn dimension_options(request: &QueryRequest) -> Result<SelectQuery> {
    if request.dimensions.is_empty() {
        return Err(SlicerError::EmptyProjection);
    }
    let components = resolve_components(request)?;

    let mut plan = FlatPlan::new(components.from.clone());
    plan.distinct = true;
    plan.joins = components.joins.clone();
    plan.select = components
        .dimensions
        .iter()
        .map(|d| SelectItem {
            expr: d.expr.clone(),
            alias: Some(d.alias.clone()),
        })
        .collect();
    plan.filters = components
        .filters
        .iter()
        .map(|f| f.predicate())
        .collect::<Result<Vec<_>>>()?;
    plan.limit = components.limit;
    plan.offset = components.offset;
    Ok(plan.into_select_query())
}
