//! Dimension ordering and grouping.
//!
//! Dimensions that are neither rolled up nor totals-dimensions come first,
//! flagged ones after them, each group in input order. Members of a
//! composite rollup group are pulled next to the first of them. The same
//! ordering is used for SELECT, GROUP BY and ORDER BY.

use crate::error::{Result, SlicerError};
use crate::models::{RollupGroup, SortDirection};
use crate::sql_ast::{GroupItem, OrderItem, SqlExpr};

use super::components::ResolvedDimension;

#[derive(Debug, Clone)]
pub(crate) struct RollupPlan {
    pub dimensions: Vec<ResolvedDimension>,
    /// Keys of each `ROLLUP(...)` argument, in request order.
    groups: Vec<Vec<String>>,
}

impl RollupPlan {
    /// Mark the rollup set and partition the dimensions.
    pub fn build(mut dimensions: Vec<ResolvedDimension>, rollup: &[RollupGroup]) -> Result<Self> {
        let mut groups = Vec::with_capacity(rollup.len());
        for group in rollup {
            if group.keys().is_empty() {
                return Err(SlicerError::InvalidRequest(
                    "empty rollup group".to_string(),
                ));
            }
            for key in group.keys() {
                let dim = dimensions
                    .iter_mut()
                    .find(|d| &d.key == key && d.grouped)
                    .ok_or_else(|| SlicerError::UnknownDimension(key.clone()))?;
                if dim.rollup {
                    return Err(SlicerError::InvalidRequest(format!(
                        "dimension {key} is rolled up more than once"
                    )));
                }
                dim.rollup = true;
            }
            groups.push(group.keys().to_vec());
        }
        let mut plan = Self::partitioned(dimensions);
        plan.groups = groups;
        plan.gather_groups();
        Ok(plan)
    }

    /// Stable partition without touching the rollup set.
    pub fn partitioned(dimensions: Vec<ResolvedDimension>) -> Self {
        let (plain, flagged): (Vec<_>, Vec<_>) =
            dimensions.into_iter().partition(|d| !d.is_flagged());
        Self {
            dimensions: plain.into_iter().chain(flagged).collect(),
            groups: Vec::new(),
        }
    }

    fn group_of(&self, key: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.iter().any(|k| k == key))
    }

    /// Move each composite group's members up to its first member.
    fn gather_groups(&mut self) {
        let first_seen: Vec<usize> = (0..self.dimensions.len())
            .map(|idx| {
                let key = &self.dimensions[idx].key;
                match self.group_of(key) {
                    Some(group) if self.dimensions[idx].rollup => self
                        .dimensions
                        .iter()
                        .position(|d| d.rollup && self.group_of(&d.key) == Some(group))
                        .unwrap_or(idx),
                    _ => idx,
                }
            })
            .collect();
        let mut order: Vec<usize> = (0..self.dimensions.len()).collect();
        order.sort_by_key(|&idx| (first_seen[idx], idx));
        let mut slots: Vec<Option<ResolvedDimension>> =
            std::mem::take(&mut self.dimensions).into_iter().map(Some).collect();
        self.dimensions = order.into_iter().filter_map(|idx| slots[idx].take()).collect();
    }

    pub fn keys(&self) -> Vec<String> {
        self.dimensions.iter().map(|d| d.key.clone()).collect()
    }

    /// Keys of the totals-dimensions, in output order.
    pub fn totals_keys(&self) -> Vec<String> {
        self.dimensions
            .iter()
            .filter(|d| d.totals)
            .map(|d| d.key.clone())
            .collect()
    }

    /// GROUP BY entries referencing the dimension aliases. With
    /// `with_rollup` unset every grouped dimension is grouped plainly.
    pub fn group_by(&self, with_rollup: bool) -> Vec<GroupItem> {
        let mut items = Vec::new();
        let mut rolled: Vec<(usize, Vec<SqlExpr>)> = Vec::new();
        for dim in self.dimensions.iter().filter(|d| d.grouped) {
            let alias_ref = SqlExpr::column(None, &dim.alias);
            match self.group_of(&dim.key) {
                Some(group) if with_rollup && dim.rollup => {
                    match rolled.iter_mut().find(|(g, _)| *g == group) {
                        Some((_, members)) => members.push(alias_ref),
                        None => rolled.push((group, vec![alias_ref])),
                    }
                }
                _ => items.push(GroupItem::Expr(alias_ref)),
            }
        }
        if !rolled.is_empty() {
            items.push(GroupItem::Rollup(
                rolled.into_iter().map(|(_, members)| members).collect(),
            ));
        }
        items
    }

    /// ORDER BY the grouped dimension aliases, optionally qualified.
    pub fn order_by(&self, table: Option<&str>) -> Vec<OrderItem> {
        self.dimensions
            .iter()
            .filter(|d| d.grouped)
            .map(|d| OrderItem {
                expr: SqlExpr::column(table, &d.alias),
                direction: SortDirection::Asc,
            })
            .collect()
    }
}
