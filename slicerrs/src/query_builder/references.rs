//! Period-over-period references.
//!
//! Each reference is lowered into its own comparison sub-query, joined to
//! the base query on the anchor date shifted by the reference interval.

use std::collections::{BTreeSet, HashSet};

use crate::error::{Result, SlicerError};
use crate::models::{DataType, Reference, ReferenceKind, ReferenceModifier, TimeGrain};
use crate::sql_ast::{SqlBinaryOperator, SqlExpr};

use super::components::ResolvedDimension;

/// Shift between a period and the one it is compared with.
pub fn interval(kind: ReferenceKind) -> (i64, TimeGrain) {
    match kind {
        ReferenceKind::WeekOverWeek => (1, TimeGrain::Week),
        ReferenceKind::MonthOverMonth => (4, TimeGrain::Week),
        ReferenceKind::QuarterOverQuarter => (1, TimeGrain::Quarter),
        ReferenceKind::YearOverYear => (52, TimeGrain::Week),
    }
}

/// A reference bound to a selected date dimension.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedReference {
    pub reference: Reference,
    /// Reference name, also the alias of its comparison sub-query.
    pub name: String,
    pub anchor_key: String,
    pub anchor_alias: String,
    /// Columns the anchor definition reads.
    pub anchor_columns: BTreeSet<(Option<String>, String)>,
    pub quantity: i64,
    pub unit: TimeGrain,
}

impl ResolvedReference {
    pub fn interval_expr(&self) -> SqlExpr {
        SqlExpr::Interval {
            quantity: self.quantity,
            unit: self.unit,
        }
    }

    /// `expr - INTERVAL <n> <unit>`
    pub fn shift(&self, expr: SqlExpr) -> SqlExpr {
        SqlExpr::binary(SqlBinaryOperator::Subtract, expr, self.interval_expr())
    }

    /// Whether a WHERE filter on `field_expr` constrains the anchor's
    /// period: same field, or an expression over the same columns (a raw
    /// `dt` filter under a truncated `dt` dimension).
    pub fn constrains_anchor(&self, key: &str, field_expr: &SqlExpr) -> bool {
        if key == self.anchor_key {
            return true;
        }
        !self.anchor_columns.is_empty() && field_expr.columns() == self.anchor_columns
    }

    /// Output alias of a comparison column, e.g. `$clicks_wow_d`.
    pub fn column_alias(&self, alias: &str) -> String {
        format!("{alias}_{}", self.name)
    }
}

pub(crate) fn resolve_references(
    references: &[Reference],
    dimensions: &[ResolvedDimension],
) -> Result<Vec<ResolvedReference>> {
    let mut names = HashSet::new();
    references
        .iter()
        .map(|reference| {
            let name = reference.name();
            if !names.insert(name.clone()) {
                return Err(SlicerError::DuplicateAlias(name));
            }
            let anchor = dimensions
                .iter()
                .find(|d| d.key == reference.dimension)
                .ok_or_else(|| SlicerError::UnknownDimension(reference.dimension.clone()))?;
            if anchor.data_type != DataType::Date {
                return Err(SlicerError::IncompatibleReference {
                    reference: name,
                    dimension: anchor.key.clone(),
                    reason: format!("expected a date dimension, found {:?}", anchor.data_type),
                });
            }
            let (quantity, unit) = interval(reference.kind);
            Ok(ResolvedReference {
                reference: reference.clone(),
                name,
                anchor_key: anchor.key.clone(),
                anchor_alias: anchor.alias.clone(),
                anchor_columns: anchor.expr.columns(),
                quantity,
                unit,
            })
        })
        .collect()
}

/// Comparison column for one metric: the compared value itself, its
/// difference to the base value, or that difference relative to it.
pub(crate) fn transform_metric(
    modifier: ReferenceModifier,
    base: SqlExpr,
    compare: SqlExpr,
    guard_division: bool,
) -> SqlExpr {
    match modifier {
        ReferenceModifier::Plain => compare,
        ReferenceModifier::Delta => SqlExpr::binary(SqlBinaryOperator::Subtract, base, compare),
        ReferenceModifier::DeltaPercent => {
            let delta = SqlExpr::binary(SqlBinaryOperator::Subtract, base, compare.clone());
            let divisor = if guard_division {
                SqlExpr::Function {
                    func: crate::models::Function::NullIf,
                    args: vec![compare, SqlExpr::Literal(serde_json::json!(0))],
                }
            } else {
                compare
            };
            SqlExpr::binary(SqlBinaryOperator::Divide, delta, divisor)
        }
    }
}
