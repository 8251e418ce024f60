use serde_json::Value;

use crate::error::{Result, SlicerError};
use crate::models::{Filter, FilterOp};
use crate::sql_ast::{SqlBinaryOperator, SqlExpr};

use super::render::{describe_sql, expr_to_plain_sql};

/// Build the predicate of `filter` applied to `base_expr`.
pub(crate) fn render_filter_expr(base_expr: SqlExpr, filter: &Filter) -> Result<SqlExpr> {
    let expr = Box::new(base_expr);
    match filter.op {
        FilterOp::In | FilterOp::NotIn => {
            let list: Vec<SqlExpr> = match &filter.value {
                Value::Array(items) => items.iter().map(|v| SqlExpr::Literal(v.clone())).collect(),
                Value::Null => Vec::new(),
                other => vec![SqlExpr::Literal(other.clone())],
            };
            if list.is_empty() {
                return Err(invalid(filter, "expects at least one value"));
            }
            Ok(SqlExpr::InList {
                expr,
                list,
                negated: matches!(filter.op, FilterOp::NotIn),
            })
        }
        FilterOp::Between => match &filter.value {
            Value::Array(bounds) if bounds.len() == 2 => Ok(SqlExpr::Between {
                expr,
                low: Box::new(SqlExpr::Literal(bounds[0].clone())),
                high: Box::new(SqlExpr::Literal(bounds[1].clone())),
            }),
            _ => Err(invalid(filter, "expects a [low, high] pair")),
        },
        FilterOp::IsNull | FilterOp::IsNotNull => Ok(SqlExpr::IsNull {
            expr,
            negated: matches!(filter.op, FilterOp::IsNotNull),
        }),
        FilterOp::Eq => compare(expr, filter, SqlBinaryOperator::Eq),
        FilterOp::Neq => compare(expr, filter, SqlBinaryOperator::Neq),
        FilterOp::Gt => compare(expr, filter, SqlBinaryOperator::Gt),
        FilterOp::Gte => compare(expr, filter, SqlBinaryOperator::Gte),
        FilterOp::Lt => compare(expr, filter, SqlBinaryOperator::Lt),
        FilterOp::Lte => compare(expr, filter, SqlBinaryOperator::Lte),
        FilterOp::Like => compare(expr, filter, SqlBinaryOperator::Like),
    }
}

/// `<expr> <op> <scalar value>`
fn compare(expr: Box<SqlExpr>, filter: &Filter, op: SqlBinaryOperator) -> Result<SqlExpr> {
    match &filter.value {
        Value::Null => Err(invalid(filter, "compares against null; use is_null")),
        Value::Array(_) | Value::Object(_) => Err(invalid(filter, "expects a single scalar value")),
        value if op == SqlBinaryOperator::Like && !value.is_string() => {
            Err(invalid(filter, "like expects a string pattern"))
        }
        value => Ok(SqlExpr::BinaryOp {
            op,
            left: expr,
            right: Box::new(SqlExpr::Literal(value.clone())),
        }),
    }
}

/// Plain text of the predicate over the field's definition, e.g. `text='abc'`.
pub(crate) fn describe_filter(filter: &Filter) -> Result<String> {
    let base = expr_to_plain_sql(&filter.field.definition)?;
    Ok(describe_sql(&render_filter_expr(base, filter)?))
}

fn invalid(filter: &Filter, reason: &str) -> SlicerError {
    SlicerError::InvalidRequest(format!(
        "filter on {} ({:?}) {reason}",
        filter.field.key, filter.op
    ))
}
