//! SQL dialects: DuckDB (default), PostgreSQL and BigQuery.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Aggregation, Function, TimeGrain};

/// Maps logical constructs to SQL fragments. Tree walking lives in
/// `SqlRenderer`; a dialect overrides only the pieces its engine spells
/// differently.
pub trait Dialect {
    fn quote_ident(&self, ident: &str) -> String;

    /// Whether GROUP BY may name select-list aliases instead of repeating
    /// the expressions.
    fn groups_by_alias(&self) -> bool {
        true
    }

    fn date_trunc(&self, grain: &TimeGrain, expr: &str) -> String {
        format!("date_trunc('{}', {expr})", grain_to_str(grain))
    }

    fn median(&self, expr: &str) -> String {
        format!("MEDIAN({expr})")
    }

    /// Body of a quoted string literal.
    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }

    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        let name = match func {
            Function::DateTrunc(grain) => {
                return match args.as_slice() {
                    [expr] => self.date_trunc(grain, expr),
                    _ => "NULL".to_string(),
                };
            }
            Function::Cast { data_type } => {
                return match args.as_slice() {
                    [expr] => format!("CAST({expr} AS {data_type})"),
                    _ => "NULL".to_string(),
                };
            }
            Function::NullIf if args.len() != 2 => return "NULL".to_string(),
            Function::NullIf => "nullif",
            Function::Lower => "lower",
            Function::Upper => "upper",
            Function::Coalesce => "coalesce",
            Function::Concat => "concat",
        };
        format!("{name}({})", args.join(", "))
    }

    fn render_aggregation(&self, agg: &Aggregation, expr: &str) -> String {
        match agg {
            Aggregation::Sum => format!("SUM({expr})"),
            Aggregation::Count => format!("COUNT({expr})"),
            Aggregation::CountDistinct => format!("COUNT(DISTINCT {expr})"),
            Aggregation::Min => format!("MIN({expr})"),
            Aggregation::Max => format!("MAX({expr})"),
            Aggregation::Avg => format!("AVG({expr})"),
            Aggregation::Median => self.median(expr),
        }
    }

    /// Arrays render as comma-separated lists for `IN (...)`.
    fn render_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("'{}'", self.escape_string(s)),
            Value::Array(items) => items
                .iter()
                .map(|v| self.render_literal(v))
                .collect::<Vec<_>>()
                .join(", "),
            Value::Object(_) => format!("'{}'", self.escape_string(&value.to_string())),
        }
    }

    fn render_interval(&self, quantity: i64, unit: &TimeGrain) -> String {
        format!("INTERVAL {quantity} {}", grain_to_str(unit).to_uppercase())
    }
}

/// Convert TimeGrain to SQL unit keyword.
pub(crate) fn grain_to_str(grain: &TimeGrain) -> &'static str {
    match grain {
        TimeGrain::Day => "day",
        TimeGrain::Week => "week",
        TimeGrain::Month => "month",
        TimeGrain::Quarter => "quarter",
        TimeGrain::Year => "year",
    }
}

/// Dialect selector used by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialectKind {
    #[default]
    Duckdb,
    Postgres,
    Bigquery,
}

impl DialectKind {
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            DialectKind::Duckdb => &DuckDbDialect,
            DialectKind::Postgres => &PostgresDialect,
            DialectKind::Bigquery => &BigQueryDialect,
        }
    }
}

mod bigquery;
mod duckdb;
mod postgres;

pub use bigquery::BigQueryDialect;
pub use duckdb::DuckDbDialect;
pub use postgres::PostgresDialect;
