use crate::models::TimeGrain;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    // Output names are shadowed by input columns in GROUP BY and cannot be
    // used inside grouping sets, so group by expression.
    fn groups_by_alias(&self) -> bool {
        false
    }

    fn median(&self, expr: &str) -> String {
        format!("PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY {expr})")
    }

    fn render_interval(&self, quantity: i64, unit: &TimeGrain) -> String {
        // PostgreSQL has no quarter interval unit
        match unit {
            TimeGrain::Quarter => format!("INTERVAL '{} months'", quantity * 3),
            TimeGrain::Day => format!("INTERVAL '{quantity} days'"),
            TimeGrain::Week => format!("INTERVAL '{quantity} weeks'"),
            TimeGrain::Month => format!("INTERVAL '{quantity} months'"),
            TimeGrain::Year => format!("INTERVAL '{quantity} years'"),
        }
    }
}
