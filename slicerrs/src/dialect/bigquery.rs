use crate::models::TimeGrain;

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct BigQueryDialect;

impl Dialect for BigQueryDialect {
    fn quote_ident(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "\\`"))
    }

    fn date_trunc(&self, grain: &TimeGrain, expr: &str) -> String {
        format!("DATE_TRUNC({expr}, {})", unit(grain))
    }

    fn median(&self, expr: &str) -> String {
        format!("APPROX_QUANTILES({expr}, 2)[OFFSET(1)]")
    }

    fn escape_string(&self, value: &str) -> String {
        value.replace('\\', "\\\\").replace('\'', "\\'")
    }

    fn render_interval(&self, quantity: i64, grain: &TimeGrain) -> String {
        format!("INTERVAL {quantity} {}", unit(grain))
    }
}

fn unit(grain: &TimeGrain) -> &'static str {
    match grain {
        TimeGrain::Day => "DAY",
        TimeGrain::Week => "WEEK",
        TimeGrain::Month => "MONTH",
        TimeGrain::Quarter => "QUARTER",
        TimeGrain::Year => "YEAR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Aggregation, Function};

    #[test]
    fn uses_backticks_and_backslash_escapes() {
        assert_eq!(BigQueryDialect.quote_ident("$clicks"), "`$clicks`");
        assert_eq!(
            BigQueryDialect.render_literal(&serde_json::json!("it's")),
            "'it\\'s'"
        );
    }

    #[test]
    fn truncation_takes_the_grain_last() {
        assert_eq!(
            BigQueryDialect.render_function(
                &Function::DateTrunc(TimeGrain::Quarter),
                vec!["`dt`".to_string()]
            ),
            "DATE_TRUNC(`dt`, QUARTER)"
        );
    }

    #[test]
    fn median_is_approximate() {
        assert_eq!(
            BigQueryDialect.render_aggregation(&Aggregation::Median, "`x`"),
            "APPROX_QUANTILES(`x`, 2)[OFFSET(1)]"
        );
        assert_eq!(
            BigQueryDialect.render_aggregation(&Aggregation::Sum, "`x`"),
            "SUM(`x`)"
        );
    }
}
