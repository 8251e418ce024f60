//! DuckDB dialect implementation.

use super::Dialect;

#[derive(Debug, Default, Clone, Copy)]
pub struct DuckDbDialect;

impl Dialect for DuckDbDialect {
    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Function, TimeGrain};

    #[test]
    fn quotes_and_escapes_identifiers() {
        assert_eq!(DuckDbDialect.quote_ident("$set(a=\"b\")"), "\"$set(a=\"\"b\"\")\"");
    }

    #[test]
    fn renders_intervals_and_truncation() {
        assert_eq!(
            DuckDbDialect.render_interval(52, &TimeGrain::Week),
            "INTERVAL 52 WEEK"
        );
        assert_eq!(
            DuckDbDialect.render_function(
                &Function::DateTrunc(TimeGrain::Month),
                vec!["\"dt\"".to_string()]
            ),
            "date_trunc('month', \"dt\")"
        );
    }
}
