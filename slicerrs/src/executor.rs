use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
}

/// Rows keyed by the compiler's output aliases.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    /// Build a result from rows, taking column names from the first row.
    pub fn from_rows(rows: Vec<Map<String, Value>>) -> Self {
        let columns = rows
            .first()
            .map(|row| {
                row.keys()
                    .map(|name| ColumnMeta { name: name.clone() })
                    .collect()
            })
            .unwrap_or_default();
        Self { columns, rows }
    }
}

/// Runs rendered SQL against a database. Drivers live outside this crate.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn query(&self, sql: &str) -> Result<QueryResult>;
}
