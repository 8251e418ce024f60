use std::time::Instant;

use futures::future::try_join_all;
use serde_json::{Map, Value};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::executor::{QueryExecutor, QueryResult};
use crate::output::{CompiledQuery, StatementKind};
use crate::query_builder::SqlBuilder;

/// Results of every statement of one request, in statement order.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestResult {
    pub statements: Vec<(StatementKind, QueryResult)>,
}

impl RequestResult {
    /// Base rows followed by the totals rows.
    pub fn rows(&self) -> Vec<Map<String, Value>> {
        self.statements
            .iter()
            .flat_map(|(_, result)| result.rows.iter().cloned())
            .collect()
    }
}

/// Render and execute every statement of a compiled request concurrently.
pub async fn run_compiled(
    executor: &dyn QueryExecutor,
    compiled: &CompiledQuery,
    dialect: &dyn Dialect,
) -> Result<RequestResult> {
    let sqls = compiled.render(dialect);
    let runs = compiled
        .statements
        .iter()
        .zip(sqls)
        .enumerate()
        .map(|(idx, (statement, sql))| async move {
            let started = Instant::now();
            tracing::trace!(statement = idx, sql = %sql, "executing statement");
            match executor.query(&sql).await {
                Ok(result) => {
                    tracing::info!(
                        statement = idx,
                        kind = ?statement.kind,
                        rows = result.rows.len(),
                        duration_ms = started.elapsed().as_millis() as u64,
                        "statement finished"
                    );
                    Ok((statement.kind.clone(), result))
                }
                Err(e) => {
                    tracing::error!(statement = idx, error = %e, "statement failed");
                    Err(e)
                }
            }
        });
    let statements = try_join_all(runs).await?;
    Ok(RequestResult { statements })
}

/// Compile a request with the builder's config and run it.
pub async fn run_request(
    builder: &SqlBuilder,
    executor: &dyn QueryExecutor,
    request: &crate::models::QueryRequest,
) -> Result<RequestResult> {
    let compiled = builder.compile(request)?;
    run_compiled(executor, &compiled, builder.config().dialect.dialect()).await
}
