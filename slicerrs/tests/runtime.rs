mod fixtures;

use std::sync::Mutex;

use async_trait::async_trait;
use fixtures::*;
use serde_json::{json, Map, Value};
use slicer::executor::ColumnMeta;
use slicer::{
    run_compiled, run_request, Dimension, DuckDbDialect, QueryExecutor, QueryResult, SlicerError,
    SqlBuilder, StatementKind,
};

/// Answers totals statements with one marker row and everything else with
/// two detail rows; records every statement it sees.
#[derive(Default)]
struct CannedExecutor {
    seen: Mutex<Vec<String>>,
    fail_totals: bool,
}

fn row(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("row must be an object"),
    }
}

#[async_trait]
impl QueryExecutor for CannedExecutor {
    async fn query(&self, sql: &str) -> slicer::Result<QueryResult> {
        self.seen.lock().unwrap().push(sql.to_string());
        if sql.contains("_ROLLUP_TOTALS_") {
            if self.fail_totals {
                return Err(SlicerError::Execution("totals failed".to_string()));
            }
            return Ok(QueryResult::from_rows(vec![row(
                json!({"$cat": "_ROLLUP_TOTALS_", "$clicks": 7}),
            )]));
        }
        Ok(QueryResult::from_rows(vec![
            row(json!({"$cat": "a", "$clicks": 3})),
            row(json!({"$cat": "b", "$clicks": 4})),
        ]))
    }
}

fn request() -> slicer::QueryRequest {
    data()
        .dimension(Dimension::rollup(category()))
        .metric(metric(clicks()))
}

#[tokio::test]
async fn rows_come_back_base_first_then_totals() {
    slicer::logging::init();
    let executor = CannedExecutor::default();
    let result = run_request(&SqlBuilder::default(), &executor, &request())
        .await
        .unwrap();

    assert_eq!(result.statements.len(), 2);
    assert_eq!(result.statements[0].0, StatementKind::Base);
    assert_eq!(
        result.statements[1].0,
        StatementKind::Totals {
            dimensions: vec!["cat".to_string()]
        }
    );

    let rows = result.rows();
    let cats: Vec<_> = rows.iter().map(|r| r["$cat"].clone()).collect();
    assert_eq!(cats, vec![json!("a"), json!("b"), json!("_ROLLUP_TOTALS_")]);
    assert_eq!(executor.seen.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn totals_rows_are_flagged_by_the_compiled_query() {
    let executor = CannedExecutor::default();
    let compiled = SqlBuilder::default().compile(&request()).unwrap();
    let result = run_compiled(&executor, &compiled, &DuckDbDialect)
        .await
        .unwrap();
    let flags: Vec<_> = result
        .rows()
        .iter()
        .map(|r| compiled.is_totals_row(r))
        .collect();
    assert_eq!(flags, vec![false, false, true]);
    assert_eq!(
        result.statements[0].1.columns,
        vec![
            ColumnMeta {
                name: "$cat".to_string()
            },
            ColumnMeta {
                name: "$clicks".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn executor_sees_rendered_sql() {
    let executor = CannedExecutor::default();
    let compiled = SqlBuilder::default().compile(&request()).unwrap();
    run_compiled(&executor, &compiled, &DuckDbDialect)
        .await
        .unwrap();
    let mut seen = executor.seen.lock().unwrap().clone();
    seen.sort();
    let mut expected = compiled.render(&DuckDbDialect);
    expected.sort();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn statement_failure_fails_the_request() {
    let executor = CannedExecutor {
        fail_totals: true,
        ..Default::default()
    };
    let err = run_request(&SqlBuilder::default(), &executor, &request())
        .await
        .unwrap_err();
    assert!(matches!(err, SlicerError::Execution(msg) if msg == "totals failed"));
}

#[tokio::test]
async fn compile_errors_skip_execution() {
    let executor = CannedExecutor::default();
    let err = run_request(&SqlBuilder::default(), &executor, &data())
        .await
        .unwrap_err();
    assert!(matches!(err, SlicerError::EmptyProjection));
    assert!(executor.seen.lock().unwrap().is_empty());
}
