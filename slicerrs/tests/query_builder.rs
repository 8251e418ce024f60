//! Integration tests for the query builder.
//!
//! These tests exercise the public API: SqlBuilder, QueryRequest, CompiledQuery.

mod fixtures;

use fixtures::*;
use serde_json::json;
use slicer::models::FilterOp;
use slicer::{
    BigQueryDialect, CompilerConfig, DialectKind, DuckDbDialect, Filter, PostgresDialect,
    QueryFilter, QueryRequest, SlicerError, SqlBuilder,
};

fn build(request: &QueryRequest) -> Vec<String> {
    SqlBuilder::default()
        .build_with_dialect(request, &DuckDbDialect)
        .unwrap()
}

#[test]
fn builds_grouped_and_ordered_select() {
    let request = data().dimension(dim(text())).metric(metric(aggr_number()));
    let sql = build(&request);
    assert_eq!(sql.len(), 1);
    assert_eq!(
        sql[0],
        "SELECT \"text\" AS \"$text\", SUM(\"number\") AS \"$aggr_number\" FROM \"data\" \
         GROUP BY \"$text\" ORDER BY \"$text\" ASC"
    );
}

#[test]
fn metrics_only_has_no_group_or_order() {
    let request = data().metric(metric(aggr_number()));
    assert_eq!(
        build(&request)[0],
        "SELECT SUM(\"number\") AS \"$aggr_number\" FROM \"data\""
    );
}

#[test]
fn dimension_and_metric_filters_land_in_where_and_having() {
    let request = data()
        .dimension(dim(date()))
        .metric(metric(clicks()))
        .filter(QueryFilter::Dimension(Filter::between(
            date(),
            "2024-01-01",
            "2024-03-31",
        )))
        .filter(QueryFilter::Dimension(Filter::is_in(
            category(),
            vec![json!("a"), json!("b")],
        )))
        .filter(QueryFilter::Metric(Filter::gt(clicks(), 100)));
    let sql = &build(&request)[0];
    assert!(
        sql.contains(
            "WHERE \"dt\" BETWEEN '2024-01-01' AND '2024-03-31' AND \"cat\" IN ('a', 'b') \
             GROUP BY \"$date\" HAVING SUM(\"clicks\")>100 ORDER BY \"$date\" ASC"
        ),
        "{sql}"
    );
}

#[test]
fn joined_tables_are_aliased_in_declaration_order() {
    let request = data()
        .join(devices_join())
        .dimension(dim(device()))
        .dimension(dim(text()))
        .metric(metric(clicks()));
    let sql = &build(&request)[0];
    assert!(sql.starts_with(
        "SELECT \"t1\".\"name\" AS \"$device\", \"t0\".\"text\" AS \"$text\", SUM(\"t0\".\"clicks\") AS \"$clicks\""
    ));
    assert!(sql.contains(
        "FROM \"data\" \"t0\" LEFT JOIN \"devices\" \"t1\" ON \"t0\".\"device_id\"=\"t1\".\"id\""
    ));
}

#[test]
fn limit_and_offset_apply_to_every_statement() {
    let mut request = data()
        .dimension(dim(date()))
        .dimension(slicer::Dimension::rollup(text()))
        .metric(metric(clicks()))
        .limit(20);
    request.offset = Some(40);
    let sql = build(&request);
    assert_eq!(sql.len(), 2);
    assert!(sql.iter().all(|s| s.ends_with("LIMIT 20 OFFSET 40")));
}

#[test]
fn compilation_is_deterministic() {
    let request = data()
        .dimension(dim(date()))
        .dimension(slicer::Dimension::rollup(category()))
        .dimension(dim(text()))
        .metric(metric(clicks()))
        .filter(QueryFilter::ResultSet(slicer::ResultSetFilter::new(
            Filter::eq(text(), "abc"),
        )))
        .reference(slicer::Reference::parse("yoy_p", "date").unwrap());
    assert_eq!(build(&request), build(&request));
}

#[test]
fn empty_projection_is_rejected() {
    let err = SqlBuilder::default()
        .build_with_dialect(&data(), &DuckDbDialect)
        .unwrap_err();
    assert!(matches!(err, SlicerError::EmptyProjection));
}

#[test]
fn malformed_filter_values_fail_before_building() {
    let request = data()
        .dimension(dim(text()))
        .filter(QueryFilter::Dimension(Filter::new(
            text(),
            FilterOp::Between,
            json!("2024-01-01"),
        )));
    let err = SqlBuilder::default().compile(&request).unwrap_err();
    assert!(matches!(err, SlicerError::InvalidRequest(_)));
}

#[test]
fn configured_dialect_is_used_by_build_sql() {
    let request = data().dimension(dim(text())).metric(metric(clicks()));
    let config = CompilerConfig {
        dialect: DialectKind::Bigquery,
        ..Default::default()
    };
    let sql = SqlBuilder::new(config).build_sql(&request).unwrap();
    assert_eq!(
        sql[0],
        "SELECT `text` AS `$text`, SUM(`clicks`) AS `$clicks` FROM `data` GROUP BY `$text` ORDER BY `$text` ASC"
    );

    let bq = SqlBuilder::default()
        .build_with_dialect(&request, &BigQueryDialect)
        .unwrap();
    assert_eq!(sql, bq);
}

#[test]
fn postgres_groups_by_expression() {
    let request = data().dimension(dim(text())).metric(metric(clicks()));
    let sql = SqlBuilder::default()
        .build_with_dialect(&request, &PostgresDialect)
        .unwrap();
    assert!(sql[0].contains("GROUP BY \"text\" ORDER BY \"$text\" ASC"), "{}", sql[0]);
}

#[test]
fn request_from_json_compiles() {
    let request = QueryRequest::from_json(
        r#"{
            "table": "data",
            "dimensions": [{"key": "text", "data_type": "text", "definition": "text"}],
            "metrics": [{
                "key": "aggr_number",
                "data_type": "number",
                "definition": {"type": "aggregate", "agg": "sum", "expr": "number"}
            }],
            "filters": [{
                "kind": "dimension",
                "field": {"key": "text", "data_type": "text", "definition": "text"},
                "op": "neq",
                "value": "x"
            }]
        }"#,
    )
    .unwrap();
    let sql = &build(&request)[0];
    assert!(sql.contains("WHERE \"text\"<>'x'"), "{sql}");
}

#[test]
fn dimension_options_list_distinct_values() {
    let request = data()
        .join(devices_join())
        .dimension(dim(device()))
        .metric(metric(clicks()))
        .filter(QueryFilter::Dimension(Filter::eq(text(), "abc")))
        .limit(100);
    let sql = SqlBuilder::default()
        .build_dimension_options_with_dialect(&request, &DuckDbDialect)
        .unwrap();
    assert_eq!(
        sql,
        "SELECT DISTINCT \"t1\".\"name\" AS \"$device\" FROM \"data\" \"t0\" \
         LEFT JOIN \"devices\" \"t1\" ON \"t0\".\"device_id\"=\"t1\".\"id\" \
         WHERE \"t0\".\"text\"='abc' LIMIT 100"
    );
}
