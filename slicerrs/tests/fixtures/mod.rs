//! Shared request fixtures: a `data` table with a few typed columns and a
//! joined `devices` table.
#![allow(dead_code)]

use slicer::models::{BinaryOp, Join, JoinType};
use slicer::{DataType, Dimension, Expr, Field, Metric, QueryRequest};

pub fn date() -> Field {
    Field::new("date", DataType::Date, Expr::column("dt")).unwrap()
}

pub fn text() -> Field {
    Field::new("text", DataType::Text, Expr::column("text")).unwrap()
}

pub fn boolean() -> Field {
    Field::new("boolean", DataType::Boolean, Expr::column("boolean")).unwrap()
}

pub fn category() -> Field {
    Field::new("cat", DataType::Text, Expr::column("cat")).unwrap()
}

pub fn device() -> Field {
    Field::new("device", DataType::Text, Expr::table_column("devices", "name")).unwrap()
}

pub fn aggr_number() -> Field {
    Field::new(
        "aggr_number",
        DataType::Number,
        Expr::sum(Expr::column("number")),
    )
    .unwrap()
}

pub fn clicks() -> Field {
    Field::new("clicks", DataType::Number, Expr::sum(Expr::column("clicks"))).unwrap()
}

pub fn devices_join() -> Join {
    Join::new(
        "devices",
        Expr::binary(
            BinaryOp::Eq,
            Expr::column("device_id"),
            Expr::table_column("devices", "id"),
        ),
        JoinType::Left,
    )
}

pub fn data() -> QueryRequest {
    QueryRequest::new("data")
}

pub fn dim(field: Field) -> Dimension {
    Dimension::new(field)
}

pub fn metric(field: Field) -> Metric {
    Metric::new(field)
}
