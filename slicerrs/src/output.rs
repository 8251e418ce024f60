//! Compiled statements and the metadata the result reshaper needs.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::dialect::Dialect;
use crate::models::{alias_for, Reference};
use crate::sql_ast::{SelectQuery, SqlRenderer};

/// Role of a statement within a compiled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatementKind {
    Base,
    /// Totals for the listed dimensions, which hold the totals marker.
    Totals { dimensions: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub kind: StatementKind,
    pub query: SelectQuery,
}

/// All statements of one request, in execution order.
///
/// `statements[0]` is the base statement; every other one is a totals
/// statement. Callers run them all and concatenate the rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub statements: Vec<CompiledStatement>,
    /// Final dimension ordering, as selected.
    pub dimension_keys: Vec<String>,
    pub metric_keys: Vec<String>,
    /// Dimensions grouped with `ROLLUP(...)`; NULL there marks a subtotal.
    pub rollup_keys: Vec<String>,
    pub references: Vec<Reference>,
    pub totals_marker: String,
}

impl CompiledQuery {
    pub fn render(&self, dialect: &dyn Dialect) -> Vec<String> {
        let renderer = SqlRenderer::new(dialect);
        self.statements
            .iter()
            .map(|s| renderer.render_select(&s.query))
            .collect()
    }

    pub fn base(&self) -> Option<&CompiledStatement> {
        self.statements.first()
    }

    pub fn totals(&self) -> &[CompiledStatement] {
        self.statements.get(1..).unwrap_or(&[])
    }

    /// Whether a result row, keyed by output alias, is a totals row.
    pub fn is_totals_row(&self, row: &Map<String, Value>) -> bool {
        self.dimension_keys.iter().any(|key| {
            match row.get(&alias_for(key)) {
                Some(Value::Null) => self.rollup_keys.contains(key),
                Some(Value::String(s)) => s == &self.totals_marker,
                _ => false,
            }
        })
    }
}
