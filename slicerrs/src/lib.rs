pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod query_builder;
pub mod runtime;
pub mod sql_ast;

pub use config::{CompilerConfig, ReferenceJoin, SlicerConfig};
pub use dialect::{BigQueryDialect, Dialect, DialectKind, DuckDbDialect, PostgresDialect};
pub use error::{Result, SlicerError};
pub use executor::{QueryExecutor, QueryResult};
pub use models::{
    DataType, Dimension, Expr, Field, Filter, FilterOp, Metric, Modifier, QueryFilter,
    QueryRequest, Reference, ReferenceKind, ReferenceModifier, ResultSetFilter, RollupGroup,
};
pub use output::{CompiledQuery, CompiledStatement, StatementKind};
pub use query_builder::{SqlBuilder, TableAliases};
pub use runtime::{run_compiled, run_request, RequestResult};
