use crate::config::CompilerConfig;
use crate::dialect::Dialect;
use crate::error::Result;
use crate::models::QueryRequest;
use crate::output::CompiledQuery;
use crate::sql_ast::SqlRenderer;

mod components;
mod filters;
mod options;
mod plan;
mod planner;
mod references;
mod render;
mod resolve;
mod result_set;
mod rollup;

pub use references::interval;
pub use resolve::TableAliases;

/// Compiles requests into SQL statements.
///
/// Compilation is pure: the same request and config always produce the
/// same statements.
#[derive(Debug, Clone, Default)]
pub struct SqlBuilder {
    config: CompilerConfig,
}

impl SqlBuilder {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Lower a request into its base and totals statements.
    pub fn compile(&self, request: &QueryRequest) -> Result<CompiledQuery> {
        planner::compile(request, &self.config)
    }

    /// Build SQL with the configured dialect, one string per statement.
    pub fn build_sql(&self, request: &QueryRequest) -> Result<Vec<String>> {
        self.build_with_dialect(request, self.config.dialect.dialect())
    }

    /// Build SQL using a provided dialect (useful for tests).
    pub fn build_with_dialect(
        &self,
        request: &QueryRequest,
        dialect: &dyn Dialect,
    ) -> Result<Vec<String>> {
        let statements = self.compile(request)?.render(dialect);
        for sql in &statements {
            tracing::trace!(sql = %sql, "rendered statement");
        }
        Ok(statements)
    }

    /// SQL listing the distinct values of the request's dimensions.
    pub fn build_dimension_options(&self, request: &QueryRequest) -> Result<String> {
        self.build_dimension_options_with_dialect(request, self.config.dialect.dialect())
    }

    pub fn build_dimension_options_with_dialect(
        &self,
        request: &QueryRequest,
        dialect: &dyn Dialect,
    ) -> Result<String> {
        let query = options::dimension_options(request)?;
        let sql = SqlRenderer::new(dialect).render_select(&query);
        tracing::trace!(sql = %sql, "rendered dimension options");
        Ok(sql)
    }
}
