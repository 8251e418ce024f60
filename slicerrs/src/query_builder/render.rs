use crate::dialect::Dialect;
use crate::error::Result;
use crate::models::{BinaryOp, Expr, Field};
use crate::sql_ast::{SelectItem, SqlBinaryOperator, SqlExpr, SqlRenderer};

use super::resolve::TableAliases;

/// Lower a field definition into SQL, qualifying columns by table alias.
pub(crate) fn expr_to_sql(expr: &Expr, tables: &TableAliases) -> Result<SqlExpr> {
    lower(expr, &|table| tables.qualifier(table))
}

/// Lower without any qualifier, regardless of the table a column names.
pub(crate) fn expr_to_plain_sql(expr: &Expr) -> Result<SqlExpr> {
    lower(expr, &|_| Ok(None))
}

fn lower(
    expr: &Expr,
    qualify: &dyn Fn(Option<&str>) -> Result<Option<String>>,
) -> Result<SqlExpr> {
    Ok(match expr {
        Expr::Column { table, column } => SqlExpr::Column {
            table: qualify(table.as_deref())?,
            name: column.clone(),
        },
        Expr::Literal { value } => SqlExpr::Literal(value.clone()),
        Expr::Func { func, args } => SqlExpr::Function {
            func: func.clone(),
            args: args
                .iter()
                .map(|a| lower(a, qualify))
                .collect::<Result<Vec<_>>>()?,
        },
        Expr::Aggregate { agg, expr } => SqlExpr::Aggregate {
            agg: *agg,
            expr: Box::new(lower(expr, qualify)?),
        },
        Expr::Case {
            branches,
            else_expr,
        } => SqlExpr::Case {
            branches: branches
                .iter()
                .map(|b| Ok((lower(&b.when, qualify)?, lower(&b.then, qualify)?)))
                .collect::<Result<Vec<_>>>()?,
            else_expr: Box::new(lower(else_expr, qualify)?),
        },
        Expr::Binary { op, left, right } => SqlExpr::binary(
            (*op).into(),
            lower(left, qualify)?,
            lower(right, qualify)?,
        ),
    })
}

impl From<BinaryOp> for SqlBinaryOperator {
    fn from(op: BinaryOp) -> Self {
        match op {
            BinaryOp::Add => SqlBinaryOperator::Add,
            BinaryOp::Subtract => SqlBinaryOperator::Subtract,
            BinaryOp::Multiply => SqlBinaryOperator::Multiply,
            BinaryOp::Divide => SqlBinaryOperator::Divide,
            BinaryOp::Modulo => SqlBinaryOperator::Modulo,
            BinaryOp::Eq => SqlBinaryOperator::Eq,
            BinaryOp::Neq => SqlBinaryOperator::Neq,
            BinaryOp::Gt => SqlBinaryOperator::Gt,
            BinaryOp::Gte => SqlBinaryOperator::Gte,
            BinaryOp::Lt => SqlBinaryOperator::Lt,
            BinaryOp::Lte => SqlBinaryOperator::Lte,
            BinaryOp::And => SqlBinaryOperator::And,
            BinaryOp::Or => SqlBinaryOperator::Or,
        }
    }
}

/// Human-readable rendering used in result-set labels: bare identifiers,
/// standard function spelling.
struct PlainDialect;

impl Dialect for PlainDialect {
    fn quote_ident(&self, ident: &str) -> String {
        ident.to_string()
    }
}

/// Plain text of an already lowered expression, e.g. `text='abc'`.
pub(crate) fn describe_sql(expr: &SqlExpr) -> String {
    SqlRenderer::new(&PlainDialect).render_expr(expr)
}

impl Field {
    /// `<definition> AS "<alias>"`, the alias defaulting to the field alias.
    pub fn select_item(&self, tables: &TableAliases, alias: Option<&str>) -> Result<SelectItem> {
        Ok(SelectItem {
            expr: expr_to_sql(&self.definition, tables)?,
            alias: Some(alias.map(str::to_string).unwrap_or_else(|| self.alias())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DuckDbDialect;
    use crate::models::{DataType, Function, TimeGrain};

    #[test]
    fn select_item_qualifies_joined_columns() {
        let tables = TableAliases::new("clicks", &["devices"]);
        let field = Field::new(
            "device",
            DataType::Text,
            Expr::func(Function::Lower, vec![Expr::table_column("devices", "name")]),
        )
        .unwrap();
        let item = field.select_item(&tables, None).unwrap();
        let renderer = SqlRenderer::new(&DuckDbDialect);
        assert_eq!(renderer.render_expr(&item.expr), "lower(\"t1\".\"name\")");
        assert_eq!(item.alias.as_deref(), Some("$device"));

        let item = field.select_item(&tables, Some("$device_wow")).unwrap();
        assert_eq!(item.alias.as_deref(), Some("$device_wow"));
    }

    #[test]
    fn plain_description_drops_quotes_and_qualifiers() {
        let expr = Expr::binary(
            BinaryOp::Gt,
            Expr::sum(Expr::table_column("clicks", "number")),
            Expr::literal(10),
        );
        assert_eq!(describe_sql(&expr_to_plain_sql(&expr).unwrap()), "SUM(number)>10");

        let trunc = Expr::func(Function::DateTrunc(TimeGrain::Week), vec![Expr::column("dt")]);
        assert_eq!(
            describe_sql(&expr_to_plain_sql(&trunc).unwrap()),
            "date_trunc('week', dt)"
        );
    }
}
