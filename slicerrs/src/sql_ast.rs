use std::collections::BTreeSet;

use serde_json::Value;

use crate::dialect::Dialect;
use crate::models::{Aggregation, Function, SortDirection, TimeGrain};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column {
        table: Option<String>,
        name: String,
    },
    Literal(Value),
    Function {
        func: Function,
        args: Vec<SqlExpr>,
    },
    Case {
        branches: Vec<(SqlExpr, SqlExpr)>,
        else_expr: Box<SqlExpr>,
    },
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Aggregate {
        agg: Aggregation,
        expr: Box<SqlExpr>,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
        negated: bool,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
    },
    IsNull {
        expr: Box<SqlExpr>,
        negated: bool,
    },
    Interval {
        quantity: i64,
        unit: TimeGrain,
    },
}

impl SqlExpr {
    pub fn column(table: Option<&str>, name: &str) -> Self {
        SqlExpr::Column {
            table: table.map(str::to_string),
            name: name.to_string(),
        }
    }

    pub fn binary(op: SqlBinaryOperator, left: SqlExpr, right: SqlExpr) -> Self {
        SqlExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, SqlExpr::Literal(_))
    }

    /// Every column the expression reads, as `(table, name)`.
    pub fn columns(&self) -> BTreeSet<(Option<String>, String)> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut BTreeSet<(Option<String>, String)>) {
        match self {
            SqlExpr::Column { table, name } => {
                out.insert((table.clone(), name.clone()));
            }
            SqlExpr::Literal(_) | SqlExpr::Interval { .. } => {}
            SqlExpr::Function { args, .. } => args.iter().for_each(|a| a.collect_columns(out)),
            SqlExpr::Case {
                branches,
                else_expr,
            } => {
                for (when, then) in branches {
                    when.collect_columns(out);
                    then.collect_columns(out);
                }
                else_expr.collect_columns(out);
            }
            SqlExpr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            SqlExpr::Aggregate { expr, .. } | SqlExpr::IsNull { expr, .. } => {
                expr.collect_columns(out)
            }
            SqlExpr::InList { expr, list, .. } => {
                expr.collect_columns(out);
                list.iter().for_each(|e| e.collect_columns(out));
            }
            SqlExpr::Between { expr, low, high } => {
                expr.collect_columns(out);
                low.collect_columns(out);
                high.collect_columns(out);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlBinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
}

impl SqlBinaryOperator {
    /// Comparisons render without padding (`"a"='b'`); everything else is
    /// parenthesised (`("a" - "b")`).
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            SqlBinaryOperator::Eq
                | SqlBinaryOperator::Neq
                | SqlBinaryOperator::Gt
                | SqlBinaryOperator::Gte
                | SqlBinaryOperator::Lt
                | SqlBinaryOperator::Lte
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            SqlBinaryOperator::Add => "+",
            SqlBinaryOperator::Subtract => "-",
            SqlBinaryOperator::Multiply => "*",
            SqlBinaryOperator::Divide => "/",
            SqlBinaryOperator::Modulo => "%",
            SqlBinaryOperator::And => "AND",
            SqlBinaryOperator::Or => "OR",
            SqlBinaryOperator::Eq => "=",
            SqlBinaryOperator::Neq => "<>",
            SqlBinaryOperator::Gt => ">",
            SqlBinaryOperator::Gte => ">=",
            SqlBinaryOperator::Lt => "<",
            SqlBinaryOperator::Lte => "<=",
            SqlBinaryOperator::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
    /// Derived table; `name` is ignored when set.
    pub subquery: Option<Box<SelectQuery>>,
}

impl TableRef {
    pub fn table(name: &str, alias: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.map(str::to_string),
            subquery: None,
        }
    }

    pub fn derived(query: SelectQuery, alias: &str) -> Self {
        Self {
            name: String::new(),
            alias: Some(alias.to_string()),
            subquery: Some(Box::new(query)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlJoinType {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: SqlJoinType,
    pub table: TableRef,
    pub on: Vec<SqlExpr>,
}

/// One entry of a GROUP BY clause.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupItem {
    Expr(SqlExpr),
    /// `ROLLUP(...)`; an argument with several expressions is rolled up as
    /// one unit and renders parenthesised.
    Rollup(Vec<Vec<SqlExpr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub distinct: bool,
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filters: Vec<SqlExpr>,
    pub group_by: Vec<GroupItem>,
    pub having: Vec<SqlExpr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr);
                match &item.alias {
                    Some(alias) => format!("{expr_sql} AS {}", self.dialect.quote_ident(alias)),
                    None => expr_sql,
                }
            })
            .collect();

        let mut sql = format!(
            "SELECT {}{} FROM {}",
            if query.distinct { "DISTINCT " } else { "" },
            select_items.join(", "),
            self.render_table_ref(&query.from)
        );

        for join in &query.joins {
            let join_kw = match join.join_type {
                SqlJoinType::Inner => "JOIN",
                SqlJoinType::Left => "LEFT JOIN",
                SqlJoinType::Right => "RIGHT JOIN",
                SqlJoinType::Full => "FULL OUTER JOIN",
            };
            let on_clause: Vec<String> = join.on.iter().map(|e| self.render_expr(e)).collect();
            sql.push_str(&format!(
                " {join_kw} {} ON {}",
                self.render_table_ref(&join.table),
                on_clause.join(" AND ")
            ));
        }

        if !query.filters.is_empty() {
            let filters: Vec<String> = query.filters.iter().map(|f| self.render_expr(f)).collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        let groups: Vec<String> = query
            .group_by
            .iter()
            .filter_map(|g| match g {
                GroupItem::Expr(expr) => self.render_group_expr(query, expr),
                GroupItem::Rollup(args) => {
                    let inner: Vec<String> = args
                        .iter()
                        .filter_map(|members| {
                            let rendered: Vec<String> = members
                                .iter()
                                .filter_map(|e| self.render_group_expr(query, e))
                                .collect();
                            match rendered.len() {
                                0 => None,
                                1 => rendered.into_iter().next(),
                                _ => Some(format!("({})", rendered.join(", "))),
                            }
                        })
                        .collect();
                    if inner.is_empty() {
                        None
                    } else {
                        Some(format!("ROLLUP({})", inner.join(", ")))
                    }
                }
            })
            .collect();
        if !groups.is_empty() {
            sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
        }

        if !query.having.is_empty() {
            let having: Vec<String> = query.having.iter().map(|h| self.render_expr(h)).collect();
            sql.push_str(&format!(" HAVING {}", having.join(" AND ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    let expr = self.render_expr(&o.expr);
                    let dir = match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{expr} {dir}")
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }

    /// Group entries are written as references to select-list aliases. Dialects
    /// that cannot group by alias get the aliased expression instead, and
    /// constant expressions are dropped from their GROUP BY.
    fn render_group_expr(&self, query: &SelectQuery, expr: &SqlExpr) -> Option<String> {
        if self.dialect.groups_by_alias() {
            return Some(self.render_expr(expr));
        }
        let aliased = match expr {
            SqlExpr::Column { table: None, name } => query
                .select
                .iter()
                .find(|item| item.alias.as_deref() == Some(name.as_str())),
            _ => None,
        };
        match aliased {
            Some(item) if item.expr.is_literal() => None,
            Some(item) => Some(self.render_expr(&item.expr)),
            None if expr.is_literal() => None,
            None => Some(self.render_expr(expr)),
        }
    }

    fn render_table_ref(&self, table: &TableRef) -> String {
        let source = match &table.subquery {
            Some(query) => format!("({})", self.render_select(query)),
            None => self.dialect.quote_ident(&table.name),
        };
        match &table.alias {
            Some(alias) => format!("{source} {}", self.dialect.quote_ident(alias)),
            None => source,
        }
    }

    pub fn render_expr(&self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column { table, name } => match table {
                Some(t) => format!(
                    "{}.{}",
                    self.dialect.quote_ident(t),
                    self.dialect.quote_ident(name)
                ),
                None => self.dialect.quote_ident(name),
            },
            SqlExpr::Literal(v) => self.dialect.render_literal(v),
            SqlExpr::Function { func, args } => {
                let rendered_args: Vec<String> = args.iter().map(|a| self.render_expr(a)).collect();
                self.dialect.render_function(func, rendered_args)
            }
            SqlExpr::Case {
                branches,
                else_expr,
            } => {
                let mut parts = Vec::new();
                parts.push("CASE".to_string());
                for (when, then) in branches {
                    parts.push(format!(
                        " WHEN {} THEN {}",
                        self.render_expr(when),
                        self.render_expr(then)
                    ));
                }
                parts.push(format!(" ELSE {} END", self.render_expr(else_expr)));
                parts.join("")
            }
            SqlExpr::BinaryOp { op, left, right } => {
                if op.is_comparison() {
                    format!(
                        "{}{}{}",
                        self.render_expr(left),
                        op.symbol(),
                        self.render_expr(right)
                    )
                } else {
                    format!(
                        "({} {} {})",
                        self.render_expr(left),
                        op.symbol(),
                        self.render_expr(right)
                    )
                }
            }
            SqlExpr::Aggregate { agg, expr } => self
                .dialect
                .render_aggregation(agg, &self.render_expr(expr)),
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => {
                let rendered_values: Vec<String> =
                    list.iter().map(|v| self.render_expr(v)).collect();
                let not_kw = if *negated { "NOT " } else { "" };
                format!(
                    "{} {}IN ({})",
                    self.render_expr(expr),
                    not_kw,
                    rendered_values.join(", ")
                )
            }
            SqlExpr::Between { expr, low, high } => format!(
                "{} BETWEEN {} AND {}",
                self.render_expr(expr),
                self.render_expr(low),
                self.render_expr(high)
            ),
            SqlExpr::IsNull { expr, negated } => {
                let not_kw = if *negated { "NOT " } else { "" };
                format!("{} IS {not_kw}NULL", self.render_expr(expr))
            }
            SqlExpr::Interval { quantity, unit } => self.dialect.render_interval(*quantity, unit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DuckDbDialect;

    #[test]
    fn renders_derived_tables_with_alias() {
        let inner = SelectQuery {
            select: vec![SelectItem {
                expr: SqlExpr::column(None, "dt"),
                alias: Some("$date".to_string()),
            }],
            from: TableRef::table("clicks", None),
            ..Default::default()
        };
        let outer = SelectQuery {
            select: vec![SelectItem {
                expr: SqlExpr::column(Some("base"), "$date"),
                alias: Some("$date".to_string()),
            }],
            from: TableRef::derived(inner, "base"),
            ..Default::default()
        };
        let sql = SqlRenderer::new(&DuckDbDialect).render_select(&outer);
        assert_eq!(
            sql,
            "SELECT \"base\".\"$date\" AS \"$date\" FROM (SELECT \"dt\" AS \"$date\" FROM \"clicks\") \"base\""
        );
    }

    #[test]
    fn comparisons_are_compact_and_arithmetic_is_parenthesised() {
        let renderer = SqlRenderer::new(&DuckDbDialect);
        let cmp = SqlExpr::binary(
            SqlBinaryOperator::Eq,
            SqlExpr::column(None, "text"),
            SqlExpr::Literal(serde_json::json!("abc")),
        );
        assert_eq!(renderer.render_expr(&cmp), "\"text\"='abc'");

        let shifted = SqlExpr::binary(
            SqlBinaryOperator::Subtract,
            SqlExpr::column(Some("wow"), "$date"),
            SqlExpr::Interval {
                quantity: 1,
                unit: TimeGrain::Week,
            },
        );
        assert_eq!(
            renderer.render_expr(&shifted),
            "(\"wow\".\"$date\" - INTERVAL 1 WEEK)"
        );
    }

    #[test]
    fn renders_rollup_group_and_having() {
        let query = SelectQuery {
            select: vec![SelectItem {
                expr: SqlExpr::Aggregate {
                    agg: Aggregation::Sum,
                    expr: Box::new(SqlExpr::column(None, "clicks")),
                },
                alias: Some("$clicks".to_string()),
            }],
            from: TableRef::table("t", None),
            group_by: vec![
                GroupItem::Expr(SqlExpr::column(None, "$a")),
                GroupItem::Rollup(vec![
                    vec![SqlExpr::column(None, "$b"), SqlExpr::column(None, "$c")],
                    vec![SqlExpr::column(None, "$d")],
                ]),
            ],
            having: vec![SqlExpr::binary(
                SqlBinaryOperator::Gt,
                SqlExpr::Aggregate {
                    agg: Aggregation::Sum,
                    expr: Box::new(SqlExpr::column(None, "clicks")),
                },
                SqlExpr::Literal(serde_json::json!(10)),
            )],
            ..Default::default()
        };
        let sql = SqlRenderer::new(&DuckDbDialect).render_select(&query);
        assert!(sql.ends_with(
            "GROUP BY \"$a\", ROLLUP((\"$b\", \"$c\"), \"$d\") HAVING SUM(\"clicks\")>10"
        ));
    }

    #[test]
    fn postgres_groups_by_expression_and_skips_constants() {
        use crate::dialect::PostgresDialect;

        let query = SelectQuery {
            select: vec![
                SelectItem {
                    expr: SqlExpr::column(None, "dt"),
                    alias: Some("$date".to_string()),
                },
                SelectItem {
                    expr: SqlExpr::Literal(serde_json::json!("_ROLLUP_TOTALS_")),
                    alias: Some("$device".to_string()),
                },
            ],
            from: TableRef::table("t", None),
            group_by: vec![
                GroupItem::Expr(SqlExpr::column(None, "$date")),
                GroupItem::Expr(SqlExpr::column(None, "$device")),
            ],
            ..Default::default()
        };
        let sql = SqlRenderer::new(&PostgresDialect).render_select(&query);
        assert!(sql.ends_with("FROM \"t\" GROUP BY \"dt\""), "{sql}");

        let sql = SqlRenderer::new(&DuckDbDialect).render_select(&query);
        assert!(sql.ends_with("GROUP BY \"$date\", \"$device\""), "{sql}");
    }
}
