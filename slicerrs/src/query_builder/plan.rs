//! Query plan intermediate representation.
//!
//! A plan decides the statement structure; converting it to a
//! [`SelectQuery`] is mechanical. A request without references yields a
//! flat plan. With references the flat plan is wrapped: it becomes the
//! derived table `base` and every comparison sub-query is joined to it.

use crate::sql_ast::{
    GroupItem, Join, OrderItem, SelectItem, SelectQuery, SqlExpr, SqlJoinType, TableRef,
};

/// Alias of the wrapped base query in a compared plan.
pub const BASE_ALIAS: &str = "base";

/// The plan of one statement.
#[derive(Debug, Clone)]
pub enum QueryPlan {
    /// A single SELECT with joins and grouping.
    Flat(FlatPlan),
    /// A flat base query joined with one comparison sub-query per reference.
    Compared(ComparedPlan),
}

/// A flat query plan: standard SELECT with JOINs and GROUP BY.
#[derive(Debug, Clone)]
pub struct FlatPlan {
    pub distinct: bool,
    pub from: TableRef,
    pub select: Vec<SelectItem>,
    pub joins: Vec<Join>,
    pub filters: Vec<SqlExpr>,
    pub group_by: Vec<GroupItem>,
    pub having: Vec<SqlExpr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// The base query plus its comparisons.
#[derive(Debug, Clone)]
pub struct ComparedPlan {
    pub base: FlatPlan,
    pub comparisons: Vec<ComparisonJoin>,
    /// Base columns followed by the comparison columns.
    pub select: Vec<SelectItem>,
    pub order_by: Vec<OrderItem>,
}

/// One comparison sub-query and how it joins the base.
#[derive(Debug, Clone)]
pub struct ComparisonJoin {
    pub alias: String,
    pub query: FlatPlan,
    pub join_type: SqlJoinType,
    pub on: Vec<SqlExpr>,
}

impl QueryPlan {
    pub fn into_select_query(self) -> SelectQuery {
        match self {
            QueryPlan::Flat(flat) => flat.into_select_query(),
            QueryPlan::Compared(compared) => compared.into_select_query(),
        }
    }
}

impl FlatPlan {
    /// Create a new empty flat plan with the given FROM clause.
    pub fn new(from: TableRef) -> Self {
        Self {
            distinct: false,
            from,
            select: Vec::new(),
            joins: Vec::new(),
            filters: Vec::new(),
            group_by: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn into_select_query(self) -> SelectQuery {
        SelectQuery {
            distinct: self.distinct,
            select: self.select,
            from: self.from,
            joins: self.joins,
            filters: self.filters,
            group_by: self.group_by,
            having: self.having,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

impl ComparedPlan {
    /// Wrap `base`, re-selecting each of its columns by alias.
    pub fn new(base: FlatPlan) -> Self {
        let select = base
            .select
            .iter()
            .filter_map(|item| item.alias.as_deref())
            .map(|alias| SelectItem {
                expr: SqlExpr::column(Some(BASE_ALIAS), alias),
                alias: Some(alias.to_string()),
            })
            .collect();
        Self {
            base,
            comparisons: Vec::new(),
            select,
            order_by: Vec::new(),
        }
    }

    pub fn into_select_query(self) -> SelectQuery {
        let joins = self
            .comparisons
            .into_iter()
            .map(|cmp| Join {
                join_type: cmp.join_type,
                table: TableRef::derived(cmp.query.into_select_query(), &cmp.alias),
                on: cmp.on,
            })
            .collect();
        SelectQuery {
            select: self.select,
            from: TableRef::derived(self.base.into_select_query(), BASE_ALIAS),
            joins,
            order_by: self.order_by,
            ..Default::default()
        }
    }
}
