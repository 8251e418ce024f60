//! Request model consumed by the query compiler.
//!
//! Fields are resolved before they reach the compiler: a dimension or metric
//! is a key, a data type and an expression over table columns. The request
//! itself only arranges them (dimensions, metrics, filters, references and
//! rollups) and can be built in code or deserialized from JSON/YAML.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SlicerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Date,
    Text,
    Number,
    Boolean,
}

/// Expression over table columns. A column without a table belongs to the
/// request's base table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expr {
    Column {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        table: Option<String>,
        column: String,
    },
    Literal {
        value: Value,
    },
    Func {
        func: Function,
        args: Vec<Expr>,
    },
    Aggregate {
        agg: Aggregation,
        expr: Box<Expr>,
    },
    Case {
        branches: Vec<CaseBranch>,
        else_expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn column(column: &str) -> Self {
        Expr::Column {
            table: None,
            column: column.to_string(),
        }
    }

    pub fn table_column(table: &str, column: &str) -> Self {
        Expr::Column {
            table: Some(table.to_string()),
            column: column.to_string(),
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal {
            value: value.into(),
        }
    }

    pub fn func(func: Function, args: Vec<Expr>) -> Self {
        Expr::Func { func, args }
    }

    pub fn aggregate(agg: Aggregation, expr: Expr) -> Self {
        Expr::Aggregate {
            agg,
            expr: Box::new(expr),
        }
    }

    pub fn sum(expr: Expr) -> Self {
        Self::aggregate(Aggregation::Sum, expr)
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// True when the expression aggregates anywhere in its tree.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::Aggregate { .. } => true,
            Expr::Column { .. } | Expr::Literal { .. } => false,
            Expr::Func { args, .. } => args.iter().any(Expr::is_aggregate),
            Expr::Case {
                branches,
                else_expr,
            } => {
                branches
                    .iter()
                    .any(|b| b.when.is_aggregate() || b.then.is_aggregate())
                    || else_expr.is_aggregate()
            }
            Expr::Binary { left, right, .. } => left.is_aggregate() || right.is_aggregate(),
        }
    }
}

impl<'de> Deserialize<'de> for Expr {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match value {
            // "column" or "table.column"
            Value::String(s) => Ok(match s.split_once('.') {
                Some((table, column)) => Expr::table_column(table, column),
                None => Expr::column(&s),
            }),
            other => {
                #[derive(Deserialize)]
                #[serde(tag = "type", rename_all = "snake_case")]
                enum TaggedExpr {
                    Column {
                        #[serde(default)]
                        table: Option<String>,
                        column: String,
                    },
                    Literal {
                        value: Value,
                    },
                    Func {
                        func: Function,
                        #[serde(default)]
                        args: Vec<Expr>,
                    },
                    Aggregate {
                        agg: Aggregation,
                        expr: Box<Expr>,
                    },
                    Case {
                        branches: Vec<CaseBranch>,
                        else_expr: Box<Expr>,
                    },
                    Binary {
                        op: BinaryOp,
                        left: Box<Expr>,
                        right: Box<Expr>,
                    },
                }
                let tagged: TaggedExpr =
                    TaggedExpr::deserialize(other).map_err(de::Error::custom)?;
                Ok(match tagged {
                    TaggedExpr::Column { table, column } => Expr::Column { table, column },
                    TaggedExpr::Literal { value } => Expr::Literal { value },
                    TaggedExpr::Func { func, args } => Expr::Func { func, args },
                    TaggedExpr::Aggregate { agg, expr } => Expr::Aggregate { agg, expr },
                    TaggedExpr::Case {
                        branches,
                        else_expr,
                    } => Expr::Case {
                        branches,
                        else_expr,
                    },
                    TaggedExpr::Binary { op, left, right } => Expr::Binary { op, left, right },
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseBranch {
    pub when: Expr,
    pub then: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Function {
    DateTrunc(TimeGrain),
    Lower,
    Upper,
    Coalesce,
    Concat,
    NullIf,
    Cast { data_type: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Count,
    CountDistinct,
    Min,
    Max,
    Avg,
    Median,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeGrain {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Atomic vocabulary of a request: a keyed, typed expression.
///
/// Two fields are equal when their keys are equal.
#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub key: String,
    pub data_type: DataType,
    pub definition: Expr,
}

impl Field {
    pub fn new(key: impl Into<String>, data_type: DataType, definition: Expr) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(SlicerError::InvalidField(
                "field key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            key,
            data_type,
            definition,
        })
    }

    /// Output alias of the field; a pure function of the key.
    pub fn alias(&self) -> String {
        alias_for(&self.key)
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Field {}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            key: String,
            data_type: DataType,
            definition: Expr,
        }
        let raw = Raw::deserialize(deserializer)?;
        Field::new(raw.key, raw.data_type, raw.definition).map_err(de::Error::custom)
    }
}

/// Prefix shared by every output column alias.
pub const ALIAS_PREFIX: &str = "$";

pub fn alias_for(key: &str) -> String {
    format!("{ALIAS_PREFIX}{key}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    #[default]
    None,
    /// Totals-dimension: adds a totals statement where this dimension is collapsed.
    Rollup,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    #[serde(flatten)]
    pub field: Field,
    pub modifier: Modifier,
}

impl Dimension {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            modifier: Modifier::None,
        }
    }

    pub fn rollup(field: Field) -> Self {
        Self {
            field,
            modifier: Modifier::Rollup,
        }
    }

    pub fn key(&self) -> &str {
        &self.field.key
    }

    pub fn is_totals(&self) -> bool {
        self.modifier == Modifier::Rollup
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            key: String,
            data_type: DataType,
            definition: Expr,
            #[serde(default)]
            modifier: Modifier,
        }
        let raw = Raw::deserialize(deserializer)?;
        let field = Field::new(raw.key, raw.data_type, raw.definition).map_err(de::Error::custom)?;
        Ok(Dimension {
            field,
            modifier: raw.modifier,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metric {
    pub field: Field,
}

impl Metric {
    pub fn new(field: Field) -> Self {
        Self { field }
    }

    pub fn key(&self) -> &str {
        &self.field.key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Like,
    Between,
    IsNull,
    IsNotNull,
}

/// A predicate bound to a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: Field,
    pub op: FilterOp,
    #[serde(default)]
    pub value: Value,
}

impl Filter {
    pub fn new(field: Field, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: Field, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn gt(field: Field, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    pub fn is_in(field: Field, values: Vec<Value>) -> Self {
        Self::new(field, FilterOp::In, Value::Array(values))
    }

    pub fn between(field: Field, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::new(
            field,
            FilterOp::Between,
            Value::Array(vec![low.into(), high.into()]),
        )
    }
}

fn default_true() -> bool {
    true
}

/// A filter that partitions a dimension into "set" and "complement" values
/// instead of excluding rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSetFilter {
    pub filter: Filter,
    #[serde(default)]
    pub set_label: Option<String>,
    #[serde(default)]
    pub complement_label: Option<String>,
    #[serde(default = "default_true")]
    pub will_replace_referenced_dimension: bool,
    #[serde(default = "default_true")]
    pub will_group_complement: bool,
}

impl ResultSetFilter {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            set_label: None,
            complement_label: None,
            will_replace_referenced_dimension: true,
            will_group_complement: true,
        }
    }

    pub fn with_set_label(mut self, label: impl Into<String>) -> Self {
        self.set_label = Some(label.into());
        self
    }

    pub fn with_complement_label(mut self, label: impl Into<String>) -> Self {
        self.complement_label = Some(label.into());
        self
    }

    pub fn replace_dimension(mut self, replace: bool) -> Self {
        self.will_replace_referenced_dimension = replace;
        self
    }

    pub fn group_complement(mut self, group: bool) -> Self {
        self.will_group_complement = group;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryFilter {
    /// WHERE predicate.
    Dimension(Filter),
    /// HAVING predicate.
    Metric(Filter),
    /// CASE rewrite of the filtered dimension; never a predicate.
    ResultSet(ResultSetFilter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    WeekOverWeek,
    MonthOverMonth,
    QuarterOverQuarter,
    YearOverYear,
}

impl ReferenceKind {
    pub fn key(&self) -> &'static str {
        match self {
            ReferenceKind::WeekOverWeek => "wow",
            ReferenceKind::MonthOverMonth => "mom",
            ReferenceKind::QuarterOverQuarter => "qoq",
            ReferenceKind::YearOverYear => "yoy",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReferenceModifier {
    #[default]
    Plain,
    /// `_d`: base minus compared value.
    Delta,
    /// `_p`: relative difference to the compared value.
    DeltaPercent,
}

/// Period-over-period comparison anchored to a date dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReference", into = "RawReference")]
pub struct Reference {
    pub kind: ReferenceKind,
    pub modifier: ReferenceModifier,
    pub dimension: String,
}

impl Reference {
    pub fn new(kind: ReferenceKind, modifier: ReferenceModifier, dimension: &str) -> Self {
        Self {
            kind,
            modifier,
            dimension: dimension.to_string(),
        }
    }

    /// Parse a reference name such as `wow`, `yoy_d` or `mom_p`.
    pub fn parse(name: &str, dimension: &str) -> Result<Self> {
        let (kind, modifier) = parse_reference_name(name)?;
        Ok(Self::new(kind, modifier, dimension))
    }

    pub fn name(&self) -> String {
        match self.modifier {
            ReferenceModifier::Plain => self.kind.key().to_string(),
            ReferenceModifier::Delta => format!("{}_d", self.kind.key()),
            ReferenceModifier::DeltaPercent => format!("{}_p", self.kind.key()),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.dimension)
    }
}

fn parse_reference_name(name: &str) -> Result<(ReferenceKind, ReferenceModifier)> {
    let (base, modifier) = match name.split_once('_') {
        Some((base, "d")) => (base, ReferenceModifier::Delta),
        Some((base, "p")) => (base, ReferenceModifier::DeltaPercent),
        Some(_) => {
            return Err(SlicerError::InvalidRequest(format!(
                "unknown reference modifier in {name}"
            )))
        }
        None => (name, ReferenceModifier::Plain),
    };
    let kind = ReferenceKind::from_str(base)?;
    Ok((kind, modifier))
}

impl FromStr for ReferenceKind {
    type Err = SlicerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "wow" => Ok(ReferenceKind::WeekOverWeek),
            "mom" => Ok(ReferenceKind::MonthOverMonth),
            "qoq" => Ok(ReferenceKind::QuarterOverQuarter),
            "yoy" => Ok(ReferenceKind::YearOverYear),
            other => Err(SlicerError::InvalidRequest(format!(
                "unknown reference {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawReference {
    reference: String,
    dimension: String,
}

impl TryFrom<RawReference> for Reference {
    type Error = SlicerError;

    fn try_from(raw: RawReference) -> Result<Self> {
        Reference::parse(&raw.reference, &raw.dimension)
    }
}

impl From<Reference> for RawReference {
    fn from(reference: Reference) -> Self {
        RawReference {
            reference: reference.name(),
            dimension: reference.dimension,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    Inner,
    Left,
    Right,
    #[serde(alias = "full")]
    Outer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub table: String,
    pub on: Expr,
    pub join_type: JoinType,
}

impl Join {
    pub fn new(table: &str, on: Expr, join_type: JoinType) -> Self {
        Self {
            table: table.to_string(),
            on,
            join_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One argument of `ROLLUP(...)`: a dimension key, or several keys that
/// are rolled up together. Deserializes from `"key"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RollupGroup {
    Single(String),
    Composite(Vec<String>),
}

impl RollupGroup {
    pub fn keys(&self) -> &[String] {
        match self {
            RollupGroup::Single(key) => std::slice::from_ref(key),
            RollupGroup::Composite(keys) => keys,
        }
    }
}

/// A logical analytical request, lowered by [`crate::SqlBuilder`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub table: String,
    #[serde(default)]
    pub joins: Vec<Join>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
    #[serde(default)]
    pub filters: Vec<QueryFilter>,
    #[serde(default)]
    pub references: Vec<Reference>,
    /// Arguments of the `ROLLUP(...)` grouping, in request order.
    #[serde(default)]
    pub rollup: Vec<RollupGroup>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryRequest {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    pub fn dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension);
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metrics.push(metric);
        self
    }

    pub fn filter(mut self, filter: QueryFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn rollup(mut self, key: &str) -> Self {
        self.rollup.push(RollupGroup::Single(key.to_string()));
        self
    }

    /// Roll several dimensions up as one unit: `ROLLUP(("a", "b"), ...)`.
    pub fn rollup_together(mut self, keys: &[&str]) -> Self {
        self.rollup.push(RollupGroup::Composite(
            keys.iter().map(|k| k.to_string()).collect(),
        ));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
