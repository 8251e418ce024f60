use crate::error::{Result, SlicerError};
use crate::models::{JoinType, QueryRequest};
use crate::sql_ast::{SqlJoinType, TableRef};

/// Alias assignment for the tables of one request.
///
/// A single-table request leaves every column unqualified. As soon as the
/// request joins other tables the base table is aliased `t0` and each join
/// `t1`, `t2`, ... in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableAliases {
    base: String,
    joined: Vec<String>,
}

impl TableAliases {
    pub fn new(base: &str, joined: &[&str]) -> Self {
        Self {
            base: base.to_string(),
            joined: joined.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn for_request(request: &QueryRequest) -> Result<Self> {
        if request.table.trim().is_empty() {
            return Err(SlicerError::InvalidRequest(
                "request has no base table".to_string(),
            ));
        }
        let joined: Vec<&str> = request.joins.iter().map(|j| j.table.as_str()).collect();
        Ok(Self::new(&request.table, &joined))
    }

    pub fn is_qualified(&self) -> bool {
        !self.joined.is_empty()
    }

    /// Alias of a table; `None` means the base table.
    pub fn qualifier(&self, table: Option<&str>) -> Result<Option<String>> {
        let position = match table {
            None => 0,
            Some(name) if name == self.base => 0,
            Some(name) => match self.joined.iter().position(|t| t == name) {
                Some(idx) => idx + 1,
                None => return Err(SlicerError::UnknownTable(name.to_string())),
            },
        };
        if self.is_qualified() {
            Ok(Some(format!("t{position}")))
        } else {
            Ok(None)
        }
    }

    pub fn base_ref(&self) -> TableRef {
        let alias = self.is_qualified().then(|| "t0".to_string());
        TableRef {
            name: self.base.clone(),
            alias,
            subquery: None,
        }
    }

    pub fn join_ref(&self, idx: usize) -> Result<TableRef> {
        let name = self.joined.get(idx).ok_or_else(|| {
            SlicerError::InvalidRequest(format!("no join at position {idx}"))
        })?;
        Ok(TableRef::table(name, Some(&format!("t{}", idx + 1))))
    }
}

impl From<JoinType> for SqlJoinType {
    fn from(jt: JoinType) -> Self {
        match jt {
            JoinType::Inner => SqlJoinType::Inner,
            JoinType::Left => SqlJoinType::Left,
            JoinType::Right => SqlJoinType::Right,
            JoinType::Outer => SqlJoinType::Full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_table_is_unqualified() {
        let tables = TableAliases::new("clicks", &[]);
        assert_eq!(tables.qualifier(None).unwrap(), None);
        assert_eq!(tables.qualifier(Some("clicks")).unwrap(), None);
        assert_eq!(tables.base_ref().alias, None);
    }

    #[test]
    fn joins_are_numbered_in_declaration_order() {
        let tables = TableAliases::new("clicks", &["devices", "campaigns"]);
        assert_eq!(tables.qualifier(None).unwrap().as_deref(), Some("t0"));
        assert_eq!(
            tables.qualifier(Some("campaigns")).unwrap().as_deref(),
            Some("t2")
        );
        assert_eq!(tables.join_ref(0).unwrap().alias.as_deref(), Some("t1"));
        assert!(matches!(
            tables.qualifier(Some("nope")),
            Err(SlicerError::UnknownTable(_))
        ));
    }
}
