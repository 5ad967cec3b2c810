//! Query plan tree handed to the executor

use crate::expr::Expr;
use arrow_schema::DataType;
use piggyback_common::{ColumnId, PiggybackError, Result, TableId};

/// One output column of a plan node
#[derive(Debug, Clone, PartialEq)]
pub struct PlanColumn {
    pub name: String,
    /// Table name or alias the column can be qualified with
    pub qualifier: Option<String>,
    pub data_type: DataType,
    /// Base table column this output traces back to, if any
    pub source: Option<(TableId, ColumnId)>,
}

impl PlanColumn {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            qualifier: None,
            data_type,
            source: None,
        }
    }

    /// Does `reference` (`col` or `qualifier.col`) name this column?
    pub fn matches(&self, reference: &str) -> bool {
        match reference.rsplit_once('.') {
            Some((qualifier, name)) => {
                self.qualifier.as_deref() == Some(qualifier) && self.name == name
            }
            None => self.name == reference,
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}.{}", q, self.name),
            None => self.name.clone(),
        }
    }
}

/// Resolve a column reference to its index in `columns`
pub fn resolve_column(columns: &[PlanColumn], reference: &str) -> Result<usize> {
    let mut found = columns
        .iter()
        .enumerate()
        .filter(|(_, c)| c.matches(reference))
        .map(|(i, _)| i);
    match (found.next(), found.next()) {
        (Some(index), None) => Ok(index),
        (None, _) => Err(PiggybackError::Planner(format!(
            "column '{}' not found",
            reference
        ))),
        (Some(_), Some(_)) => Err(PiggybackError::Planner(format!(
            "column reference '{}' is ambiguous",
            reference
        ))),
    }
}

/// Sort key
#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub expr: Expr,
    pub ascending: bool,
}

/// Query plan node
#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    /// Scan a base table, applying `filters` (AND-ed, in source order)
    Scan {
        table_name: String,
        table_id: TableId,
        columns: Vec<PlanColumn>,
        filters: Vec<Expr>,
    },

    /// Filter rows
    Filter {
        input: Box<PlanNode>,
        predicate: Expr,
    },

    /// Compute output expressions
    Project {
        input: Box<PlanNode>,
        exprs: Vec<Expr>,
        columns: Vec<PlanColumn>,
    },

    /// Inner join; `on = None` is a cross join
    Join {
        left: Box<PlanNode>,
        right: Box<PlanNode>,
        on: Option<Expr>,
        columns: Vec<PlanColumn>,
    },

    /// Append the rows of every input (UNION ALL)
    Union {
        inputs: Vec<PlanNode>,
        columns: Vec<PlanColumn>,
    },

    /// Group rows by `group_by`, optionally counting each group
    Aggregate {
        input: Box<PlanNode>,
        group_by: Vec<Expr>,
        count_alias: Option<String>,
        columns: Vec<PlanColumn>,
    },

    /// Sort rows
    Sort {
        input: Box<PlanNode>,
        keys: Vec<SortKey>,
    },

    /// Limit rows
    Limit {
        input: Box<PlanNode>,
        limit: Option<usize>,
        offset: usize,
    },
}

impl PlanNode {
    /// Output columns of this node
    pub fn columns(&self) -> Vec<PlanColumn> {
        match self {
            PlanNode::Scan { columns, .. }
            | PlanNode::Project { columns, .. }
            | PlanNode::Join { columns, .. }
            | PlanNode::Union { columns, .. }
            | PlanNode::Aggregate { columns, .. } => columns.clone(),
            PlanNode::Filter { input, .. }
            | PlanNode::Sort { input, .. }
            | PlanNode::Limit { input, .. } => input.columns(),
        }
    }

    pub fn children(&self) -> Vec<&PlanNode> {
        match self {
            PlanNode::Scan { .. } => vec![],
            PlanNode::Filter { input, .. }
            | PlanNode::Project { input, .. }
            | PlanNode::Aggregate { input, .. }
            | PlanNode::Sort { input, .. }
            | PlanNode::Limit { input, .. } => vec![input.as_ref()],
            PlanNode::Join { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            PlanNode::Union { inputs, .. } => inputs.iter().collect(),
        }
    }

    /// Base tables scanned beneath this node, in order of first appearance
    pub fn base_tables(&self) -> Vec<TableId> {
        let mut tables = vec![];
        self.collect_tables(&mut tables);
        tables
    }

    fn collect_tables(&self, tables: &mut Vec<TableId>) {
        if let PlanNode::Scan { table_id, .. } = self {
            if !tables.contains(table_id) {
                tables.push(*table_id);
            }
        }
        for child in self.children() {
            child.collect_tables(tables);
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlanNode::Scan { .. } => "Scan",
            PlanNode::Filter { .. } => "Filter",
            PlanNode::Project { .. } => "Project",
            PlanNode::Join { .. } => "Join",
            PlanNode::Union { .. } => "Union",
            PlanNode::Aggregate { .. } => "Aggregate",
            PlanNode::Sort { .. } => "Sort",
            PlanNode::Limit { .. } => "Limit",
        }
    }

    fn fmt_indent(&self, f: &mut std::fmt::Formatter<'_>, depth: usize) -> std::fmt::Result {
        write!(f, "{:indent$}{}", "", self.name(), indent = depth * 2)?;
        match self {
            PlanNode::Scan {
                table_name, filters, ..
            } => {
                write!(f, ": {}", table_name)?;
                if !filters.is_empty() {
                    let filters: Vec<String> = filters.iter().map(|e| e.to_string()).collect();
                    write!(f, " filters=[{}]", filters.join(", "))?;
                }
            }
            PlanNode::Filter { predicate, .. } => write!(f, ": {}", predicate)?,
            PlanNode::Join { on: Some(on), .. } => write!(f, ": {}", on)?,
            PlanNode::Limit { limit, offset, .. } => {
                write!(f, ": limit={:?} offset={}", limit, offset)?
            }
            _ => {}
        }
        writeln!(f)?;
        for child in self.children() {
            child.fmt_indent(f, depth + 1)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for PlanNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_indent(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOperator;

    fn scan(name: &str, id: u32, cols: &[&str]) -> PlanNode {
        PlanNode::Scan {
            table_name: name.to_string(),
            table_id: TableId(id),
            columns: cols
                .iter()
                .enumerate()
                .map(|(i, c)| PlanColumn {
                    name: c.to_string(),
                    qualifier: Some(name.to_string()),
                    data_type: DataType::Int64,
                    source: Some((TableId(id), ColumnId(i as u32))),
                })
                .collect(),
            filters: vec![],
        }
    }

    #[test]
    fn test_resolve_qualified_and_ambiguous() {
        let mut columns = scan("a", 1, &["id", "x"]).columns();
        columns.extend(scan("b", 2, &["id", "y"]).columns());

        assert_eq!(resolve_column(&columns, "x").unwrap(), 1);
        assert_eq!(resolve_column(&columns, "b.id").unwrap(), 2);
        assert!(resolve_column(&columns, "id").is_err());
        assert!(resolve_column(&columns, "z").is_err());
    }

    #[test]
    fn test_base_tables_in_order() {
        let join = PlanNode::Join {
            left: Box::new(scan("a", 1, &["id"])),
            right: Box::new(PlanNode::Union {
                inputs: vec![scan("b", 2, &["id"]), scan("a", 1, &["id"])],
                columns: vec![],
            }),
            on: None,
            columns: vec![],
        };
        assert_eq!(join.base_tables(), vec![TableId(1), TableId(2)]);
    }

    #[test]
    fn test_display_tree() {
        let mut input = scan("a", 1, &["id"]);
        if let PlanNode::Scan { filters, .. } = &mut input {
            filters.push(Expr::binary(Expr::column("id"), BinaryOperator::Eq, Expr::int(3)));
        }
        let plan = PlanNode::Limit {
            input: Box::new(input),
            limit: Some(3),
            offset: 0,
        };
        let text = plan.to_string();
        assert!(text.starts_with("Limit: limit=Some(3) offset=0\n"));
        assert!(text.contains("  Scan: a filters=[id = 3]"));
    }
}
