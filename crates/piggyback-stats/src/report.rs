//! Statistics report assembled at the end of an execution

use crate::fd::FdGrid;
use crate::ledger::Ledger;
use chrono::{DateTime, Utc};
use piggyback_common::{ColumnDescriptor, QueryId, Result, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Final statistics of one result column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnReport {
    pub name: String,
    pub position: usize,
    pub distinct_count: Option<u64>,
    pub min: Option<Scalar>,
    pub max: Option<Scalar>,
    pub most_frequent: Option<Scalar>,
    pub is_numeric: bool,
    pub distinct_final: bool,
    pub min_final: bool,
    pub max_final: bool,
}

/// A surviving candidate `determinant -> dependent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionalDependency {
    pub determinant: usize,
    pub dependent: usize,
    pub determinant_name: String,
    pub dependent_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub query_id: QueryId,
    pub finished_at: DateTime<Utc>,
    pub tuples_observed: u64,
    /// Registered columns, in result order
    pub columns: Vec<ColumnReport>,
    /// Ordered by (determinant, dependent)
    pub functional_dependencies: Vec<FunctionalDependency>,
}

impl StatisticsReport {
    pub fn column(&self, name: &str) -> Option<&ColumnReport> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Is `determinant -> dependent` among the reported dependencies?
    pub fn has_dependency(&self, determinant: &str, dependent: &str) -> bool {
        self.functional_dependencies
            .iter()
            .any(|fd| fd.determinant_name == determinant && fd.dependent_name == dependent)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One line per column and one per dependency
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for column in &self.columns {
            let distinct = column
                .distinct_count
                .map_or_else(|| "unknown".to_string(), |n| n.to_string());
            let min = column
                .min
                .as_ref()
                .map_or_else(|| "unknown".to_string(), |m| m.to_string());
            let _ = writeln!(
                out,
                "column {} ({}) has {} distinct values, {} as minimum, numeric: {}",
                column.name,
                column.position,
                distinct,
                min,
                u8::from(column.is_numeric)
            );
        }
        for fd in &self.functional_dependencies {
            let _ = writeln!(
                out,
                "functional dependency {} -> {}",
                fd.determinant_name, fd.dependent_name
            );
        }
        out
    }
}

pub(crate) fn assemble(
    query_id: QueryId,
    tuples_observed: u64,
    ledger: &Ledger,
    fd: Option<&FdGrid>,
    descriptors: &[ColumnDescriptor],
) -> StatisticsReport {
    let columns = ledger
        .columns()
        .map(|stat| ColumnReport {
            name: stat.descriptor.name.clone(),
            position: stat.descriptor.position,
            distinct_count: stat.distinct.value().copied(),
            min: stat.min.value().cloned(),
            max: stat.max.value().cloned(),
            most_frequent: stat.most_frequent.clone(),
            is_numeric: stat.descriptor.kind.is_numeric(),
            distinct_final: stat.distinct.is_final(),
            min_final: stat.min.is_final(),
            max_final: stat.max.is_final(),
        })
        .collect();

    let name = |i: usize| descriptors.get(i).map(|d| d.name.clone()).unwrap_or_default();
    let functional_dependencies = fd
        .map(FdGrid::dependencies)
        .unwrap_or_default()
        .into_iter()
        .map(|(determinant, dependent)| FunctionalDependency {
            determinant,
            dependent,
            determinant_name: name(determinant),
            dependent_name: name(dependent),
        })
        .collect();

    StatisticsReport {
        query_id,
        finished_at: Utc::now(),
        tuples_observed,
        columns,
        functional_dependencies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Observation;
    use piggyback_common::ValueKind;

    fn report() -> StatisticsReport {
        let descriptors = vec![
            ColumnDescriptor::new(0, "id", ValueKind::Integer),
            ColumnDescriptor::new(1, "dept", ValueKind::Text),
            ColumnDescriptor::new(2, "note", ValueKind::Unsupported),
        ];
        let mut ledger = Ledger::new(3);
        ledger.register_column(&descriptors[0]);
        ledger.register_column(&descriptors[1]);
        ledger.observe(0, Observation::Int(7), 4).unwrap();
        ledger.observe(0, Observation::Int(3), 4).unwrap();
        ledger.apply_equality_fact(&descriptors[1], Scalar::Text("ops".into()));

        let mut grid = FdGrid::new(3, 4, &[false, false, true]).unwrap();
        grid.update(&[7, 1, 0]).unwrap();
        grid.update(&[3, 1, 0]).unwrap();

        assemble(QueryId::new(), 2, &ledger, Some(&grid), &descriptors)
    }

    #[test]
    fn test_assemble_registered_columns_in_order() {
        let report = report();
        assert_eq!(report.columns.len(), 2);
        let id = &report.columns[0];
        assert_eq!(id.distinct_count, Some(2));
        assert_eq!(id.min, Some(Scalar::Int(3)));
        assert_eq!(id.max, Some(Scalar::Int(7)));
        assert!(id.is_numeric && !id.distinct_final);

        let dept = report.column("dept").unwrap();
        assert_eq!(dept.most_frequent, Some(Scalar::Text("ops".into())));
        assert!(dept.distinct_final && dept.min_final && dept.max_final);
        assert!(!dept.is_numeric);
    }

    #[test]
    fn test_dependencies_named_and_ordered() {
        let report = report();
        assert_eq!(report.functional_dependencies.len(), 1);
        assert!(report.has_dependency("id", "dept"));
        assert!(!report.has_dependency("dept", "id"));
    }

    #[test]
    fn test_text_lines() {
        let text = report().to_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "column id (0) has 2 distinct values, 3 as minimum, numeric: 1"
        );
        assert_eq!(
            lines[1],
            "column dept (1) has 1 distinct values, ops as minimum, numeric: 0"
        );
        assert_eq!(lines[2], "functional dependency id -> dept");
    }

    #[test]
    fn test_json_round_trip() {
        let report = report();
        let json = report.to_json().unwrap();
        let parsed: StatisticsReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }
}
