//! Table scan with pushed-down filters

use super::ExecOperator;
use crate::eval::BoundExpr;
use crate::value::{extract_value, Row};
use piggyback_catalog::TableEntry;
use piggyback_common::Result;
use std::sync::Arc;

pub struct ScanExec {
    table: Arc<TableEntry>,
    filters: Vec<BoundExpr>,
    batch: usize,
    row: usize,
}

impl ScanExec {
    pub fn new(table: Arc<TableEntry>, filters: Vec<BoundExpr>) -> Self {
        Self {
            table,
            filters,
            batch: 0,
            row: 0,
        }
    }
}

impl ExecOperator for ScanExec {
    fn next(&mut self) -> Result<Option<Row>> {
        while let Some(batch) = self.table.batches.get(self.batch) {
            if self.row >= batch.num_rows() {
                self.batch += 1;
                self.row = 0;
                continue;
            }
            let index = self.row;
            self.row += 1;

            let row = Row::new(
                batch
                    .columns()
                    .iter()
                    .map(|column| extract_value(column.as_ref(), index))
                    .collect(),
            );
            let mut keep = true;
            for filter in &self.filters {
                if !filter.matches(&row)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}
