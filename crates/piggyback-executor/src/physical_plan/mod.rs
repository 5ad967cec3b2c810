//! Physical operators
//!
//! Every operator pulls rows from its inputs one at a time. Sort and
//! aggregate drain their input on the first pull.

mod aggregate;
mod filter;
mod join;
mod limit;
mod project;
mod scan;
mod sort;
mod union;

pub use aggregate::AggregateExec;
pub use filter::FilterExec;
pub use join::NestedLoopJoinExec;
pub use limit::LimitExec;
pub use project::ProjectExec;
pub use scan::ScanExec;
pub use sort::SortExec;
pub use union::UnionExec;

use crate::eval::BoundExpr;
use crate::value::Row;
use piggyback_catalog::CatalogProvider;
use piggyback_common::{PiggybackError, Result};
use piggyback_sql::PlanNode;

/// A pull-based operator
pub trait ExecOperator {
    /// The next row, or `None` once exhausted
    fn next(&mut self) -> Result<Option<Row>>;
}

pub type BoxedOperator = Box<dyn ExecOperator>;

/// Build the operator tree for `plan`.
pub fn build(plan: &PlanNode, catalog: &dyn CatalogProvider) -> Result<BoxedOperator> {
    Ok(match plan {
        PlanNode::Scan {
            table_name,
            table_id,
            columns,
            filters,
        } => {
            let entry = catalog
                .table_by_id(*table_id)
                .ok_or_else(|| PiggybackError::NotFound(format!("table '{}'", table_name)))?;
            let filters = bind_all(filters, columns)?;
            Box::new(ScanExec::new(entry, filters))
        }
        PlanNode::Filter { input, predicate } => {
            let predicate = BoundExpr::bind(predicate, &input.columns())?;
            Box::new(FilterExec::new(build(input, catalog)?, predicate))
        }
        PlanNode::Project { input, exprs, .. } => {
            let exprs = bind_all(exprs, &input.columns())?;
            Box::new(ProjectExec::new(build(input, catalog)?, exprs))
        }
        PlanNode::Join {
            left,
            right,
            on,
            columns,
        } => {
            let on = on
                .as_ref()
                .map(|on| BoundExpr::bind(on, columns))
                .transpose()?;
            Box::new(NestedLoopJoinExec::new(
                build(left, catalog)?,
                build(right, catalog)?,
                on,
            ))
        }
        PlanNode::Union { inputs, .. } => {
            let inputs = inputs
                .iter()
                .map(|input| build(input, catalog))
                .collect::<Result<Vec<_>>>()?;
            Box::new(UnionExec::new(inputs))
        }
        PlanNode::Aggregate {
            input,
            group_by,
            count_alias,
            ..
        } => {
            let group_by = bind_all(group_by, &input.columns())?;
            Box::new(AggregateExec::new(
                build(input, catalog)?,
                group_by,
                count_alias.is_some(),
            ))
        }
        PlanNode::Sort { input, keys } => {
            let columns = input.columns();
            let keys = keys
                .iter()
                .map(|k| Ok((BoundExpr::bind(&k.expr, &columns)?, k.ascending)))
                .collect::<Result<Vec<_>>>()?;
            Box::new(SortExec::new(build(input, catalog)?, keys))
        }
        PlanNode::Limit {
            input,
            limit,
            offset,
        } => Box::new(LimitExec::new(build(input, catalog)?, *limit, *offset)),
    })
}

fn bind_all(exprs: &[piggyback_sql::Expr], columns: &[piggyback_sql::PlanColumn]) -> Result<Vec<BoundExpr>> {
    exprs.iter().map(|e| BoundExpr::bind(e, columns)).collect()
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;
    use crate::value::Value;

    /// Operator over a fixed list of rows
    pub struct RowsExec {
        rows: std::vec::IntoIter<Row>,
        pub pulled: std::rc::Rc<std::cell::Cell<usize>>,
    }

    impl RowsExec {
        pub fn new(rows: Vec<Vec<Value>>) -> Self {
            Self {
                rows: rows.into_iter().map(Row::new).collect::<Vec<_>>().into_iter(),
                pulled: Default::default(),
            }
        }
    }

    impl ExecOperator for RowsExec {
        fn next(&mut self) -> Result<Option<Row>> {
            let row = self.rows.next();
            if row.is_some() {
                self.pulled.set(self.pulled.get() + 1);
            }
            Ok(row)
        }
    }

    pub fn ints(values: &[i64]) -> Vec<Vec<Value>> {
        values.iter().map(|v| vec![Value::Int(*v)]).collect()
    }

    pub fn drain(op: &mut dyn ExecOperator) -> Vec<Vec<Value>> {
        let mut rows = vec![];
        while let Some(row) = op.next().unwrap() {
            rows.push(row.into_values());
        }
        rows
    }
}
