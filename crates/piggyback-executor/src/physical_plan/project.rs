//! Projection

use super::{BoxedOperator, ExecOperator};
use crate::eval::BoundExpr;
use crate::value::Row;
use piggyback_common::Result;

pub struct ProjectExec {
    input: BoxedOperator,
    exprs: Vec<BoundExpr>,
}

impl ProjectExec {
    pub fn new(input: BoxedOperator, exprs: Vec<BoundExpr>) -> Self {
        Self { input, exprs }
    }
}

impl ExecOperator for ProjectExec {
    fn next(&mut self) -> Result<Option<Row>> {
        let Some(row) = self.input.next()? else {
            return Ok(None);
        };
        let values = self
            .exprs
            .iter()
            .map(|e| e.evaluate(&row))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Row::new(values)))
    }
}
