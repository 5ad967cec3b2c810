//! Residual filter

use super::{BoxedOperator, ExecOperator};
use crate::eval::BoundExpr;
use crate::value::Row;
use piggyback_common::Result;

pub struct FilterExec {
    input: BoxedOperator,
    predicate: BoundExpr,
}

impl FilterExec {
    pub fn new(input: BoxedOperator, predicate: BoundExpr) -> Self {
        Self { input, predicate }
    }
}

impl ExecOperator for FilterExec {
    fn next(&mut self) -> Result<Option<Row>> {
        while let Some(row) = self.input.next()? {
            if self.predicate.matches(&row)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}
