//! UNION ALL: every row of each input, inputs in order

use super::{BoxedOperator, ExecOperator};
use crate::value::Row;
use piggyback_common::Result;

pub struct UnionExec {
    inputs: Vec<BoxedOperator>,
    current: usize,
}

impl UnionExec {
    pub fn new(inputs: Vec<BoxedOperator>) -> Self {
        Self { inputs, current: 0 }
    }
}

impl ExecOperator for UnionExec {
    fn next(&mut self) -> Result<Option<Row>> {
        while let Some(input) = self.inputs.get_mut(self.current) {
            if let Some(row) = input.next()? {
                return Ok(Some(row));
            }
            self.current += 1;
        }
        Ok(None)
    }
}
