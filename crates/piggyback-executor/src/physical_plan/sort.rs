//! ORDER BY

use super::{BoxedOperator, ExecOperator};
use crate::eval::BoundExpr;
use crate::value::{Row, Value};
use piggyback_common::Result;
use std::cmp::Ordering;

pub struct SortExec {
    input: BoxedOperator,
    /// (key, ascending)
    keys: Vec<(BoundExpr, bool)>,
    output: Option<std::vec::IntoIter<Row>>,
}

impl SortExec {
    pub fn new(input: BoxedOperator, keys: Vec<(BoundExpr, bool)>) -> Self {
        Self {
            input,
            keys,
            output: None,
        }
    }

    fn compute(&mut self) -> Result<Vec<Row>> {
        let mut keyed: Vec<(Vec<Value>, Row)> = vec![];
        while let Some(row) = self.input.next()? {
            let key = self
                .keys
                .iter()
                .map(|(e, _)| e.evaluate(&row))
                .collect::<Result<Vec<_>>>()?;
            keyed.push((key, row));
        }

        // Stable: ties keep input order.
        keyed.sort_by(|(a, _), (b, _)| {
            for (i, (_, ascending)) in self.keys.iter().enumerate() {
                let ord = a[i].sort_cmp(&b[i]);
                let ord = if *ascending { ord } else { ord.reverse() };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }
}

impl ExecOperator for SortExec {
    fn next(&mut self) -> Result<Option<Row>> {
        if self.output.is_none() {
            self.output = Some(self.compute()?.into_iter());
        }
        Ok(self.output.as_mut().and_then(Iterator::next))
    }
}
