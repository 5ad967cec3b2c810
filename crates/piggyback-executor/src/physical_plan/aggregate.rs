//! Grouping with an optional row count

use super::{BoxedOperator, ExecOperator};
use crate::eval::BoundExpr;
use crate::value::{Row, Value};
use piggyback_common::Result;
use std::collections::HashMap;

/// Emits one row per distinct group key in first-appearance order, with the
/// group's row count appended when `count` is set. Without grouping
/// expressions it emits a single row, even over empty input.
pub struct AggregateExec {
    input: BoxedOperator,
    group_by: Vec<BoundExpr>,
    count: bool,
    output: Option<std::vec::IntoIter<Row>>,
}

impl AggregateExec {
    pub fn new(input: BoxedOperator, group_by: Vec<BoundExpr>, count: bool) -> Self {
        Self {
            input,
            group_by,
            count,
            output: None,
        }
    }

    fn compute(&mut self) -> Result<Vec<Row>> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<(Vec<Value>, i64)> = vec![];

        while let Some(row) = self.input.next()? {
            let key = self
                .group_by
                .iter()
                .map(|e| e.evaluate(&row))
                .collect::<Result<Vec<_>>>()?;
            let fingerprint = format!("{:?}", key);
            match index.get(&fingerprint) {
                Some(&slot) => groups[slot].1 += 1,
                None => {
                    index.insert(fingerprint, groups.len());
                    groups.push((key, 1));
                }
            }
        }

        if self.group_by.is_empty() && groups.is_empty() {
            groups.push((vec![], 0));
        }
        tracing::trace!("Aggregate produced {} groups", groups.len());

        let count = self.count;
        Ok(groups
            .into_iter()
            .map(|(mut values, n)| {
                if count {
                    values.push(Value::Int(n));
                }
                Row::new(values)
            })
            .collect())
    }
}

impl ExecOperator for AggregateExec {
    fn next(&mut self) -> Result<Option<Row>> {
        if self.output.is_none() {
            self.output = Some(self.compute()?.into_iter());
        }
        Ok(self.output.as_mut().and_then(Iterator::next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical_plan::test_util::{drain, ints, RowsExec};

    #[test]
    fn test_group_count_in_first_appearance_order() {
        let mut agg = AggregateExec::new(
            Box::new(RowsExec::new(ints(&[3, 1, 3, 3, 1, 2]))),
            vec![BoundExpr::Column(0)],
            true,
        );
        assert_eq!(
            drain(&mut agg),
            vec![
                vec![Value::Int(3), Value::Int(3)],
                vec![Value::Int(1), Value::Int(2)],
                vec![Value::Int(2), Value::Int(1)],
            ]
        );
    }

    #[test]
    fn test_distinct_without_count() {
        let rows = vec![
            vec![Value::Null, Value::Int(1)],
            vec![Value::Null, Value::Int(1)],
            vec![Value::Text("a".into()), Value::Int(1)],
        ];
        let mut agg = AggregateExec::new(
            Box::new(RowsExec::new(rows)),
            vec![BoundExpr::Column(0), BoundExpr::Column(1)],
            false,
        );
        assert_eq!(drain(&mut agg).len(), 2);
    }

    #[test]
    fn test_global_count_over_empty_input() {
        let mut agg = AggregateExec::new(Box::new(RowsExec::new(ints(&[]))), vec![], true);
        assert_eq!(drain(&mut agg), vec![vec![Value::Int(0)]]);
    }
}
