//! Nested loop inner join

use super::{BoxedOperator, ExecOperator};
use crate::eval::BoundExpr;
use crate::value::Row;
use piggyback_common::Result;

/// Materializes the right input on the first pull and streams the left one.
pub struct NestedLoopJoinExec {
    left: BoxedOperator,
    right: BoxedOperator,
    on: Option<BoundExpr>,
    right_rows: Option<Vec<Row>>,
    current: Option<Row>,
    position: usize,
}

impl NestedLoopJoinExec {
    pub fn new(left: BoxedOperator, right: BoxedOperator, on: Option<BoundExpr>) -> Self {
        Self {
            left,
            right,
            on,
            right_rows: None,
            current: None,
            position: 0,
        }
    }

    fn materialize_right(&mut self) -> Result<()> {
        if self.right_rows.is_none() {
            let mut rows = vec![];
            while let Some(row) = self.right.next()? {
                rows.push(row);
            }
            tracing::trace!("Join buffered {} right rows", rows.len());
            self.right_rows = Some(rows);
        }
        Ok(())
    }
}

impl ExecOperator for NestedLoopJoinExec {
    fn next(&mut self) -> Result<Option<Row>> {
        self.materialize_right()?;
        let Some(right_rows) = self.right_rows.as_ref() else {
            return Ok(None);
        };
        if right_rows.is_empty() {
            return Ok(None);
        }

        loop {
            let Some(left) = self.current.as_ref() else {
                match self.left.next()? {
                    Some(row) => {
                        self.current = Some(row);
                        self.position = 0;
                        continue;
                    }
                    None => return Ok(None),
                }
            };
            while let Some(right) = right_rows.get(self.position) {
                self.position += 1;
                let joined = left.concat(right);
                let keep = match &self.on {
                    Some(on) => on.matches(&joined)?,
                    None => true,
                };
                if keep {
                    return Ok(Some(joined));
                }
            }
            self.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical_plan::test_util::{drain, ints, RowsExec};
    use crate::value::Value;
    use arrow_schema::DataType;
    use piggyback_sql::{BinaryOperator, Expr, PlanColumn};

    #[test]
    fn test_cross_join() {
        let mut join = NestedLoopJoinExec::new(
            Box::new(RowsExec::new(ints(&[1, 2]))),
            Box::new(RowsExec::new(ints(&[10, 20]))),
            None,
        );
        let rows = drain(&mut join);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec![Value::Int(1), Value::Int(20)]);
        assert_eq!(rows[2], vec![Value::Int(2), Value::Int(10)]);
    }

    #[test]
    fn test_equi_join() {
        let mut columns = vec![PlanColumn::new("a", DataType::Int64), PlanColumn::new("b", DataType::Int64)];
        columns[0].qualifier = Some("l".to_string());
        columns[1].qualifier = Some("r".to_string());
        let on = BoundExpr::bind(
            &Expr::binary(Expr::column("a"), BinaryOperator::Eq, Expr::column("b")),
            &columns,
        )
        .unwrap();
        let mut join = NestedLoopJoinExec::new(
            Box::new(RowsExec::new(ints(&[1, 2, 3]))),
            Box::new(RowsExec::new(ints(&[3, 1, 1]))),
            Some(on),
        );
        assert_eq!(
            drain(&mut join),
            vec![
                vec![Value::Int(1), Value::Int(1)],
                vec![Value::Int(1), Value::Int(1)],
                vec![Value::Int(3), Value::Int(3)],
            ]
        );
    }

    #[test]
    fn test_empty_right_skips_left() {
        let left = RowsExec::new(ints(&[1, 2]));
        let pulled = left.pulled.clone();
        let mut join = NestedLoopJoinExec::new(Box::new(left), Box::new(RowsExec::new(ints(&[]))), None);
        assert!(drain(&mut join).is_empty());
        assert_eq!(pulled.get(), 0);
    }
}
