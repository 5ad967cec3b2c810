//! LIMIT / OFFSET

use super::{BoxedOperator, ExecOperator};
use crate::value::Row;
use piggyback_common::Result;

/// Stops pulling from its input as soon as the limit is reached.
pub struct LimitExec {
    input: BoxedOperator,
    limit: Option<usize>,
    offset: usize,
    skipped: usize,
    produced: usize,
}

impl LimitExec {
    pub fn new(input: BoxedOperator, limit: Option<usize>, offset: usize) -> Self {
        Self {
            input,
            limit,
            offset,
            skipped: 0,
            produced: 0,
        }
    }
}

impl ExecOperator for LimitExec {
    fn next(&mut self) -> Result<Option<Row>> {
        if self.limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(None);
        }
        while self.skipped < self.offset {
            if self.input.next()?.is_none() {
                return Ok(None);
            }
            self.skipped += 1;
        }
        let row = self.input.next()?;
        if row.is_some() {
            self.produced += 1;
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physical_plan::test_util::{drain, ints, RowsExec};

    #[test]
    fn test_limit_stops_pulling() {
        let input = RowsExec::new(ints(&[1, 2, 3, 4, 5, 6]));
        let pulled = input.pulled.clone();
        let mut limit = LimitExec::new(Box::new(input), Some(3), 0);
        assert_eq!(drain(&mut limit), ints(&[1, 2, 3]));
        assert_eq!(pulled.get(), 3);
    }

    #[test]
    fn test_offset() {
        let mut limit = LimitExec::new(Box::new(RowsExec::new(ints(&[1, 2, 3, 4]))), Some(2), 1);
        assert_eq!(drain(&mut limit), ints(&[2, 3]));

        let mut past_end = LimitExec::new(Box::new(RowsExec::new(ints(&[1]))), None, 5);
        assert!(drain(&mut past_end).is_empty());
    }

    #[test]
    fn test_limit_zero() {
        let input = RowsExec::new(ints(&[1]));
        let pulled = input.pulled.clone();
        let mut limit = LimitExec::new(Box::new(input), Some(0), 0);
        assert!(drain(&mut limit).is_empty());
        assert_eq!(pulled.get(), 0);
    }
}
