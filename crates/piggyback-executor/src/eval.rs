//! Expression evaluation over rows

use crate::value::{Row, Value};
use piggyback_common::{PiggybackError, Result};
use piggyback_sql::{resolve_column, BinaryOperator, Expr, Literal, PlanColumn, UnaryOperator};
use std::cmp::Ordering;

/// An expression with its column references resolved to row positions
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Column(usize),
    Literal(Value),
    Binary {
        left: Box<BoundExpr>,
        op: BinaryOperator,
        right: Box<BoundExpr>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<BoundExpr>,
    },
}

impl BoundExpr {
    pub fn bind(expr: &Expr, columns: &[PlanColumn]) -> Result<Self> {
        Ok(match expr {
            Expr::Column(name) => BoundExpr::Column(resolve_column(columns, name)?),
            Expr::Literal(literal) => BoundExpr::Literal(match literal {
                Literal::Null => Value::Null,
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::Int(v) => Value::Int(*v),
                Literal::Float(v) => Value::Float(*v),
                Literal::String(s) => Value::Text(s.clone()),
            }),
            Expr::BinaryOp { left, op, right } => BoundExpr::Binary {
                left: Box::new(Self::bind(left, columns)?),
                op: *op,
                right: Box::new(Self::bind(right, columns)?),
            },
            Expr::UnaryOp { op, expr } => BoundExpr::Unary {
                op: *op,
                expr: Box::new(Self::bind(expr, columns)?),
            },
        })
    }

    pub fn evaluate(&self, row: &Row) -> Result<Value> {
        match self {
            BoundExpr::Column(index) => Ok(row.get(*index).clone()),
            BoundExpr::Literal(value) => Ok(value.clone()),
            BoundExpr::Binary { left, op, right } => match op {
                BinaryOperator::And => {
                    let l = truth(&left.evaluate(row)?);
                    if l == Some(false) {
                        return Ok(Value::Boolean(false));
                    }
                    Ok(match (l, truth(&right.evaluate(row)?)) {
                        (_, Some(false)) => Value::Boolean(false),
                        (Some(true), Some(true)) => Value::Boolean(true),
                        _ => Value::Null,
                    })
                }
                BinaryOperator::Or => {
                    let l = truth(&left.evaluate(row)?);
                    if l == Some(true) {
                        return Ok(Value::Boolean(true));
                    }
                    Ok(match (l, truth(&right.evaluate(row)?)) {
                        (_, Some(true)) => Value::Boolean(true),
                        (Some(false), Some(false)) => Value::Boolean(false),
                        _ => Value::Null,
                    })
                }
                op if op.is_comparison() => {
                    let (l, r) = (left.evaluate(row)?, right.evaluate(row)?);
                    Ok(compare(&l, *op, &r))
                }
                op => arithmetic(&left.evaluate(row)?, *op, &right.evaluate(row)?),
            },
            BoundExpr::Unary { op, expr } => {
                let value = expr.evaluate(row)?;
                match (op, value) {
                    (_, Value::Null) => Ok(Value::Null),
                    (UnaryOperator::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
                    (UnaryOperator::Minus, Value::Int(v)) => v
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| PiggybackError::Execution("integer overflow".to_string())),
                    (UnaryOperator::Minus, Value::Float(v)) => Ok(Value::Float(-v)),
                    (op, value) => Err(PiggybackError::Execution(format!(
                        "cannot apply {:?} to {}",
                        op, value
                    ))),
                }
            }
        }
    }

    /// Does `row` satisfy this predicate? NULL counts as false.
    pub fn matches(&self, row: &Row) -> Result<bool> {
        Ok(truth(&self.evaluate(row)?) == Some(true))
    }
}

fn truth(value: &Value) -> Option<bool> {
    match value {
        Value::Boolean(b) => Some(*b),
        _ => None,
    }
}

fn compare(l: &Value, op: BinaryOperator, r: &Value) -> Value {
    let Some(ordering) = l.compare(r) else {
        return Value::Null;
    };
    Value::Boolean(match op {
        BinaryOperator::Eq => ordering == Ordering::Equal,
        BinaryOperator::Neq => ordering != Ordering::Equal,
        BinaryOperator::Lt => ordering == Ordering::Less,
        BinaryOperator::Lte => ordering != Ordering::Greater,
        BinaryOperator::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}

fn arithmetic(l: &Value, op: BinaryOperator, r: &Value) -> Result<Value> {
    let overflow = || PiggybackError::Execution(format!("integer overflow in {} {} {}", l, op, r));
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int(a), Value::Int(b)) => {
            if matches!(op, BinaryOperator::Divide | BinaryOperator::Modulo) && *b == 0 {
                return Err(PiggybackError::Execution("division by zero".to_string()));
            }
            let result = match op {
                BinaryOperator::Plus => a.checked_add(*b),
                BinaryOperator::Minus => a.checked_sub(*b),
                BinaryOperator::Multiply => a.checked_mul(*b),
                BinaryOperator::Divide => a.checked_div(*b),
                _ => a.checked_rem(*b),
            };
            result.map(Value::Int).ok_or_else(overflow)
        }
        _ => {
            let (Some(a), Some(b)) = (as_float(l), as_float(r)) else {
                return Err(PiggybackError::Execution(format!(
                    "cannot apply {} to {} and {}",
                    op, l, r
                )));
            };
            Ok(Value::Float(match op {
                BinaryOperator::Plus => a + b,
                BinaryOperator::Minus => a - b,
                BinaryOperator::Multiply => a * b,
                BinaryOperator::Divide => a / b,
                _ => a % b,
            }))
        }
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        Value::Decimal(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_schema::DataType;

    fn columns() -> Vec<PlanColumn> {
        vec![
            PlanColumn::new("a", DataType::Int64),
            PlanColumn::new("b", DataType::Utf8),
        ]
    }

    fn eval(expr: Expr, row: &Row) -> Value {
        BoundExpr::bind(&expr, &columns()).unwrap().evaluate(row).unwrap()
    }

    #[test]
    fn test_comparisons_and_logic() {
        let row = Row::new(vec![Value::Int(5), Value::Text("x".into())]);
        let gt = Expr::binary(Expr::column("a"), BinaryOperator::Gt, Expr::int(3));
        let eq = Expr::binary(Expr::column("b"), BinaryOperator::Eq, Expr::string("y"));
        assert_eq!(eval(gt.clone(), &row), Value::Boolean(true));
        assert_eq!(eval(eq.clone(), &row), Value::Boolean(false));
        assert_eq!(eval(gt.clone().and(eq.clone()), &row), Value::Boolean(false));
        assert_eq!(
            eval(Expr::binary(gt, BinaryOperator::Or, eq), &row),
            Value::Boolean(true)
        );
    }

    #[test]
    fn test_null_semantics() {
        let row = Row::new(vec![Value::Null, Value::Text("x".into())]);
        let cmp = Expr::binary(Expr::column("a"), BinaryOperator::Eq, Expr::int(1));
        assert_eq!(eval(cmp.clone(), &row), Value::Null);
        let bound = BoundExpr::bind(&cmp, &columns()).unwrap();
        assert!(!bound.matches(&row).unwrap());

        let false_and_null = Expr::binary(Expr::int(1), BinaryOperator::Eq, Expr::int(2)).and(cmp);
        assert_eq!(eval(false_and_null, &row), Value::Boolean(false));
    }

    #[test]
    fn test_arithmetic() {
        let row = Row::new(vec![Value::Int(7), Value::Null]);
        let plus = Expr::binary(Expr::column("a"), BinaryOperator::Plus, Expr::int(1));
        assert_eq!(eval(plus, &row), Value::Int(8));
        let mixed = Expr::binary(
            Expr::column("a"),
            BinaryOperator::Divide,
            Expr::Literal(Literal::Float(2.0)),
        );
        assert_eq!(eval(mixed, &row), Value::Float(3.5));

        let div_zero = Expr::binary(Expr::column("a"), BinaryOperator::Divide, Expr::int(0));
        let bound = BoundExpr::bind(&div_zero, &columns()).unwrap();
        assert!(bound.evaluate(&row).is_err());
    }

    #[test]
    fn test_unknown_column() {
        assert!(BoundExpr::bind(&Expr::column("zzz"), &columns()).is_err());
    }
}
