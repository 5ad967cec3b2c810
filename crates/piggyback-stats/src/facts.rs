//! Facts derived from scan filters
//!
//! Only the first conjunct of a scan's filter list is inspected, and only the
//! shape `column op constant` with `op` one of `=`, `<`, `<=`, `>`, `>=`.

use piggyback_common::Scalar;
use piggyback_sql::{BinaryOperator, Expr, Literal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactKind {
    Equality,
    Lower { inclusive: bool },
    Upper { inclusive: bool },
}

/// A statistic known from the filter before any tuple is produced
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    /// Column reference as written in the filter
    pub column: String,
    pub kind: FactKind,
    pub constant: Scalar,
}

/// Derive a fact from the first conjunct of `filters`, if it has a supported
/// shape.
pub fn extract_fact(filters: &[Expr]) -> Option<Fact> {
    let first = filters.first()?.split_conjunction().into_iter().next()?;

    let Expr::BinaryOp { left, op, right } = &first else {
        tracing::debug!("Filter '{}' is not a comparison", first);
        return None;
    };
    let (Expr::Column(column), Expr::Literal(literal)) = (left.as_ref(), right.as_ref()) else {
        tracing::debug!("Filter '{}' is not of the form column op constant", first);
        return None;
    };

    let kind = match op {
        BinaryOperator::Eq => FactKind::Equality,
        BinaryOperator::Lt => FactKind::Upper { inclusive: false },
        BinaryOperator::Lte => FactKind::Upper { inclusive: true },
        BinaryOperator::Gt => FactKind::Lower { inclusive: false },
        BinaryOperator::Gte => FactKind::Lower { inclusive: true },
        other => {
            tracing::warn!("Unsupported filter operator '{}' in '{}'", other, first);
            return None;
        }
    };

    let constant = match literal {
        Literal::Int(v) => Scalar::Int(*v),
        Literal::Float(v) => Scalar::Float(*v),
        Literal::String(s) => Scalar::Text(s.clone()),
        Literal::Null | Literal::Boolean(_) => {
            tracing::debug!("Unsupported constant {} in '{}'", literal, first);
            return None;
        }
    };

    Some(Fact {
        column: column.clone(),
        kind,
        constant,
    })
}
