//! Tuple access and value canonicalization

use piggyback_common::ValueKind;
use std::borrow::Cow;
use std::fmt::Write;

/// Raw value of one result column
#[derive(Debug, Clone, PartialEq)]
pub enum Datum<'a> {
    Null,
    Int(i64),
    /// Decimal in its textual form
    Decimal(Cow<'a, str>),
    Float(f64),
    Text(Cow<'a, str>),
    /// A value of a type statistics are not kept for
    Other,
}

/// A produced result tuple
pub trait TupleView {
    fn column_count(&self) -> usize;

    fn datum(&self, index: usize) -> Datum<'_>;
}

/// What [`canonicalize`] wrote into the per-tuple slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Null or unsupported; the slot holds the empty placeholder
    Missing,
    Int(i64),
    /// The slot holds the canonical text form
    Canonical,
}

/// Write the canonical form of `datum` for a column of `kind` into `out`.
pub fn canonicalize(kind: ValueKind, datum: &Datum<'_>, out: &mut String) -> Slot {
    out.clear();
    match (kind, datum) {
        (_, Datum::Null) | (ValueKind::Unsupported, _) => Slot::Missing,
        (ValueKind::Integer, Datum::Int(v)) => {
            let _ = write!(out, "{v}");
            Slot::Int(*v)
        }
        (ValueKind::Decimal, Datum::Decimal(raw)) => {
            let raw = raw.trim();
            if !write_plain_decimal(raw, out) {
                match raw.parse::<f64>() {
                    Ok(v) => write_float(v, out),
                    Err(_) => out.push_str(raw),
                }
            }
            Slot::Canonical
        }
        (ValueKind::Decimal, Datum::Float(v)) => {
            write_float(*v, out);
            Slot::Canonical
        }
        (ValueKind::Decimal, Datum::Int(v)) => {
            let _ = write!(out, "{v}");
            Slot::Canonical
        }
        (ValueKind::Text, Datum::Text(s)) => {
            out.push_str(s);
            Slot::Canonical
        }
        (kind, other) => {
            tracing::trace!("Value {:?} does not match column kind {:?}", other, kind);
            Slot::Missing
        }
    }
}

fn write_float(v: f64, out: &mut String) {
    if v == 0.0 {
        out.push('0');
    } else {
        let _ = write!(out, "{v}");
    }
}

/// Write the exact canonical form of a plain decimal literal such as
/// `-007.250`. Returns false, writing nothing, for any other text.
fn write_plain_decimal(raw: &str, out: &mut String) -> bool {
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return false;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return false;
    }

    let whole = whole.trim_start_matches('0');
    let fraction = fraction.trim_end_matches('0');
    if whole.is_empty() && fraction.is_empty() {
        out.push('0');
        return true;
    }
    if negative {
        out.push('-');
    }
    out.push_str(if whole.is_empty() { "0" } else { whole });
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    true
}
