//! Row values

use arrow_array::cast::AsArray;
use arrow_array::Array;
use arrow_schema::DataType;
use piggyback_stats::{Datum, TupleView};
use std::borrow::Cow;
use std::cmp::Ordering;

/// A single value flowing through the executor
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int(i64),
    Float(f64),
    /// Decimal in its textual form
    Decimal(String),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// SQL comparison; `None` if either side is null or the types differ.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// Total order used for sorting: nulls first.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    pub fn as_datum(&self) -> Datum<'_> {
        match self {
            Value::Null => Datum::Null,
            Value::Int(v) => Datum::Int(*v),
            Value::Float(v) => Datum::Float(*v),
            Value::Decimal(s) => Datum::Decimal(Cow::Borrowed(s)),
            Value::Text(s) => Datum::Text(Cow::Borrowed(s)),
            Value::Boolean(_) => Datum::Other,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Decimal(v) | Value::Text(v) => f.write_str(v),
        }
    }
}

static NULL: Value = Value::Null;

/// One tuple
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&NULL)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// This row followed by `other`
    pub fn concat(&self, other: &Row) -> Row {
        let mut values = Vec::with_capacity(self.len() + other.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&other.values);
        Row { values }
    }
}

impl TupleView for Row {
    fn column_count(&self) -> usize {
        self.values.len()
    }

    fn datum(&self, index: usize) -> Datum<'_> {
        self.get(index).as_datum()
    }
}

impl std::fmt::Display for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

/// Unsigned values past the `i64` range keep their exact digits as decimal text.
fn unsigned(v: u64) -> Value {
    i64::try_from(v).map_or_else(|_| Value::Decimal(v.to_string()), Value::Int)
}

/// Read the value at `index` of an arrow array.
pub fn extract_value(array: &dyn Array, index: usize) -> Value {
    if array.is_null(index) {
        return Value::Null;
    }
    match array.data_type() {
        DataType::Boolean => Value::Boolean(array.as_boolean().value(index)),
        DataType::Int8 => {
            let arr = array.as_primitive::<arrow_array::types::Int8Type>();
            Value::Int(arr.value(index).into())
        }
        DataType::Int16 => {
            let arr = array.as_primitive::<arrow_array::types::Int16Type>();
            Value::Int(arr.value(index).into())
        }
        DataType::Int32 => {
            let arr = array.as_primitive::<arrow_array::types::Int32Type>();
            Value::Int(arr.value(index).into())
        }
        DataType::Int64 => {
            let arr = array.as_primitive::<arrow_array::types::Int64Type>();
            Value::Int(arr.value(index))
        }
        DataType::UInt8 => {
            let arr = array.as_primitive::<arrow_array::types::UInt8Type>();
            Value::Int(arr.value(index).into())
        }
        DataType::UInt16 => {
            let arr = array.as_primitive::<arrow_array::types::UInt16Type>();
            Value::Int(arr.value(index).into())
        }
        DataType::UInt32 => {
            let arr = array.as_primitive::<arrow_array::types::UInt32Type>();
            Value::Int(arr.value(index).into())
        }
        DataType::UInt64 => {
            let arr = array.as_primitive::<arrow_array::types::UInt64Type>();
            unsigned(arr.value(index))
        }
        DataType::Float16 => {
            let arr = array.as_primitive::<arrow_array::types::Float16Type>();
            Value::Float(arr.value(index).to_f64())
        }
        DataType::Float32 => {
            let arr = array.as_primitive::<arrow_array::types::Float32Type>();
            Value::Float(arr.value(index).into())
        }
        DataType::Float64 => {
            let arr = array.as_primitive::<arrow_array::types::Float64Type>();
            Value::Float(arr.value(index))
        }
        DataType::Decimal128(_, _) => {
            let arr = array.as_primitive::<arrow_array::types::Decimal128Type>();
            Value::Decimal(arr.value_as_string(index))
        }
        DataType::Decimal256(_, _) => {
            let arr = array.as_primitive::<arrow_array::types::Decimal256Type>();
            Value::Decimal(arr.value_as_string(index))
        }
        DataType::Utf8 => Value::Text(array.as_string::<i32>().value(index).to_string()),
        DataType::LargeUtf8 => Value::Text(array.as_string::<i64>().value(index).to_string()),
        other => {
            tracing::trace!("Reading unsupported type {} as NULL", other);
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::i256;
    use arrow_array::{Decimal128Array, Decimal256Array, Int32Array, StringArray, UInt64Array};

    #[test]
    fn test_extract_values() {
        let ints = Int32Array::from(vec![Some(7), None]);
        assert_eq!(extract_value(&ints, 0), Value::Int(7));
        assert_eq!(extract_value(&ints, 1), Value::Null);

        let text = StringArray::from(vec!["ops"]);
        assert_eq!(extract_value(&text, 0), Value::Text("ops".into()));

        let big = UInt64Array::from(vec![u64::MAX, u64::MAX - 1, 5]);
        assert_eq!(extract_value(&big, 0), Value::Decimal("18446744073709551615".into()));
        assert_eq!(extract_value(&big, 1).to_string(), "18446744073709551614");
        assert_eq!(extract_value(&big, 2), Value::Int(5));

        let decimals = Decimal128Array::from(vec![150])
            .with_precision_and_scale(5, 2)
            .unwrap();
        assert_eq!(extract_value(&decimals, 0), Value::Decimal("1.50".into()));

        let wide = Decimal256Array::from(vec![Some(i256::from_i128(-1234)), None])
            .with_precision_and_scale(40, 3)
            .unwrap();
        assert_eq!(extract_value(&wide, 0), Value::Decimal("-1.234".into()));
        assert_eq!(extract_value(&wide, 1), Value::Null);
    }

    #[test]
    fn test_compare() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(
            Value::Decimal("1.50".into()).compare(&Value::Int(1)),
            Some(Ordering::Greater)
        );
        assert_eq!(Value::Null.compare(&Value::Int(1)), None);
        assert_eq!(Value::Text("a".into()).compare(&Value::Int(1)), None);
        assert_eq!(Value::Null.sort_cmp(&Value::Int(1)), Ordering::Less);
    }

    #[test]
    fn test_row_as_tuple() {
        let row = Row::new(vec![Value::Int(1), Value::Text("x".into()), Value::Boolean(true)]);
        assert_eq!(row.column_count(), 3);
        assert_eq!(row.datum(0), Datum::Int(1));
        assert_eq!(row.datum(1), Datum::Text("x".into()));
        assert_eq!(row.datum(2), Datum::Other);
        assert_eq!(row.to_string(), "1\tx\ttrue");
    }
}
