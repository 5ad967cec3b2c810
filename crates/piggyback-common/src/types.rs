//! Piggyback core types

use arrow_schema::DataType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base table identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u32);

impl TableId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "table_{}", self.0)
    }
}

impl From<u32> for TableId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Column identifier within its base table (0-based schema index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

impl ColumnId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "column_{}", self.0)
    }
}

impl From<u32> for ColumnId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Unique query execution identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryId(pub Uuid);

impl QueryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for QueryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "query_{}", self.0)
    }
}

impl From<Uuid> for QueryId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Comparison and hashing strategy of a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Decimal,
    Text,
    Unsupported,
}

impl ValueKind {
    pub fn from_data_type(data_type: &DataType) -> Self {
        match data_type {
            DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32 => ValueKind::Integer,
            // Values past the i64 range are read as decimal text.
            DataType::UInt64
            | DataType::Float16
            | DataType::Float32
            | DataType::Float64
            | DataType::Decimal128(_, _)
            | DataType::Decimal256(_, _) => ValueKind::Decimal,
            DataType::Utf8 | DataType::LargeUtf8 => ValueKind::Text,
            _ => ValueKind::Unsupported,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ValueKind::Integer)
    }
}

/// Identity of one result column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Position in the result tuple
    pub position: usize,
    /// Source table, if the column traces back to a single base table
    pub table: Option<TableId>,
    /// Source column within `table`
    pub column: Option<ColumnId>,
    pub kind: ValueKind,
    pub name: String,
}

impl ColumnDescriptor {
    pub fn new(position: usize, name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            position,
            table: None,
            column: None,
            kind,
            name: name.into(),
        }
    }

    pub fn with_source(mut self, table: TableId, column: ColumnId) -> Self {
        self.table = Some(table);
        self.column = Some(column);
        self
    }

    pub fn is_from(&self, table: TableId, column: ColumnId) -> bool {
        self.table == Some(table) && self.column == Some(column)
    }
}

/// A statistic value: bound, constant or most frequent value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(v) => write!(f, "{v}"),
        }
    }
}
