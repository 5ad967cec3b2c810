//! Catalog traits

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use piggyback_common::{ColumnId, Result, TableId};
use std::sync::Arc;

/// Table entry metadata and contents
#[derive(Debug, Clone)]
pub struct TableEntry {
    pub id: TableId,
    pub name: String,
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

impl TableEntry {
    /// Identifier of `column` within this table
    pub fn column_id(&self, column: &str) -> Option<ColumnId> {
        self.schema
            .fields()
            .iter()
            .position(|f| f.name() == column)
            .map(|i| ColumnId(i as u32))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.fields().iter().map(|f| f.name().clone()).collect()
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }
}

/// Catalog provider trait
pub trait CatalogProvider: Send + Sync {
    /// List table names
    fn tables(&self) -> Vec<String>;

    /// Check if table exists
    fn table_exists(&self, name: &str) -> bool;

    /// Get a table by name
    fn table(&self, name: &str) -> Option<Arc<TableEntry>>;

    /// Get a table by identifier
    fn table_by_id(&self, id: TableId) -> Option<Arc<TableEntry>>;

    /// Create a table and assign it a fresh identifier
    fn create_table(&self, name: &str, schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<TableId>;

    /// Drop a table
    fn drop_table(&self, name: &str) -> Result<()>;
}
