//! In-memory catalog implementation

use super::{CatalogProvider, TableEntry};
use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use dashmap::DashMap;
use piggyback_common::{PiggybackError, Result, TableId};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// In-memory catalog implementation
pub struct InMemoryCatalog {
    tables: DashMap<String, Arc<TableEntry>>,
    next_id: AtomicU32,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self {
            tables: DashMap::new(),
            // Identifiers start at 1 so that 0 never names a real table.
            next_id: AtomicU32::new(1),
        }
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogProvider for InMemoryCatalog {
    fn tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    fn table(&self, name: &str) -> Option<Arc<TableEntry>> {
        self.tables.get(name).map(|e| e.value().clone())
    }

    fn table_by_id(&self, id: TableId) -> Option<Arc<TableEntry>> {
        self.tables
            .iter()
            .find(|e| e.value().id == id)
            .map(|e| e.value().clone())
    }

    fn create_table(&self, name: &str, schema: SchemaRef, batches: Vec<RecordBatch>) -> Result<TableId> {
        if self.table_exists(name) {
            return Err(PiggybackError::AlreadyExists(format!("table '{}'", name)));
        }
        if let Some(batch) = batches.iter().find(|b| b.schema() != schema) {
            return Err(PiggybackError::InvalidArgument(format!(
                "batch schema {:?} does not match table '{}'",
                batch.schema(),
                name
            )));
        }
        let id = TableId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = TableEntry {
            id,
            name: name.to_string(),
            schema,
            batches,
        };
        tracing::debug!("Registered table '{}' as {} ({} rows)", name, id, entry.num_rows());
        self.tables.insert(name.to_string(), Arc::new(entry));
        Ok(id)
    }

    fn drop_table(&self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(PiggybackError::NotFound(format!("table '{}'", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{CatalogProvider, InMemoryCatalog};
    use arrow_array::{Int64Array, RecordBatch, StringArray};
    use arrow_schema::{DataType, Field, Schema};
    use piggyback_common::ColumnId;
    use std::sync::Arc;

    fn test_schema() -> arrow_schema::SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]))
    }

    fn test_batch() -> RecordBatch {
        RecordBatch::try_new(
            test_schema(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(StringArray::from(vec![Some("alice"), None, Some("carol")])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_create_drop_table() {
        let catalog = InMemoryCatalog::new();

        let id = catalog
            .create_table("test_table", test_schema(), vec![test_batch()])
            .unwrap();
        assert!(catalog.table_exists("test_table"));
        assert_eq!(catalog.table("test_table").unwrap().id, id);
        assert_eq!(catalog.table_by_id(id).unwrap().name, "test_table");

        // Can't create duplicate
        let result = catalog.create_table("test_table", test_schema(), vec![]);
        assert!(result.is_err());

        catalog.drop_table("test_table").unwrap();
        assert!(!catalog.table_exists("test_table"));

        // Can't drop non-existent
        assert!(catalog.drop_table("nonexistent").is_err());
    }

    #[test]
    fn test_table_ids_are_distinct() {
        let catalog = InMemoryCatalog::new();
        let a = catalog.create_table("a", test_schema(), vec![]).unwrap();
        let b = catalog.create_table("b", test_schema(), vec![]).unwrap();
        assert_ne!(a, b);
        assert_eq!(catalog.tables(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_rejects_mismatched_batches() {
        let catalog = InMemoryCatalog::new();
        let other = Arc::new(Schema::new(vec![Field::new("x", DataType::Int64, false)]));
        let result = catalog.create_table("t", other, vec![test_batch()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_table_entry_columns() {
        let catalog = InMemoryCatalog::new();
        catalog
            .create_table("people", test_schema(), vec![test_batch(), test_batch()])
            .unwrap();
        let entry = catalog.table("people").unwrap();

        assert_eq!(entry.num_rows(), 6);
        assert_eq!(entry.column_names(), vec!["id".to_string(), "name".to_string()]);
        assert_eq!(entry.column_id("name"), Some(ColumnId(1)));
        assert_eq!(entry.column_id("missing"), None);
    }
}
