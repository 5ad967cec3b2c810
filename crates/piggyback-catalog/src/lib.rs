//! Piggyback Catalog - base tables and their identifiers

pub mod in_memory;
pub mod traits;

pub use in_memory::InMemoryCatalog;
pub use traits::{CatalogProvider, TableEntry};
