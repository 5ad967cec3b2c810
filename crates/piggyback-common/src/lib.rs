//! Piggyback Common - Shared types, errors, and configuration

pub mod config;
pub mod error;
pub mod types;

pub use config::{CliConfig, ReportFormat, StatsConfig};
pub use error::{PiggybackError, Result};
pub use types::{ColumnDescriptor, ColumnId, QueryId, Scalar, TableId, ValueKind};
