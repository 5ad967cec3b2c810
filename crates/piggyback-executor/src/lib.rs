//! Piggyback Executor - tuple-at-a-time query execution over catalog tables
//!
//! The engine announces every plan node to a
//! [`PlanObserver`](piggyback_stats::PlanObserver) before the first tuple,
//! reports each root tuple as it is produced, and ends the execution exactly
//! once however it stops.

pub mod engine;
pub mod eval;
pub mod physical_plan;
pub mod value;

pub use engine::{ExecutionEngine, QueryResult};
pub use eval::BoundExpr;
pub use value::{extract_value, Row, Value};
