//! Piggyback SQL - filter expressions, plan tree, and a planner for a SELECT subset

pub mod expr;
pub mod parser;
pub mod plan;
pub mod planner;

pub use expr::{BinaryOperator, Expr, Literal, UnaryOperator};
pub use parser::SqlParser;
pub use plan::{resolve_column, PlanColumn, PlanNode, SortKey};
pub use planner::SqlPlanner;
