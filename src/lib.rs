//! Piggyback - column statistics and functional dependencies gathered while
//! a query executes
//!
//! The engine reports every plan node and every root tuple to a
//! [`PlanObserver`]; a [`PiggybackSession`] turns those callouts into a
//! [`StatisticsReport`] delivered to a [`ReportSink`] when execution ends.

pub use piggyback_catalog as catalog;
pub use piggyback_common as common;
pub use piggyback_containers as containers;
pub use piggyback_executor as executor;
pub use piggyback_network as network;
pub use piggyback_sql as sql;
pub use piggyback_stats as stats;

pub use piggyback_common::{PiggybackError, Result, StatsConfig};
pub use piggyback_executor::{ExecutionEngine, QueryResult};
pub use piggyback_network::{ReportCodec, WireSink};
pub use piggyback_stats::{
    CollectingSink, PiggybackSession, PlanObserver, ReportSink, StatisticsReport,
};
