//! Piggyback Stats - column statistics and functional dependencies gathered
//! while a query streams its result tuples
//!
//! The executor drives a [`PlanObserver`]: every plan node is announced once
//! before execution starts, every root tuple once as it is produced, and the
//! end of execution exactly once. [`PiggybackSession`] forwards those callouts
//! to the live [`StatisticsContext`] and hands the finished
//! [`StatisticsReport`] to a [`ReportSink`].

pub mod context;
pub mod facts;
pub mod fd;
pub mod ledger;
pub mod observe;
pub mod observer;
pub mod report;
pub mod sink;

pub use context::StatisticsContext;
pub use facts::{extract_fact, Fact, FactKind};
pub use fd::FdGrid;
pub use ledger::{ColumnStatistic, Ledger, Observation, Tracked};
pub use observe::{Datum, TupleView};
pub use observer::{NodeInit, NodeKind, NullObserver, PiggybackSession, PlanObserver, ScanTarget};
pub use report::{ColumnReport, FunctionalDependency, StatisticsReport};
pub use sink::{CollectingSink, LogSink, ReportSink};

use piggyback_common::PiggybackError;
use piggyback_containers::ContainerError;

pub(crate) fn exhausted(err: ContainerError) -> PiggybackError {
    PiggybackError::ResourceExhausted(err.to_string())
}
