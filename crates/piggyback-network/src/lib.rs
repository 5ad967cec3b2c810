//! Piggyback Network - wire encoding of the statistics report
//!
//! A report travels as one `'X'` message in the framing used by the
//! PostgreSQL backend protocol: a type byte, then a `u32` length that counts
//! itself, then the body.

pub mod codec;
pub mod sink;

pub use codec::{ClientColumnStatistic, ClientStatistics, ReportCodec, STATISTICS_MESSAGE};
pub use sink::WireSink;
