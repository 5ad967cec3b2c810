//! Report sinks

use crate::report::StatisticsReport;
use parking_lot::Mutex;
use piggyback_common::Result;
use std::sync::Arc;

/// Receives the report of each finished execution
pub trait ReportSink: Send {
    fn deliver(&mut self, report: StatisticsReport) -> Result<()>;
}

/// Keeps delivered reports in memory. Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    reports: Arc<Mutex<Vec<StatisticsReport>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    pub fn last(&self) -> Option<StatisticsReport> {
        self.reports.lock().last().cloned()
    }

    pub fn take(&self) -> Vec<StatisticsReport> {
        std::mem::take(&mut *self.reports.lock())
    }
}

impl ReportSink for CollectingSink {
    fn deliver(&mut self, report: StatisticsReport) -> Result<()> {
        self.reports.lock().push(report);
        Ok(())
    }
}

/// Writes each report to the log, one line per column and dependency
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ReportSink for LogSink {
    fn deliver(&mut self, report: StatisticsReport) -> Result<()> {
        tracing::info!(
            "Statistics for {} ({} tuples)",
            report.query_id,
            report.tuples_observed
        );
        for line in report.to_text().lines() {
            tracing::info!("{}", line);
        }
        Ok(())
    }
}
