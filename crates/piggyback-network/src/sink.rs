//! Report sink that writes statistics messages

use crate::codec::ReportCodec;
use bytes::BytesMut;
use piggyback_common::Result;
use piggyback_stats::{ReportSink, StatisticsReport};
use std::io::Write;

/// Encodes each report as a statistics message and writes it to `W`
pub struct WireSink<W> {
    writer: W,
    buf: BytesMut,
}

impl<W: Write + Send> WireSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buf: BytesMut::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ReportSink for WireSink<W> {
    fn deliver(&mut self, report: StatisticsReport) -> Result<()> {
        self.buf.clear();
        ReportCodec::encode(&report, &mut self.buf)?;
        self.writer.write_all(&self.buf)?;
        self.writer.flush()?;
        tracing::debug!(
            "Sent statistics message of {} bytes for {}",
            self.buf.len(),
            report.query_id
        );
        Ok(())
    }
}
