//! Statistics message codec
//!
//! Body layout, all integers big-endian:
//!
//! ```text
//! i32 column count
//! per column: name\0, i32 position, i32 distinct (-1 unknown), u8 flags,
//!             [i64 min], [i64 max]
//! i32 dependency count
//! per dependency: determinant\0, dependent\0
//! ```
//!
//! Flag bit 0 marks a numeric column, bits 1 and 2 the presence of min and
//! max. Only integer bounds travel.

use bytes::{Buf, BufMut, BytesMut};
use piggyback_common::{PiggybackError, Result, Scalar};
use piggyback_stats::StatisticsReport;
use serde::{Deserialize, Serialize};

/// Type byte of the statistics message
pub const STATISTICS_MESSAGE: u8 = b'X';

const FLAG_NUMERIC: u8 = 0b001;
const FLAG_MIN: u8 = 0b010;
const FLAG_MAX: u8 = 0b100;

/// Column statistics as a client sees them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientColumnStatistic {
    pub name: String,
    pub position: i32,
    pub distinct_count: Option<u32>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub is_numeric: bool,
}

/// Decoded statistics message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientStatistics {
    pub columns: Vec<ClientColumnStatistic>,
    /// (determinant, dependent) column names
    pub functional_dependencies: Vec<(String, String)>,
}

pub struct ReportCodec;

impl ReportCodec {
    /// Append one statistics message for `report` to `dst`.
    pub fn encode(report: &StatisticsReport, dst: &mut BytesMut) -> Result<()> {
        dst.put_u8(STATISTICS_MESSAGE);

        // Length placeholder, filled in once the body is written.
        let base = dst.len();
        dst.put_u32(0);

        dst.put_i32(count(report.columns.len())?);
        for column in &report.columns {
            put_cstr(dst, &column.name)?;
            dst.put_i32(count(column.position)?);
            let distinct = match column.distinct_count {
                Some(n) => i32::try_from(n).unwrap_or(i32::MAX),
                None => -1,
            };
            dst.put_i32(distinct);

            let min = column.min.as_ref().and_then(Scalar::as_int);
            let max = column.max.as_ref().and_then(Scalar::as_int);
            let mut flags = 0;
            if column.is_numeric {
                flags |= FLAG_NUMERIC;
            }
            if min.is_some() {
                flags |= FLAG_MIN;
            }
            if max.is_some() {
                flags |= FLAG_MAX;
            }
            dst.put_u8(flags);
            if let Some(min) = min {
                dst.put_i64(min);
            }
            if let Some(max) = max {
                dst.put_i64(max);
            }
        }

        dst.put_i32(count(report.functional_dependencies.len())?);
        for fd in &report.functional_dependencies {
            put_cstr(dst, &fd.determinant_name)?;
            put_cstr(dst, &fd.dependent_name)?;
        }

        let len = u32::try_from(dst.len() - base)
            .map_err(|_| PiggybackError::Codec("statistics message too large".to_string()))?;
        dst[base..base + 4].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }

    pub fn encode_to_vec(report: &StatisticsReport) -> Result<Vec<u8>> {
        let mut buf = BytesMut::new();
        Self::encode(report, &mut buf)?;
        Ok(buf.to_vec())
    }

    /// Decode one message from the front of `src`. Returns `Ok(None)` and
    /// consumes nothing while the frame is incomplete.
    pub fn decode(src: &mut BytesMut) -> Result<Option<ClientStatistics>> {
        if src.len() < 5 {
            return Ok(None);
        }
        if src[0] != STATISTICS_MESSAGE {
            return Err(PiggybackError::Codec(format!(
                "unexpected message type {:?}",
                char::from(src[0])
            )));
        }
        let len = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;
        if len < 4 {
            return Err(PiggybackError::Codec(format!("invalid frame length {}", len)));
        }
        if src.len() < 1 + len {
            return Ok(None);
        }

        src.advance(5);
        let mut body = src.split_to(len - 4).freeze();
        let stats = decode_body(&mut body)?;
        if body.has_remaining() {
            return Err(PiggybackError::Codec(format!(
                "{} trailing bytes in statistics message",
                body.remaining()
            )));
        }
        Ok(Some(stats))
    }
}

fn count(n: usize) -> Result<i32> {
    i32::try_from(n).map_err(|_| PiggybackError::Codec(format!("count {} out of range", n)))
}

fn put_cstr(dst: &mut BytesMut, s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(PiggybackError::Codec(format!("name {:?} contains NUL", s)));
    }
    dst.put_slice(s.as_bytes());
    dst.put_u8(0);
    Ok(())
}

fn decode_body(buf: &mut impl Buf) -> Result<ClientStatistics> {
    let columns = read_count(buf)?;
    let mut stats = ClientStatistics::default();
    for _ in 0..columns {
        let name = read_cstr(buf)?;
        let position = read_i32(buf)?;
        let distinct = read_i32(buf)?;
        let flags = read_u8(buf)?;
        let min = if flags & FLAG_MIN != 0 { Some(read_i64(buf)?) } else { None };
        let max = if flags & FLAG_MAX != 0 { Some(read_i64(buf)?) } else { None };
        stats.columns.push(ClientColumnStatistic {
            name,
            position,
            distinct_count: u32::try_from(distinct).ok(),
            min,
            max,
            is_numeric: flags & FLAG_NUMERIC != 0,
        });
    }

    let dependencies = read_count(buf)?;
    for _ in 0..dependencies {
        let determinant = read_cstr(buf)?;
        let dependent = read_cstr(buf)?;
        stats.functional_dependencies.push((determinant, dependent));
    }
    Ok(stats)
}

fn truncated() -> PiggybackError {
    PiggybackError::Codec("truncated statistics message".to_string())
}

fn read_u8(buf: &mut impl Buf) -> Result<u8> {
    if buf.remaining() < 1 {
        return Err(truncated());
    }
    Ok(buf.get_u8())
}

fn read_i32(buf: &mut impl Buf) -> Result<i32> {
    if buf.remaining() < 4 {
        return Err(truncated());
    }
    Ok(buf.get_i32())
}

fn read_i64(buf: &mut impl Buf) -> Result<i64> {
    if buf.remaining() < 8 {
        return Err(truncated());
    }
    Ok(buf.get_i64())
}

fn read_count(buf: &mut impl Buf) -> Result<usize> {
    let n = read_i32(buf)?;
    usize::try_from(n).map_err(|_| PiggybackError::Codec(format!("negative count {}", n)))
}

fn read_cstr(buf: &mut impl Buf) -> Result<String> {
    let mut bytes = Vec::new();
    loop {
        match read_u8(buf)? {
            0 => break,
            b => bytes.push(b),
        }
    }
    String::from_utf8(bytes).map_err(|e| PiggybackError::Codec(format!("invalid name: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use piggyback_common::QueryId;
    use piggyback_stats::{ColumnReport, FunctionalDependency};

    fn report() -> StatisticsReport {
        let column = |name: &str, position, distinct, min, max, is_numeric| ColumnReport {
            name: name.to_string(),
            position,
            distinct_count: distinct,
            min,
            max,
            most_frequent: None,
            is_numeric,
            distinct_final: false,
            min_final: false,
            max_final: false,
        };
        StatisticsReport {
            query_id: QueryId::new(),
            finished_at: Default::default(),
            tuples_observed: 5,
            columns: vec![
                column("id", 0, Some(5), Some(Scalar::Int(1)), Some(Scalar::Int(5)), true),
                column("dept", 1, Some(2), Some(Scalar::Text("ops".into())), None, false),
                column("age", 2, None, Some(Scalar::Int(19)), None, true),
            ],
            functional_dependencies: vec![FunctionalDependency {
                determinant: 0,
                dependent: 1,
                determinant_name: "id".to_string(),
                dependent_name: "dept".to_string(),
            }],
        }
    }

    #[test]
    fn test_header_and_length() {
        let bytes = ReportCodec::encode_to_vec(&report()).unwrap();
        assert_eq!(bytes[0], b'X');
        let len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;
        assert_eq!(len, bytes.len() - 1);
        assert_eq!(&bytes[5..9], &3i32.to_be_bytes());
        assert_eq!(&bytes[9..12], b"id\0");
    }

    #[test]
    fn test_decode_what_was_encoded() {
        let mut buf = BytesMut::new();
        ReportCodec::encode(&report(), &mut buf).unwrap();
        let stats = ReportCodec::decode(&mut buf).unwrap().unwrap();
        assert!(buf.is_empty());

        assert_eq!(stats.columns.len(), 3);
        assert_eq!(stats.columns[0].min, Some(1));
        assert_eq!(stats.columns[0].max, Some(5));
        // Text bounds do not travel.
        assert_eq!(stats.columns[1].min, None);
        assert!(!stats.columns[1].is_numeric);
        assert_eq!(stats.columns[2].distinct_count, None);
        assert_eq!(stats.columns[2].min, Some(19));
        assert_eq!(
            stats.functional_dependencies,
            vec![("id".to_string(), "dept".to_string())]
        );
    }

    #[test]
    fn test_partial_frame() {
        let bytes = ReportCodec::encode_to_vec(&report()).unwrap();
        for cut in [0, 3, 5, bytes.len() - 1] {
            let mut buf = BytesMut::from(&bytes[..cut]);
            assert_eq!(ReportCodec::decode(&mut buf).unwrap(), None);
            assert_eq!(buf.len(), cut);
        }
    }

    #[test]
    fn test_two_frames_back_to_back() {
        let mut buf = BytesMut::new();
        ReportCodec::encode(&report(), &mut buf).unwrap();
        ReportCodec::encode(&report(), &mut buf).unwrap();
        assert!(ReportCodec::decode(&mut buf).unwrap().is_some());
        assert!(ReportCodec::decode(&mut buf).unwrap().is_some());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut wrong_tag = BytesMut::from(&b"Q\0\0\0\x04"[..]);
        assert!(ReportCodec::decode(&mut wrong_tag).is_err());

        let mut short_body = BytesMut::from(&b"X\0\0\0\x06\0\0"[..]);
        assert!(ReportCodec::decode(&mut short_body).is_err());

        let mut bad_len = BytesMut::from(&b"X\0\0\0\x02"[..]);
        assert!(ReportCodec::decode(&mut bad_len).is_err());
    }
}
