//! Feed scanners and the record pipeline seam.
//!
//! Each feed kind turns a byte source into normalized records:
//! - [`geo`] - decimal-range CSV, optionally inside a ZIP archive
//! - [`asn`] - gzip-compressed whitespace-delimited ASN table
//! - [`cloud`] - cloud-provider JSON documents with literal CIDRs
//!
//! Sources are consumed by [`RecordSource::drain`], which takes `self` so a
//! feed can only be scanned once.

mod asn;
mod cloud;
mod geo;

pub use asn::{AsnCursor, AsnFeed, AsnRow, Termination};
pub use cloud::{decode_cloud_entries, CloudEntry, CloudFeed, CloudProvider};
pub use geo::{GeoFeed, GeoRow, GeoRows};

use crate::cancel::CancelToken;
use crate::codec::JsonArrayWriter;
use crate::error::FeedError;
use crate::models::Record;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Receives records as they are produced.
pub trait RecordSink {
    fn accept(&mut self, record: Record) -> Result<(), FeedError>;
}

impl<W: Write> RecordSink for JsonArrayWriter<W> {
    fn accept(&mut self, record: Record) -> Result<(), FeedError> {
        self.encode(&record)?;
        Ok(())
    }
}

impl RecordSink for Vec<Record> {
    fn accept(&mut self, record: Record) -> Result<(), FeedError> {
        self.push(record);
        Ok(())
    }
}

/// A feed that can produce normalized records, once.
pub trait RecordSource {
    /// Scan the whole feed, pushing every record into `sink`.
    ///
    /// `cancel` is checked once per row; a cancelled scan returns
    /// [`FeedError::Cancelled`] and releases its readers.
    fn drain(self, sink: &mut dyn RecordSink, cancel: &CancelToken)
        -> Result<FeedStats, FeedError>;
}

/// Counters reported after a drain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    /// Rows (or entries) read from the source.
    pub rows: u64,
    /// Records handed to the sink.
    pub records: u64,
    /// Rows that produced no record.
    pub dropped: u64,
    /// Line number of a short line that ended an ASN stream early.
    pub truncated_at: Option<u64>,
}

impl fmt::Display for FeedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows={} records={} dropped={}",
            self.rows, self.records, self.dropped
        )?;
        if let Some(line) = self.truncated_at {
            write!(f, " truncated_at_line={line}")?;
        }
        Ok(())
    }
}

/// Supported feed kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Geo,
    Asn,
    Cloud(CloudProvider),
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Geo => "geo",
            FeedKind::Asn => "asn",
            FeedKind::Cloud(CloudProvider::Aws) => "aws",
            FeedKind::Cloud(CloudProvider::Gcp) => "gcp",
            FeedKind::Cloud(CloudProvider::Azure) => "azure",
        }
    }
}

impl FromStr for FeedKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geo" => Ok(FeedKind::Geo),
            "asn" => Ok(FeedKind::Asn),
            "aws" => Ok(FeedKind::Cloud(CloudProvider::Aws)),
            "gcp" => Ok(FeedKind::Cloud(CloudProvider::Gcp)),
            "azure" => Ok(FeedKind::Cloud(CloudProvider::Azure)),
            other => Err(format!(
                "unknown feed kind {other:?}, expected geo, asn, aws, gcp or azure"
            )),
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoRecord, RecordIndex};

    #[test]
    fn test_feed_kind_from_str() {
        assert_eq!("geo".parse::<FeedKind>().unwrap(), FeedKind::Geo);
        assert_eq!(" ASN ".parse::<FeedKind>().unwrap(), FeedKind::Asn);
        assert_eq!(
            "azure".parse::<FeedKind>().unwrap(),
            FeedKind::Cloud(CloudProvider::Azure)
        );
        assert!("csv".parse::<FeedKind>().is_err());
        for kind in ["geo", "asn", "aws", "gcp", "azure"] {
            assert_eq!(kind.parse::<FeedKind>().unwrap().to_string(), kind);
        }
    }

    #[test]
    fn test_writer_sink_encodes_records() {
        let mut writer = JsonArrayWriter::new(Vec::new());
        let record = Record::Geo(GeoRecord {
            id: "1.0.0.0/24".to_string(),
            index: RecordIndex::new("1.0.0.0/24"),
            country: "AU".to_string(),
            region: String::new(),
            city: String::new(),
            postal_code: String::new(),
            timezone: String::new(),
        });
        writer.accept(record.clone()).unwrap();
        writer.close().unwrap();
        assert!(matches!(
            writer.accept(record),
            Err(FeedError::Sink(crate::error::CodecError::Closed))
        ));
        let records: Vec<Record> = serde_json::from_slice(&writer.into_inner()).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = FeedStats {
            rows: 3,
            records: 5,
            dropped: 1,
            truncated_at: Some(4),
        };
        assert_eq!(
            stats.to_string(),
            "rows=3 records=5 dropped=1 truncated_at_line=4"
        );
    }
}
