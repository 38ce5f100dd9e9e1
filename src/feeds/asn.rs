//! ASN feed: gzip-compressed `start end as_number country_code description` lines.

use super::{FeedStats, RecordSink, RecordSource};
use crate::cancel::CancelToken;
use crate::error::FeedError;
use crate::models::{parse_feed_address, AddressRange};
use crate::processing::normalize_asn;
use flate2::read::GzDecoder;
use regex::Regex;
use std::io::{BufRead, BufReader, Read};
use std::sync::OnceLock;

/// Four whitespace-delimited fields, then the description (which may contain spaces).
static LINE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_line_regex() -> &'static Regex {
    LINE_REGEX.get_or_init(|| {
        Regex::new(r"^\s*(\S+)\s+(\S+)\s+(\S+)\s+(\S+)\s+(\S.*?)\s*$").expect("Invalid Regex")
    })
}

/// One ASN table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsnRow {
    pub range: AddressRange,
    pub as_number: String,
    pub country_code: String,
    pub as_description: String,
}

/// Why an [`AsnCursor`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Clean end of the decompressed stream.
    Eof,
    /// A line with fewer than five fields ended the stream.
    ShortLine { line: u64 },
    /// A decompression or address error was returned.
    Error,
}

/// Line-at-a-time cursor over a gzip stream.
///
/// Each `next` decompresses and parses exactly one line. A line with fewer
/// than five fields ends the stream without an error; [`termination`](Self::termination)
/// tells that apart from a clean EOF.
pub struct AsnCursor<R: Read> {
    name: String,
    lines: BufReader<GzDecoder<R>>,
    buf: Vec<u8>,
    line: u64,
    termination: Option<Termination>,
}

impl<R: Read> AsnCursor<R> {
    pub fn new(name: &str, reader: R) -> Self {
        AsnCursor {
            name: name.to_string(),
            lines: BufReader::new(GzDecoder::new(reader)),
            buf: Vec::new(),
            line: 0,
            termination: None,
        }
    }

    /// `None` while the cursor can still produce rows.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    fn parse_line(&self, text: &str) -> Option<Result<AsnRow, FeedError>> {
        let caps = get_line_regex().captures(text)?;
        let address = |raw: &str| {
            parse_feed_address(raw).map_err(|source| FeedError::Address {
                name: self.name.clone(),
                row: self.line,
                source,
            })
        };
        let start = match address(&caps[1]) {
            Ok(a) => a,
            Err(e) => return Some(Err(e)),
        };
        let end = match address(&caps[2]) {
            Ok(a) => a,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(AsnRow {
            range: AddressRange::new(start, end),
            as_number: caps[3].to_string(),
            country_code: caps[4].to_string(),
            as_description: caps[5].to_string(),
        }))
    }
}

impl<R: Read> Iterator for AsnCursor<R> {
    type Item = Result<AsnRow, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.termination.is_some() {
            return None;
        }

        self.buf.clear();
        match self.lines.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.termination = Some(Termination::Eof);
                return None;
            }
            Ok(_) => {}
            Err(source) => {
                self.termination = Some(Termination::Error);
                return Some(Err(FeedError::Decompress {
                    name: self.name.clone(),
                    source,
                }));
            }
        }
        self.line += 1;

        let text = String::from_utf8_lossy(&self.buf);
        match self.parse_line(&text) {
            Some(Ok(row)) => Some(Ok(row)),
            Some(Err(e)) => {
                self.termination = Some(Termination::Error);
                Some(Err(e))
            }
            None => {
                log::warn!(
                    "{}: line {} has fewer than 5 fields, stopping: {:?}",
                    self.name,
                    self.line,
                    text.trim_end()
                );
                self.termination = Some(Termination::ShortLine { line: self.line });
                None
            }
        }
    }
}

/// ASN source over a gzip byte stream.
pub struct AsnFeed<R: Read> {
    name: String,
    reader: R,
}

impl<R: Read> AsnFeed<R> {
    pub fn new(name: &str, reader: R) -> Self {
        AsnFeed {
            name: name.to_string(),
            reader,
        }
    }

    pub fn cursor(self) -> AsnCursor<R> {
        AsnCursor::new(&self.name, self.reader)
    }
}

impl<R: Read> RecordSource for AsnFeed<R> {
    fn drain(self, sink: &mut dyn RecordSink, cancel: &CancelToken) -> Result<FeedStats, FeedError> {
        log::info!("#Start asn feed {}", self.name);
        let mut stats = FeedStats::default();
        let mut cursor = self.cursor();

        loop {
            if cancel.is_cancelled() {
                return Err(FeedError::Cancelled);
            }
            let row = match cursor.next() {
                Some(row) => row?,
                None => break,
            };
            stats.rows += 1;

            let before = stats.records;
            for record in normalize_asn(row) {
                sink.accept(record)?;
                stats.records += 1;
            }
            if stats.records == before {
                stats.dropped += 1;
            }
        }

        if let Some(Termination::ShortLine { line }) = cursor.termination() {
            stats.truncated_at = Some(line);
        }
        Ok(stats)
    }
}
