//! Geolocation feed: decimal address ranges in CSV, plain or zipped.
//!
//! Column layout (no header):
//! `start, end, country, _, region, city, _, _, postal_code, timezone`.
//! Only `start` and `end` are required.

use super::{FeedStats, RecordSink, RecordSource};
use crate::cancel::CancelToken;
use crate::config::SNIFF_LEN;
use crate::error::FeedError;
use crate::models::{parse_decimal_address, AddressRange};
use crate::processing::normalize_geo;
use csv::ByteRecord;
use std::io::{self, Read, Seek, SeekFrom};
use zip::ZipArchive;

/// Placeholder used by the feed for "no country".
const NO_COUNTRY: &str = "-";

/// ZIP local file header and empty-archive signatures.
const ZIP_MAGIC: [&[u8]; 2] = [b"PK\x03\x04", b"PK\x05\x06"];

/// One geolocation row with a country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoRow {
    pub range: AddressRange,
    pub country: String,
    pub region: String,
    pub city: String,
    pub postal_code: String,
    pub timezone: String,
}

enum GeoInput<R> {
    Csv(R),
    Zip { archive: ZipArchive<R>, used: bool },
    Consumed,
}

/// Geolocation source. The content type is sniffed when opened.
pub struct GeoFeed<R: Read + Seek> {
    name: String,
    input: GeoInput<R>,
}

/// True when the leading bytes carry a ZIP signature. Rewinds `reader`.
fn sniff_zip<R: Read + Seek>(reader: &mut R) -> io::Result<bool> {
    let pos = reader.stream_position()?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    reader.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    reader.seek(SeekFrom::Start(pos))?;
    Ok(ZIP_MAGIC.iter().any(|magic| head.starts_with(magic)))
}

impl<R: Read + Seek> GeoFeed<R> {
    /// Sniff `reader` and prepare it for scanning. `name` labels errors.
    pub fn open(name: &str, mut reader: R) -> Result<Self, FeedError> {
        let is_zip = sniff_zip(&mut reader).map_err(|source| FeedError::Io {
            name: name.to_string(),
            source,
        })?;

        let input = if is_zip {
            let archive = ZipArchive::new(reader).map_err(|source| FeedError::Archive {
                name: name.to_string(),
                source,
            })?;
            log::debug!("{name}: zip archive with {} entries", archive.len());
            GeoInput::Zip {
                archive,
                used: false,
            }
        } else {
            log::debug!("{name}: plain CSV");
            GeoInput::Csv(reader)
        };

        Ok(GeoFeed {
            name: name.to_string(),
            input,
        })
    }

    pub fn is_archive(&self) -> bool {
        matches!(self.input, GeoInput::Zip { .. })
    }

    /// Row sequence over the CSV data. May only be called once.
    pub fn rows(&mut self) -> Result<GeoRows<'_>, FeedError> {
        if let GeoInput::Csv(_) = self.input {
            if let GeoInput::Csv(reader) = std::mem::replace(&mut self.input, GeoInput::Consumed) {
                return Ok(GeoRows::new(self.name.clone(), Box::new(reader)));
            }
        }

        match &mut self.input {
            GeoInput::Zip { archive, used } if !*used => {
                *used = true;
                let (index, member) = find_csv_member(archive, &self.name)?;
                let label = format!("{}:{member}", self.name);
                log::info!("{}: scanning member {member}", self.name);
                let file = archive.by_index(index).map_err(|source| FeedError::Archive {
                    name: label.clone(),
                    source,
                })?;
                Ok(GeoRows::new(label, Box::new(file)))
            }
            _ => Err(FeedError::AlreadyConsumed(self.name.clone())),
        }
    }
}

/// Index and name of the first `.csv` member.
fn find_csv_member<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<(usize, String), FeedError> {
    for index in 0..archive.len() {
        let file = archive.by_index(index).map_err(|source| FeedError::Archive {
            name: name.to_string(),
            source,
        })?;
        if file.is_file() && file.name().to_ascii_lowercase().ends_with(".csv") {
            return Ok((index, file.name().to_string()));
        }
    }
    Err(FeedError::NoCsvMember(name.to_string()))
}

/// Lazy geolocation rows; rows without a country are skipped and counted.
///
/// Not restartable. The first malformed row ends the sequence with an error.
/// Text columns are decoded lossily; only `start` and `end` must be exact.
pub struct GeoRows<'a> {
    name: String,
    reader: csv::Reader<Box<dyn Read + 'a>>,
    record: ByteRecord,
    row: u64,
    dropped: u64,
    done: bool,
}

impl<'a> GeoRows<'a> {
    fn new(name: String, input: Box<dyn Read + 'a>) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(input);
        GeoRows {
            name,
            reader,
            record: ByteRecord::new(),
            row: 0,
            dropped: 0,
            done: false,
        }
    }

    /// Rows skipped for a missing country so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn parse_row(&self) -> Result<Option<GeoRow>, FeedError> {
        let record = &self.record;
        if record.len() < 2 {
            return Err(FeedError::Row {
                name: self.name.clone(),
                row: self.row,
                details: format!("expected at least 2 columns, found {}", record.len()),
            });
        }
        let address = |raw: &[u8]| {
            let text = String::from_utf8_lossy(raw);
            parse_decimal_address(text.trim()).map_err(|source| FeedError::Address {
                name: self.name.clone(),
                row: self.row,
                source,
            })
        };
        let start = address(&record[0])?;
        let end = address(&record[1])?;

        let field = |i: usize| {
            String::from_utf8_lossy(record.get(i).unwrap_or_default())
                .trim()
                .to_string()
        };
        let country = field(2);
        if country.is_empty() || country == NO_COUNTRY {
            return Ok(None);
        }

        Ok(Some(GeoRow {
            range: AddressRange::new(start, end),
            country,
            region: field(4),
            city: field(5),
            postal_code: field(8),
            timezone: field(9),
        }))
    }

    /// Read exactly one CSV row. `Ok(None)` is a row dropped for its country.
    fn next_row(&mut self) -> Option<Result<Option<GeoRow>, FeedError>> {
        if self.done {
            return None;
        }
        match self.reader.read_byte_record(&mut self.record) {
            Ok(true) => {}
            Ok(false) => {
                self.done = true;
                return None;
            }
            Err(source) => {
                self.done = true;
                return Some(Err(FeedError::Csv {
                    name: self.name.clone(),
                    source,
                }));
            }
        }
        self.row += 1;

        match self.parse_row() {
            Ok(Some(row)) => Some(Ok(Some(row))),
            Ok(None) => {
                log::debug!("{} row {}: no country, dropped", self.name, self.row);
                self.dropped += 1;
                Some(Ok(None))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'a> Iterator for GeoRows<'a> {
    type Item = Result<GeoRow, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.next_row()? {
                Ok(Some(row)) => return Some(Ok(row)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl<R: Read + Seek> RecordSource for GeoFeed<R> {
    fn drain(
        mut self,
        sink: &mut dyn RecordSink,
        cancel: &CancelToken,
    ) -> Result<FeedStats, FeedError> {
        log::info!("#Start geo feed {}", self.name);
        let mut stats = FeedStats::default();
        let mut rows = self.rows()?;

        loop {
            if cancel.is_cancelled() {
                return Err(FeedError::Cancelled);
            }
            let row = match rows.next_row() {
                Some(row) => row?,
                None => break,
            };
            stats.rows += 1;
            let Some(row) = row else {
                stats.dropped += 1;
                continue;
            };

            let before = stats.records;
            for record in normalize_geo(row) {
                sink.accept(record)?;
                stats.records += 1;
            }
            if stats.records == before {
                stats.dropped += 1;
            }
        }

        Ok(stats)
    }
}
