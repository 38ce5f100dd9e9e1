//! Error types for address parsing, feed scanning and the JSON array codec.

use std::io;
use thiserror::Error;

/// Errors raised while building addresses and prefixes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// Input is not a base-10 integer, not literal address text, or exceeds 128 bits.
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("prefix length /{length} exceeds {width} bits")]
    InvalidPrefixLength { length: u8, width: u8 },

    #[error("invalid CIDR: {0:?}")]
    InvalidCidr(String),
}

/// Errors raised by the feed scanners and the record pipeline.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("I/O error reading {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {name}: {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    /// Structural archive error, wrapped with the archive (and member) name.
    #[error("archive error in {name}: {source}")]
    Archive {
        name: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive {0} has no .csv member")]
    NoCsvMember(String),

    /// Gzip header or stream corruption.
    #[error("decompression error in {name}: {source}")]
    Decompress {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("JSON error in {name} at {path}: {details}")]
    Json {
        name: String,
        path: String,
        details: String,
    },

    #[error("{name} row {row}: {source}")]
    Address {
        name: String,
        row: u64,
        #[source]
        source: AddressError,
    },

    #[error("{name} row {row}: {details}")]
    Row {
        name: String,
        row: u64,
        details: String,
    },

    #[error("feed {0} has already been consumed")]
    AlreadyConsumed(String),

    #[error("feed scan cancelled")]
    Cancelled,

    #[error("record sink rejected record: {0}")]
    Sink(#[from] CodecError),
}

/// Errors raised by the streaming JSON array writer and reader.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("array writer is closed")]
    Closed,

    /// An earlier write failed part-way; the array can no longer be completed.
    #[error("array writer failed on an earlier element")]
    Failed,

    #[error("key {0:?} not found")]
    MissingKey(String),

    #[error("expected {expected} at byte {offset}, found {found:?}")]
    Unexpected {
        expected: &'static str,
        found: char,
        offset: u64,
    },

    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_source() {
        let err = FeedError::NoCsvMember("geo.zip".to_string());
        assert_eq!(err.to_string(), "archive geo.zip has no .csv member");

        let err = FeedError::Archive {
            name: "geo.zip".to_string(),
            source: zip::result::ZipError::FileNotFound,
        };
        assert!(err.to_string().starts_with("archive error in geo.zip: "));
        assert!(std::error::Error::source(&err).is_some());

        let err = FeedError::Address {
            name: "geo.csv".to_string(),
            row: 7,
            source: AddressError::InvalidAddress("12x".to_string()),
        };
        assert_eq!(err.to_string(), "geo.csv row 7: invalid address: \"12x\"");
    }

    #[test]
    fn test_codec_error_converts_into_feed_error() {
        let err: FeedError = CodecError::Closed.into();
        assert!(matches!(err, FeedError::Sink(CodecError::Closed)));
    }
}
