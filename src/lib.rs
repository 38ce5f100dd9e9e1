//! IP feed canonicalization: turns geolocation, ASN and cloud-provider feeds
//! into a stream of CIDR-keyed records written as one JSON array.
//!
//! Rows are pulled one at a time, decomposed into prefixes, normalized and
//! written immediately; no feed is ever held in memory as a whole.

pub mod cancel;
pub mod codec;
pub mod config;
pub mod error;
pub mod feeds;
pub mod models;
pub mod processing;

pub use cancel::CancelToken;
pub use config::FeedConfig;
pub use error::{AddressError, CodecError, FeedError};
pub use feeds::{FeedKind, FeedStats, RecordSink, RecordSource};

use codec::{JsonArrayReader, JsonArrayWriter};
use feeds::{AsnFeed, CloudFeed, GeoFeed};
use models::Record;
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Stream the configured feed into its output file.
///
/// On failure the partial output file is removed.
pub fn run_feed(config: &FeedConfig, cancel: &CancelToken) -> Result<FeedStats, Box<dyn Error>> {
    let name = config.input.display().to_string();
    log::info!(
        "#Start run_feed() kind={} input={name} output={}",
        config.kind,
        config.output.display()
    );

    let input = File::open(&config.input).map_err(|e| format!("Error opening feed {name}: {e}"))?;
    let output = File::create(&config.output)
        .map_err(|e| format!("Error creating output {}: {e}", config.output.display()))?;
    let mut writer = JsonArrayWriter::new(BufWriter::new(output));

    let result = drain_into(config, &name, BufReader::new(input), &mut writer, cancel)
        .and_then(|stats| {
            writer.close()?;
            Ok(stats)
        });
    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            drop(writer);
            log::warn!("Removing partial output {}", config.output.display());
            if let Err(rm) = std::fs::remove_file(&config.output) {
                log::error!("Could not remove {}: {rm}", config.output.display());
            }
            return Err(e.into());
        }
    };
    log::info!("#End run_feed() {name}: {stats}");

    if config.verify_output {
        let written = count_output_records(&config.output)?;
        if written != stats.records {
            return Err(format!(
                "Output mismatch: {written} records in {} != {} written",
                config.output.display(),
                stats.records
            )
            .into());
        }
        log::info!("Verified {written} records in {}", config.output.display());
    }

    Ok(stats)
}

fn drain_into(
    config: &FeedConfig,
    name: &str,
    input: BufReader<File>,
    sink: &mut dyn RecordSink,
    cancel: &CancelToken,
) -> Result<FeedStats, FeedError> {
    match config.kind {
        FeedKind::Geo => GeoFeed::open(name, input)?.drain(sink, cancel),
        FeedKind::Asn => AsnFeed::new(name, input).drain(sink, cancel),
        FeedKind::Cloud(provider) => CloudFeed::new(provider, name, input).drain(sink, cancel),
    }
}

/// Count the records in a JSON array written by [`run_feed`], one at a time.
pub fn count_output_records(path: &Path) -> Result<u64, Box<dyn Error>> {
    let file = File::open(path).map_err(|e| format!("Error opening {}: {e}", path.display()))?;
    let mut count = 0;
    for record in JsonArrayReader::<_, Record>::new(file, &[]) {
        record?;
        count += 1;
    }
    Ok(count)
}
