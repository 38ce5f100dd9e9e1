//! Pipeline configuration, read from the environment (and `.env`).

use crate::feeds::FeedKind;
use std::error::Error;
use std::path::PathBuf;

/// Leading bytes inspected when sniffing a geolocation feed.
pub const SNIFF_LEN: usize = 512;

pub const ENV_FEED_KIND: &str = "FEED_KIND";
pub const ENV_FEED_PATH: &str = "FEED_PATH";
pub const ENV_OUTPUT_PATH: &str = "OUTPUT_PATH";
pub const ENV_VERIFY_OUTPUT: &str = "VERIFY_OUTPUT";

/// What to ingest and where to write the JSON array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub kind: FeedKind,
    pub input: PathBuf,
    pub output: PathBuf,
    /// Re-read the output and compare record counts after writing.
    pub verify_output: bool,
}

impl FeedConfig {
    /// Config with the default dated output name, e.g. `asn_2024-01-31.json`.
    pub fn new(kind: FeedKind, input: impl Into<PathBuf>) -> Self {
        FeedConfig {
            kind,
            input: input.into(),
            output: default_output_path(kind),
            verify_output: false,
        }
    }

    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind: FeedKind = lookup(ENV_FEED_KIND)
            .ok_or_else(|| format!("{ENV_FEED_KIND} is not set"))?
            .parse()?;
        let input = lookup(ENV_FEED_PATH).ok_or_else(|| format!("{ENV_FEED_PATH} is not set"))?;

        let mut config = FeedConfig::new(kind, input);
        if let Some(output) = lookup(ENV_OUTPUT_PATH).filter(|s| !s.trim().is_empty()) {
            config.output = PathBuf::from(output);
        }
        config.verify_output = lookup(ENV_VERIFY_OUTPUT)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        log::debug!("config: {config:?}");
        Ok(config)
    }
}

fn default_output_path(kind: FeedKind) -> PathBuf {
    let now = chrono::Utc::now();
    PathBuf::from(format!("{kind}_{}.json", now.format("%Y-%m-%d")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::CloudProvider;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_full() {
        let config = FeedConfig::from_lookup(lookup(&[
            (ENV_FEED_KIND, "gcp"),
            (ENV_FEED_PATH, "/data/cloud.json"),
            (ENV_OUTPUT_PATH, "/tmp/gcp.json"),
            (ENV_VERIFY_OUTPUT, "true"),
        ]))
        .unwrap();
        assert_eq!(config.kind, FeedKind::Cloud(CloudProvider::Gcp));
        assert_eq!(config.input, PathBuf::from("/data/cloud.json"));
        assert_eq!(config.output, PathBuf::from("/tmp/gcp.json"));
        assert!(config.verify_output);
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = FeedConfig::from_lookup(lookup(&[
            (ENV_FEED_KIND, "asn"),
            (ENV_FEED_PATH, "ip2asn-combined.tsv.gz"),
        ]))
        .unwrap();
        assert!(!config.verify_output);
        let output = config.output.to_string_lossy().to_string();
        assert!(output.starts_with("asn_"), "{output}");
        assert!(output.ends_with(".json"), "{output}");
    }

    #[test]
    fn test_from_lookup_missing_or_bad() {
        let err = FeedConfig::from_lookup(lookup(&[(ENV_FEED_PATH, "x")])).unwrap_err();
        assert_eq!(err.to_string(), "FEED_KIND is not set");
        assert!(FeedConfig::from_lookup(lookup(&[(ENV_FEED_KIND, "geo")])).is_err());
        assert!(
            FeedConfig::from_lookup(lookup(&[(ENV_FEED_KIND, "ftp"), (ENV_FEED_PATH, "x")]))
                .is_err()
        );
    }
}
