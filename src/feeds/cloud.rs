//! Cloud-provider address lists (AWS, GCP, Azure service tags).
//!
//! These documents are small, so each one is decoded in full. Entries already
//! carry literal CIDRs and need no decomposition; the id is the parsed prefix
//! written back in canonical form.

use super::{FeedStats, RecordSink, RecordSource};
use crate::cancel::CancelToken;
use crate::error::FeedError;
use crate::models::CidrPrefix;
use crate::processing::normalize_cloud;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Read;

/// Cloud provider whose document layout is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
}

impl CloudProvider {
    /// Name written into `as_name`.
    pub fn name(&self) -> &'static str {
        match self {
            CloudProvider::Aws => "AWS",
            CloudProvider::Gcp => "GCP",
            CloudProvider::Azure => "Azure",
        }
    }
}

/// One provider entry in a common shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudEntry {
    pub cidr: String,
    pub service: String,
    pub region: Option<String>,
}

// ip-ranges.json
#[derive(Deserialize, Debug)]
struct AwsDocument {
    prefixes: Vec<AwsPrefix>,
    #[serde(default)]
    ipv6_prefixes: Vec<AwsIpv6Prefix>,
}

#[derive(Deserialize, Debug)]
struct AwsPrefix {
    ip_prefix: String,
    region: String,
    service: String,
}

#[derive(Deserialize, Debug)]
struct AwsIpv6Prefix {
    ipv6_prefix: String,
    region: String,
    service: String,
}

// cloud.json
#[derive(Deserialize, Debug)]
struct GcpDocument {
    prefixes: Vec<GcpPrefix>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GcpPrefix {
    ipv4_prefix: Option<String>,
    ipv6_prefix: Option<String>,
    #[serde(default)]
    service: String,
    scope: Option<String>,
}

// ServiceTags_Public.json
#[derive(Deserialize, Debug)]
struct AzureDocument {
    values: Vec<AzureServiceTag>,
}

#[derive(Deserialize, Debug)]
struct AzureServiceTag {
    name: String,
    properties: AzureProperties,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct AzureProperties {
    #[serde(default)]
    region: String,
    #[serde(default)]
    system_service: String,
    #[serde(default)]
    address_prefixes: Vec<String>,
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Decode the whole document, reporting the JSON path of any schema mismatch.
fn decode_document<T: DeserializeOwned, R: Read>(name: &str, reader: R) -> Result<T, FeedError> {
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| FeedError::Json {
        name: name.to_string(),
        path: e.path().to_string(),
        details: e.inner().to_string(),
    })
}

/// Decode a provider document into entries, in document order.
pub fn decode_cloud_entries<R: Read>(
    provider: CloudProvider,
    name: &str,
    reader: R,
) -> Result<Vec<CloudEntry>, FeedError> {
    let entries = match provider {
        CloudProvider::Aws => {
            let doc: AwsDocument = decode_document(name, reader)?;
            let v4 = doc.prefixes.into_iter().map(|p| CloudEntry {
                cidr: p.ip_prefix,
                service: p.service,
                region: non_empty(p.region),
            });
            let v6 = doc.ipv6_prefixes.into_iter().map(|p| CloudEntry {
                cidr: p.ipv6_prefix,
                service: p.service,
                region: non_empty(p.region),
            });
            v4.chain(v6).collect()
        }
        CloudProvider::Gcp => {
            let doc: GcpDocument = decode_document(name, reader)?;
            doc.prefixes
                .into_iter()
                .filter_map(|p| {
                    let cidr = p.ipv4_prefix.or(p.ipv6_prefix)?;
                    Some(CloudEntry {
                        cidr,
                        service: p.service,
                        region: p.scope.and_then(non_empty),
                    })
                })
                .collect()
        }
        CloudProvider::Azure => {
            let doc: AzureDocument = decode_document(name, reader)?;
            doc.values
                .into_iter()
                .flat_map(|tag| {
                    let service = if tag.properties.system_service.is_empty() {
                        tag.name
                    } else {
                        tag.properties.system_service
                    };
                    let region = non_empty(tag.properties.region);
                    tag.properties
                        .address_prefixes
                        .into_iter()
                        .map(move |cidr| CloudEntry {
                            cidr,
                            service: service.clone(),
                            region: region.clone(),
                        })
                })
                .collect()
        }
    };
    Ok(entries)
}

/// Cloud-provider source over a JSON document.
pub struct CloudFeed<R: Read> {
    name: String,
    provider: CloudProvider,
    reader: R,
}

impl<R: Read> CloudFeed<R> {
    pub fn new(provider: CloudProvider, name: &str, reader: R) -> Self {
        CloudFeed {
            name: name.to_string(),
            provider,
            reader,
        }
    }
}

impl<R: Read> RecordSource for CloudFeed<R> {
    fn drain(self, sink: &mut dyn RecordSink, cancel: &CancelToken) -> Result<FeedStats, FeedError> {
        log::info!("#Start {} feed {}", self.provider.name(), self.name);
        let entries = decode_cloud_entries(self.provider, &self.name, self.reader)?;
        let mut stats = FeedStats::default();

        for entry in entries {
            if cancel.is_cancelled() {
                return Err(FeedError::Cancelled);
            }
            stats.rows += 1;
            let prefix = match entry.cidr.parse::<CidrPrefix>() {
                Ok(prefix) => prefix,
                Err(e) => {
                    log::warn!("{}: skipping entry: {e}", self.name);
                    stats.dropped += 1;
                    continue;
                }
            };
            sink.accept(normalize_cloud(prefix, entry, self.provider.name()))?;
            stats.records += 1;
        }

        Ok(stats)
    }
}
