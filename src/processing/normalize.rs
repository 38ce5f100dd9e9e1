//! Mapping of scanner rows onto normalized [`Record`]s.
//!
//! Range rows are decomposed into prefixes and produce one record per prefix;
//! cloud entries already carry a CIDR and map one-to-one.

use super::decompose;
use crate::feeds::{AsnRow, CloudEntry, GeoRow};
use crate::models::{CidrPrefix, GeoRecord, NetworkRecord, Record, RecordIndex};

/// AS number used by the ASN feed for unrouted address space.
pub const UNROUTED_AS_NUMBER: &str = "0";

/// Records for one geolocation row, lazily, one per decomposed prefix.
pub fn normalize_geo(row: GeoRow) -> impl Iterator<Item = Record> {
    decompose(row.range).into_iter().map(move |prefix| {
        let id = prefix.to_string();
        log::trace!("geo {id} {}", row.country);
        Record::Geo(GeoRecord {
            index: RecordIndex::new(&id),
            id,
            country: row.country.clone(),
            region: row.region.clone(),
            city: row.city.clone(),
            postal_code: row.postal_code.clone(),
            timezone: row.timezone.clone(),
        })
    })
}

/// Records for one ASN row; unrouted rows produce nothing.
pub fn normalize_asn(row: AsnRow) -> impl Iterator<Item = Record> {
    let prefixes: Vec<CidrPrefix> = if row.as_number == UNROUTED_AS_NUMBER {
        log::debug!("asn: dropping unrouted range {}", row.range);
        Vec::new()
    } else {
        decompose(row.range)
    };

    prefixes.into_iter().map(move |prefix| {
        let id = prefix.to_string();
        log::trace!("asn {id} AS{}", row.as_number);
        Record::Network(NetworkRecord {
            index: RecordIndex::new(&id),
            id,
            as_number: row.as_number.clone(),
            country_code: row.country_code.clone(),
            as_name: row.as_description.clone(),
            service: String::new(),
            region: None,
        })
    })
}

/// Record for one cloud-provider entry, keyed by the parsed prefix's canonical text.
pub fn normalize_cloud(prefix: CidrPrefix, entry: CloudEntry, provider: &str) -> Record {
    let cidr = prefix.to_string();
    Record::Network(NetworkRecord {
        index: RecordIndex::new(&cidr),
        id: cidr,
        as_number: String::new(),
        country_code: String::new(),
        as_name: provider.to_string(),
        service: entry.service,
        region: entry.region,
    })
}
