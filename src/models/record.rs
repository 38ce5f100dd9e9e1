//! Normalized output records.

use serde::{Deserialize, Serialize};

/// Index object repeating the record's CIDR.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecordIndex {
    pub cidr: String,
}

/// Geolocation metadata for one CIDR block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GeoRecord {
    /// Canonical CIDR text, also the index key.
    pub id: String,
    pub index: RecordIndex,
    pub country: String,
    #[serde(rename = "state")]
    pub region: String,
    pub city: String,
    #[serde(rename = "zip")]
    pub postal_code: String,
    pub timezone: String,
}

/// ASN or cloud-provider metadata for one CIDR block.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NetworkRecord {
    /// Canonical CIDR text, also the index key.
    pub id: String,
    pub index: RecordIndex,
    pub as_number: String,
    pub country_code: String,
    pub as_name: String,
    pub service: String,
    /// Provider region, cloud feeds only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

/// One normalized output unit.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Record {
    Geo(GeoRecord),
    Network(NetworkRecord),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Record::Geo(r) => &r.id,
            Record::Network(r) => &r.id,
        }
    }
}

impl RecordIndex {
    pub fn new(cidr: &str) -> RecordIndex {
        RecordIndex {
            cidr: cidr.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_record_json_keys() {
        let record = Record::Geo(GeoRecord {
            id: "1.0.0.0/24".to_string(),
            index: RecordIndex::new("1.0.0.0/24"),
            country: "AU".to_string(),
            region: "Queensland".to_string(),
            city: "Brisbane".to_string(),
            postal_code: "4000".to_string(),
            timezone: "+10:00".to_string(),
        });
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"id":"1.0.0.0/24","index":{"cidr":"1.0.0.0/24"},"country":"AU","state":"Queensland","city":"Brisbane","zip":"4000","timezone":"+10:00"}"#
        );
    }

    #[test]
    fn test_network_record_omits_missing_region() {
        let mut record = NetworkRecord {
            id: "1.0.0.0/24".to_string(),
            index: RecordIndex::new("1.0.0.0/24"),
            as_number: "13335".to_string(),
            country_code: "US".to_string(),
            as_name: "CLOUDFLARENET".to_string(),
            service: String::new(),
            region: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("region"));
        assert!(json.contains(r#""as_number":"13335""#));

        record.region = Some("us-east-1".to_string());
        let json = serde_json::to_string(&Record::Network(record)).unwrap();
        assert!(json.ends_with(r#""region":"us-east-1"}"#));
    }

    #[test]
    fn test_untagged_round_trip_picks_shape() {
        let json = r#"{"id":"10.0.0.0/8","index":{"cidr":"10.0.0.0/8"},"as_number":"1","country_code":"US","as_name":"X","service":""}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert!(matches!(record, Record::Network(_)));
        assert_eq!(record.id(), "10.0.0.0/8");
    }
}
