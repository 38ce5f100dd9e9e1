//! Range processing logic.
//!
//! - [`decompose`] - range to minimal CIDR list
//! - [`normalize`] - scanner rows to output records

mod decompose;
mod normalize;

// Re-export public functions
pub use decompose::decompose;
pub use normalize::{normalize_asn, normalize_cloud, normalize_geo, UNROUTED_AS_NUMBER};
