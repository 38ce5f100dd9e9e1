//! Domain models for the feed pipeline.
//!
//! This module contains the core data structures used throughout the crate:
//! - [`Address`] and [`Family`] - tagged 32/128-bit addresses
//! - [`AddressRange`] and [`CidrPrefix`] - inclusive ranges and canonical prefixes
//! - [`Record`] - normalized output records

mod address;
mod prefix;
mod record;

// Re-export public types
pub use address::{
    get_cidr_mask_v4, get_cidr_mask_v6, parse_decimal_address, parse_feed_address,
    parse_literal_address, Address, Family, V4_MAX_LENGTH, V6_MAX_LENGTH,
};
pub use prefix::{prefix_to_range, AddressRange, CidrPrefix};
pub use record::{GeoRecord, NetworkRecord, Record, RecordIndex};
