//! IPv4/IPv6 addresses as tagged fixed-width integers.
//!
//! Feeds encode addresses either as base-10 integers or as literal text; both
//! end up as an [`Address`] so the prefix arithmetic can switch on the family.

use crate::error::AddressError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Maximum length for an IPv4 prefix (32 bits).
pub const V4_MAX_LENGTH: u8 = 32;
/// Maximum length for an IPv6 prefix (128 bits).
pub const V6_MAX_LENGTH: u8 = 128;

/// Upper 96 bits of an IPv4-mapped IPv6 address (`::ffff:0:0/96`).
const V4_MAPPED_PREFIX: u128 = 0xffff;

/// Address family.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Hash)]
pub enum Family {
    V4,
    V6,
}

impl Family {
    /// Bit width of the family's address space.
    pub fn width(self) -> u8 {
        match self {
            Family::V4 => V4_MAX_LENGTH,
            Family::V6 => V6_MAX_LENGTH,
        }
    }
}

/// An address of either family.
///
/// Ordering is only meaningful between addresses of the same family.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash)]
pub enum Address {
    V4(u32),
    V6(u128),
}

/// Network mask for `len` leading bits of a 32-bit address.
///
/// # Examples
/// ```
/// use cidr_feeds::models::get_cidr_mask_v4;
/// assert_eq!(get_cidr_mask_v4(24), 0xFFFFFF00);
/// ```
pub fn get_cidr_mask_v4(len: u8) -> u32 {
    let right_len = u32::from(V4_MAX_LENGTH.saturating_sub(len));
    u32::MAX.checked_shl(right_len).unwrap_or(0)
}

/// Network mask for `len` leading bits of a 128-bit address.
pub fn get_cidr_mask_v6(len: u8) -> u128 {
    let right_len = u32::from(V6_MAX_LENGTH.saturating_sub(len));
    u128::MAX.checked_shl(right_len).unwrap_or(0)
}

impl Address {
    pub fn family(&self) -> Family {
        match self {
            Address::V4(_) => Family::V4,
            Address::V6(_) => Family::V6,
        }
    }

    /// Clear every bit beyond the first `len` bits.
    pub fn mask(&self, len: u8) -> Address {
        match *self {
            Address::V4(v) => Address::V4(v & get_cidr_mask_v4(len)),
            Address::V6(v) => Address::V6(v & get_cidr_mask_v6(len)),
        }
    }

    /// Set every bit beyond the first `len` bits.
    pub fn with_host_bits(&self, len: u8) -> Address {
        match *self {
            Address::V4(v) => Address::V4(v | !get_cidr_mask_v4(len)),
            Address::V6(v) => Address::V6(v | !get_cidr_mask_v6(len)),
        }
    }

    /// True when the address is a valid network address for a `/len` block.
    pub fn is_aligned(&self, len: u8) -> bool {
        self.mask(len) == *self
    }

    /// The next address, or `None` at the top of the address space.
    pub fn successor(&self) -> Option<Address> {
        match *self {
            Address::V4(v) => v.checked_add(1).map(Address::V4),
            Address::V6(v) => v.checked_add(1).map(Address::V6),
        }
    }

    /// Build an address from a 128-bit magnitude, picking the narrowest family.
    fn from_magnitude(value: u128) -> Address {
        if let Ok(v4) = u32::try_from(value) {
            Address::V4(v4)
        } else if value >> 32 == V4_MAPPED_PREFIX {
            Address::V4(value as u32)
        } else {
            Address::V6(value)
        }
    }
}

/// Parse a base-10 address number as used by the geolocation feed.
///
/// Values up to `2^32 - 1` are V4, anything wider up to 128 bits is V6, except
/// IPv4-mapped values (`::ffff:a.b.c.d`) which fold back to V4.
pub fn parse_decimal_address(raw: &str) -> Result<Address, AddressError> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AddressError::InvalidAddress(raw.to_string()));
    }
    // u128 parsing fails on overflow, which covers "wider than 128 bits".
    let value: u128 = digits
        .parse()
        .map_err(|_| AddressError::InvalidAddress(raw.to_string()))?;
    Ok(Address::from_magnitude(value))
}

/// Parse dotted (`10.0.0.1`) or colon (`2001:db8::1`) address text.
pub fn parse_literal_address(raw: &str) -> Result<Address, AddressError> {
    let ip: IpAddr = raw
        .trim()
        .parse()
        .map_err(|_| AddressError::InvalidAddress(raw.to_string()))?;
    Ok(Address::from(ip))
}

/// Parse an address in either literal or decimal form.
pub fn parse_feed_address(raw: &str) -> Result<Address, AddressError> {
    parse_literal_address(raw).or_else(|_| parse_decimal_address(raw))
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(v4) => Address::V4(u32::from(v4)),
            IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
                Some(v4) => Address::V4(u32::from(v4)),
                None => Address::V6(u128::from(v6)),
            },
        }
    }
}

impl From<Address> for IpAddr {
    fn from(addr: Address) -> Self {
        match addr {
            Address::V4(v) => IpAddr::V4(Ipv4Addr::from(v)),
            Address::V6(v) => IpAddr::V6(Ipv6Addr::from(v)),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", IpAddr::from(*self))
    }
}
