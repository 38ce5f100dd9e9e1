//! CIDR prefixes and inclusive address ranges.

use super::address::{parse_literal_address, Address};
use crate::error::AddressError;
use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusive `[start, end]` address range.
///
/// Reversed or mixed-family ranges are representable; [`crate::processing::decompose`]
/// turns them into an empty prefix list.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Hash)]
pub struct AddressRange {
    pub start: Address,
    pub end: Address,
}

impl AddressRange {
    pub fn new(start: Address, end: Address) -> AddressRange {
        AddressRange { start, end }
    }

    /// Same family and `start <= end`.
    pub fn is_valid(&self) -> bool {
        self.start.family() == self.end.family() && self.start <= self.end
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Canonical CIDR prefix: `base` never has bits set beyond `length`.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Copy, Clone, Hash)]
pub struct CidrPrefix {
    base: Address,
    length: u8,
}

impl CidrPrefix {
    /// Build a prefix, clearing any host bits of `base`.
    pub fn new(base: Address, length: u8) -> Result<CidrPrefix, AddressError> {
        let width = base.family().width();
        if length > width {
            return Err(AddressError::InvalidPrefixLength { length, width });
        }
        Ok(CidrPrefix {
            base: base.mask(length),
            length,
        })
    }

    /// Network address.
    pub fn base(&self) -> Address {
        self.base
    }

    /// Prefix length in bits.
    pub fn length(&self) -> u8 {
        self.length
    }

    /// Highest address in the block.
    pub fn last(&self) -> Address {
        self.base.with_host_bits(self.length)
    }

    pub fn range(&self) -> AddressRange {
        prefix_to_range(*self)
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr.family() == self.base.family() && addr >= self.base && addr <= self.last()
    }
}

/// First and last address covered by `p`.
pub fn prefix_to_range(p: CidrPrefix) -> AddressRange {
    let start = p.base.mask(p.length);
    AddressRange {
        start,
        end: start.with_host_bits(p.length),
    }
}

impl FromStr for CidrPrefix {
    type Err = AddressError;

    /// Parse `addr/len` text. Host bits in `addr` are cleared.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| AddressError::InvalidCidr(s.to_string()))?;
        let addr = parse_literal_address(addr).map_err(|_| AddressError::InvalidCidr(s.to_string()))?;
        let len: u8 = len
            .parse()
            .map_err(|_| AddressError::InvalidCidr(s.to_string()))?;
        CidrPrefix::new(addr, len)
    }
}

impl fmt::Display for CidrPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.length)
    }
}

impl Serialize for CidrPrefix {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CidrPrefix {
    fn deserialize<D>(deserializer: D) -> Result<CidrPrefix, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CidrPrefix::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Family;

    fn prefix(s: &str) -> CidrPrefix {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_canonicalizes_base() {
        let p = CidrPrefix::new(Address::V4(0xC0A8_012A), 24).unwrap();
        assert_eq!(p.to_string(), "192.168.1.0/24");
        assert_eq!(prefix("10.2.3.4/16").to_string(), "10.2.0.0/16");
        assert_eq!(
            CidrPrefix::new(Address::V4(1), 33).unwrap_err(),
            AddressError::InvalidPrefixLength {
                length: 33,
                width: 32
            }
        );
        assert!(CidrPrefix::new(Address::V6(1), 128).is_ok());
        assert!(CidrPrefix::new(Address::V6(1), 129).is_err());
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("10.0.0.0".parse::<CidrPrefix>().is_err());
        assert!("10.0.0.0/x".parse::<CidrPrefix>().is_err());
        assert!("10.0.0/8".parse::<CidrPrefix>().is_err());
        assert!("10.0.0.0/33".parse::<CidrPrefix>().is_err());
        assert_eq!(prefix(" 2600:1f14::/35 ").base().family(), Family::V6);
    }

    #[test]
    fn test_prefix_to_range_v4() {
        let r = prefix_to_range(prefix("192.168.1.0/24"));
        assert_eq!(r.start.to_string(), "192.168.1.0");
        assert_eq!(r.end.to_string(), "192.168.1.255");

        let r = prefix("0.0.0.0/0").range();
        assert_eq!(r.start, Address::V4(0));
        assert_eq!(r.end, Address::V4(u32::MAX));

        let r = prefix("10.0.0.7/32").range();
        assert_eq!(r.start, r.end);
    }

    #[test]
    fn test_prefix_to_range_v6_word_boundary() {
        // 80 host bits: the high word takes 16 set bits, the low word is saturated
        let r = prefix("2001:db8::/48").range();
        assert_eq!(r.end.to_string(), "2001:db8:0:ffff:ffff:ffff:ffff:ffff");

        // exactly 64 host bits
        let r = prefix("2001:db8:1:2::/64").range();
        assert_eq!(r.end.to_string(), "2001:db8:1:2:ffff:ffff:ffff:ffff");

        // fewer than 64 host bits only touch the low word
        let r = prefix("2001:db8:1:2:3::/80").range();
        assert_eq!(r.end.to_string(), "2001:db8:1:2:3:ffff:ffff:ffff");

        let r = prefix("::/0").range();
        assert_eq!(r.end, Address::V6(u128::MAX));
    }

    #[test]
    fn test_contains_and_order() {
        let p = prefix("10.0.10.0/24");
        assert!(p.contains("10.0.10.200".parse::<std::net::IpAddr>().unwrap().into()));
        assert!(!p.contains(Address::V4(0x0A00_0B00)));
        assert!(!p.contains(Address::V6(0x0A00_0A01)));
        assert!(prefix("10.0.0.0/8") < prefix("10.0.10.0/24"));
    }

    #[test]
    fn test_serde_as_string() {
        let p = prefix("10.1.1.16/28");
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"10.1.1.16/28\"");
        let back: CidrPrefix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
        assert!(serde_json::from_str::<CidrPrefix>("\"10.1.1.16\"").is_err());
    }

    #[test]
    fn test_range_validity() {
        assert!(AddressRange::new(Address::V4(1), Address::V4(1)).is_valid());
        assert!(!AddressRange::new(Address::V4(2), Address::V4(1)).is_valid());
        assert!(!AddressRange::new(Address::V4(1), Address::V6(2)).is_valid());
    }
}
