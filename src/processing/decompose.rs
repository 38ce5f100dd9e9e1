//! Range to CIDR decomposition.
//!
//! Splits an inclusive address range into the minimal ordered list of aligned
//! prefixes that exactly cover it.

use crate::models::{Address, AddressRange, CidrPrefix};

/// Decompose `range` into prefixes in ascending address order.
///
/// Reversed or mixed-family ranges yield an empty list; a malformed feed row
/// cannot be fixed by the caller, so this is not an error.
///
/// # Examples
/// ```
/// use cidr_feeds::models::{parse_literal_address, AddressRange};
/// use cidr_feeds::processing::decompose;
///
/// let range = AddressRange::new(
///     parse_literal_address("192.168.0.96").unwrap(),
///     parse_literal_address("192.168.0.255").unwrap(),
/// );
/// let blocks: Vec<String> = decompose(range).iter().map(|p| p.to_string()).collect();
/// assert_eq!(blocks, ["192.168.0.96/27", "192.168.0.128/25"]);
/// ```
pub fn decompose(range: AddressRange) -> Vec<CidrPrefix> {
    let mut prefixes = Vec::new();
    if !range.is_valid() {
        log::debug!("decompose: skipping invalid range {range}");
        return prefixes;
    }

    let end = range.end;
    let mut start = range.start;
    loop {
        let length = find_biggest_block(start, end);
        let block_end = start.with_host_bits(length);
        match CidrPrefix::new(start, length) {
            Ok(prefix) => prefixes.push(prefix),
            // length never exceeds the family width
            Err(_) => break,
        }

        // Stop on the last block so the top of the address space never overflows.
        if block_end >= end {
            break;
        }
        match block_end.successor() {
            Some(next) => start = next,
            None => break,
        }
    }

    prefixes
}

/// Smallest prefix length whose block starts at `start` and ends at or before `end`.
///
/// Starts from a single address and widens one bit at a time while `start`
/// stays aligned and the block stays inside the range.
fn find_biggest_block(start: Address, end: Address) -> u8 {
    let mut length = start.family().width();

    while length > 0 {
        let wider = length - 1;
        if !start.is_aligned(wider) || start.with_host_bits(wider) > end {
            break;
        }
        length = wider;
    }

    length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{parse_literal_address, prefix_to_range, Family};

    fn addr(s: &str) -> Address {
        parse_literal_address(s).unwrap()
    }

    fn blocks(start: &str, end: &str) -> Vec<String> {
        decompose(AddressRange::new(addr(start), addr(end)))
            .iter()
            .map(|p| p.to_string())
            .collect()
    }

    /// Blocks are aligned, contiguous and cover exactly `[start, end]`.
    fn assert_exact_cover(range: AddressRange, prefixes: &[CidrPrefix]) {
        assert!(!prefixes.is_empty());
        assert_eq!(prefixes[0].base(), range.start);
        assert_eq!(prefixes[prefixes.len() - 1].last(), range.end);
        for p in prefixes {
            assert_eq!(p.base(), p.base().mask(p.length()), "{p} not canonical");
        }
        for pair in prefixes.windows(2) {
            let prev = prefix_to_range(pair[0]);
            assert_eq!(
                prev.end.successor(),
                Some(pair[1].base()),
                "{} and {} are not contiguous",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_aligned_block() {
        assert_eq!(blocks("192.168.0.0", "192.168.0.255"), ["192.168.0.0/24"]);
    }

    #[test]
    fn test_unaligned_start() {
        assert_eq!(
            blocks("192.168.0.96", "192.168.0.255"),
            ["192.168.0.96/27", "192.168.0.128/25"]
        );
    }

    #[test]
    fn test_unaligned_both_ends() {
        assert_eq!(
            blocks("10.0.0.1", "10.0.0.6"),
            ["10.0.0.1/32", "10.0.0.2/31", "10.0.0.4/31", "10.0.0.6/32"]
        );
        let range = AddressRange::new(addr("10.6.2.80"), addr("10.6.7.255"));
        assert_exact_cover(range, &decompose(range));
        assert_eq!(
            blocks("10.6.2.80", "10.6.7.255"),
            ["10.6.2.80/28", "10.6.2.96/27", "10.6.2.128/25", "10.6.3.0/24", "10.6.4.0/22"]
        );
    }

    #[test]
    fn test_singleton() {
        assert_eq!(blocks("10.1.2.3", "10.1.2.3"), ["10.1.2.3/32"]);
        let v6 = decompose(AddressRange::new(addr("2001:db8::1"), addr("2001:db8::1")));
        assert_eq!(v6.len(), 1);
        assert_eq!(v6[0].length(), 128);
        assert_eq!(v6[0].base(), addr("2001:db8::1"));
    }

    #[test]
    fn test_whole_address_space() {
        assert_eq!(blocks("0.0.0.0", "255.255.255.255"), ["0.0.0.0/0"]);
        let all = decompose(AddressRange::new(Address::V6(0), Address::V6(u128::MAX)));
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].to_string(), "::/0");
    }

    #[test]
    fn test_range_ending_at_top() {
        assert_eq!(
            blocks("255.255.255.254", "255.255.255.255"),
            ["255.255.255.254/31"]
        );
        assert_eq!(blocks("255.255.255.255", "255.255.255.255"), ["255.255.255.255/32"]);
        assert_eq!(
            blocks("255.255.255.253", "255.255.255.255"),
            ["255.255.255.253/32", "255.255.255.254/31"]
        );
        let top = decompose(AddressRange::new(
            Address::V6(u128::MAX - 2),
            Address::V6(u128::MAX),
        ));
        assert_eq!(top.len(), 2);
        assert_eq!(top[1].last(), Address::V6(u128::MAX));
    }

    #[test]
    fn test_v6_across_word_boundary() {
        let range = AddressRange::new(
            Address::V6((1u128 << 64) - 3),
            Address::V6((1u128 << 64) + 4),
        );
        let prefixes = decompose(range);
        assert_exact_cover(range, &prefixes);
        assert!(prefixes.iter().all(|p| p.base().family() == Family::V6));
        assert_eq!(
            prefixes.iter().map(|p| p.length()).collect::<Vec<_>>(),
            [128, 127, 126, 128]
        );
    }

    #[test]
    fn test_degenerate_ranges_are_empty() {
        assert!(decompose(AddressRange::new(addr("10.0.0.9"), addr("10.0.0.1"))).is_empty());
        assert!(decompose(AddressRange::new(addr("10.0.0.1"), addr("2001:db8::"))).is_empty());
    }

    #[test]
    fn test_exact_cover_sweep() {
        let starts = [0u32, 1, 7, 96, 255, 256, 1000, 0x0A00_0001];
        let spans = [0u32, 1, 2, 5, 31, 200, 4095, 70_000];
        for &s in &starts {
            for &span in &spans {
                let range = AddressRange::new(Address::V4(s), Address::V4(s + span));
                let prefixes = decompose(range);
                assert_exact_cover(range, &prefixes);
                // never more than two blocks per bit
                assert!(prefixes.len() <= 2 * 32, "{range}: {}", prefixes.len());
            }
        }
    }
}
