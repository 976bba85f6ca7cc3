//! IPv4 address matching lens
//!
//! Helpers for turning dotted-quad network masks into prefix lengths and for
//! testing whether an address falls inside a CIDR-style range.
//!
//! # Example
//!
//! ```rust
//! use iptally::lens::address::{is_in_range, parse_octets, prefix_length_from_mask};
//!
//! let prefix = prefix_length_from_mask("255.255.255.0");
//! assert_eq!(prefix, Some(24));
//!
//! let base = parse_octets("10.0.0.0").unwrap();
//! assert!(is_in_range(parse_octets("10.0.0.5").unwrap(), base, prefix));
//! assert!(!is_in_range(parse_octets("10.0.1.5").unwrap(), base, prefix));
//! ```

use crate::error::{IptallyError, Result};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Longest valid IPv4 prefix
pub const MAX_PREFIX_LENGTH: u8 = 32;

/// Parse a dotted-quad address made of exactly four decimal octets.
///
/// Each part must parse as an integer in `0..=255`. Out-of-range octets are
/// a hard failure, never clamped.
pub fn parse_octets(text: &str) -> Result<Ipv4Addr> {
    let parts: Vec<&str> = text.split('.').collect();
    if parts.len() != 4 {
        return Err(IptallyError::AddressParse(text.to_string()));
    }

    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(parts) {
        *slot = part
            .parse::<u8>()
            .map_err(|_| IptallyError::AddressParse(text.to_string()))?;
    }

    Ok(Ipv4Addr::from(octets))
}

/// Convert a dotted-quad mask into a prefix length by summing the set bits
/// of its four octets.
///
/// Contiguity is not checked: `0.255.0.0` yields `Some(8)`. Returns `None`
/// when the text is not four dot-separated integers in `0..=255`.
pub fn prefix_length_from_mask(mask: &str) -> Option<u8> {
    let parts: Vec<&str> = mask.split('.').collect();
    if parts.len() != 4 {
        return None;
    }

    let mut total = 0u32;
    for part in parts {
        let octet = part.parse::<i64>().ok()?;
        if !(0..=255).contains(&octet) {
            return None;
        }
        total += (octet as u8).count_ones();
    }

    u8::try_from(total).ok()
}

/// Like [`prefix_length_from_mask`], but also rejects masks whose set bits
/// are not a single leading run (e.g. `0.255.0.0` or `255.0.255.0`).
pub fn prefix_length_from_mask_strict(mask: &str) -> Option<u8> {
    let bits = u32::from(parse_octets(mask).ok()?);
    if bits.leading_ones() + bits.trailing_zeros() != u32::from(MAX_PREFIX_LENGTH) {
        return None;
    }
    u8::try_from(bits.leading_ones()).ok()
}

/// Test whether `candidate` shares the first `prefix_length` bits with `base`.
///
/// Returns false when `prefix_length` is absent or larger than 32.
pub fn is_in_range(candidate: Ipv4Addr, base: Ipv4Addr, prefix_length: Option<u8>) -> bool {
    match prefix_length {
        Some(len) => AddressRange::new(base, len)
            .map(|range| range.contains(candidate))
            .unwrap_or(false),
        None => false,
    }
}

/// Textual variant of [`is_in_range`]; either address failing to parse is
/// an error rather than a non-match.
pub fn is_in_range_str(candidate: &str, base: &str, prefix_length: Option<u8>) -> Result<bool> {
    let candidate = parse_octets(candidate)?;
    let base = parse_octets(base)?;
    Ok(is_in_range(candidate, base, prefix_length))
}

/// A base address together with the number of leading bits that must match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    pub base: Ipv4Addr,
    pub prefix_length: u8,
}

impl AddressRange {
    /// Build a range, failing when `prefix_length` exceeds 32
    pub fn new(base: Ipv4Addr, prefix_length: u8) -> Result<Self> {
        Ipv4Net::new(base, prefix_length).map_err(|_| {
            IptallyError::Argument(format!(
                "prefix length {} is out of range 0..={}",
                prefix_length, MAX_PREFIX_LENGTH
            ))
        })?;
        Ok(Self {
            base,
            prefix_length,
        })
    }

    pub fn contains(&self, candidate: Ipv4Addr) -> bool {
        Ipv4Net::new(self.base, self.prefix_length)
            .map(|net| net.contains(&candidate))
            .unwrap_or(false)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ipv4Addr {
        parse_octets(s).unwrap()
    }

    #[test]
    fn test_parse_octets() {
        assert_eq!(ip("10.0.0.1"), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(ip("010.000.000.001"), Ipv4Addr::new(10, 0, 0, 1));

        assert!(parse_octets("10.0.0").is_err());
        assert!(parse_octets("10.0.0.1.2").is_err());
        assert!(parse_octets("10.0.0.256").is_err());
        assert!(parse_octets("10.0.0.-1").is_err());
        assert!(parse_octets("10.0.x.1").is_err());
        assert!(parse_octets("").is_err());
    }

    #[test]
    fn test_prefix_length_from_mask() {
        assert_eq!(prefix_length_from_mask("255.255.255.255"), Some(32));
        assert_eq!(prefix_length_from_mask("255.255.255.0"), Some(24));
        assert_eq!(prefix_length_from_mask("255.255.0.0"), Some(16));
        assert_eq!(prefix_length_from_mask("255.255.240.0"), Some(20));
        assert_eq!(prefix_length_from_mask("0.0.0.0"), Some(0));
    }

    #[test]
    fn test_prefix_length_from_mask_non_contiguous() {
        // popcount is summed, not validated
        assert_eq!(prefix_length_from_mask("0.255.0.0"), Some(8));
        assert_eq!(prefix_length_from_mask("255.0.255.0"), Some(16));
        assert_eq!(prefix_length_from_mask("1.1.1.1"), Some(4));
    }

    #[test]
    fn test_prefix_length_from_mask_invalid() {
        assert_eq!(prefix_length_from_mask("255.255.255"), None);
        assert_eq!(prefix_length_from_mask("255.255.255.0.0"), None);
        assert_eq!(prefix_length_from_mask("255.255.256.0"), None);
        assert_eq!(prefix_length_from_mask("255.255.-1.0"), None);
        assert_eq!(prefix_length_from_mask("255.abc.0.0"), None);
        assert_eq!(prefix_length_from_mask("24"), None);
        assert_eq!(prefix_length_from_mask(""), None);
    }

    #[test]
    fn test_prefix_length_from_mask_strict() {
        assert_eq!(prefix_length_from_mask_strict("255.255.255.0"), Some(24));
        assert_eq!(prefix_length_from_mask_strict("255.255.255.255"), Some(32));
        assert_eq!(prefix_length_from_mask_strict("0.0.0.0"), Some(0));
        assert_eq!(prefix_length_from_mask_strict("255.128.0.0"), Some(9));
        assert_eq!(prefix_length_from_mask_strict("0.255.0.0"), None);
        assert_eq!(prefix_length_from_mask_strict("255.0.255.0"), None);
        assert_eq!(prefix_length_from_mask_strict("255.255.256.0"), None);
    }

    #[test]
    fn test_in_range_examples() {
        let base = ip("10.0.0.0");
        assert!(is_in_range(ip("10.0.0.5"), base, Some(24)));
        assert!(!is_in_range(ip("10.0.1.5"), base, Some(24)));

        // partial byte: /20 covers 10.0.0.0 - 10.0.15.255
        assert!(is_in_range(ip("10.0.15.255"), base, Some(20)));
        assert!(!is_in_range(ip("10.0.16.0"), base, Some(20)));
    }

    #[test]
    fn test_in_range_reflexive() {
        let x = ip("192.168.37.201");
        for p in 0..=MAX_PREFIX_LENGTH {
            assert!(is_in_range(x, x, Some(p)), "failed for /{}", p);
        }
    }

    #[test]
    fn test_in_range_full_prefix_is_equality() {
        let base = ip("172.16.4.9");
        assert!(is_in_range(ip("172.16.4.9"), base, Some(32)));
        assert!(!is_in_range(ip("172.16.4.8"), base, Some(32)));
        assert!(!is_in_range(ip("172.16.5.9"), base, Some(32)));
    }

    #[test]
    fn test_in_range_zero_prefix_matches_all() {
        let base = ip("10.0.0.0");
        assert!(is_in_range(ip("255.255.255.255"), base, Some(0)));
        assert!(is_in_range(ip("0.0.0.0"), base, Some(0)));
        assert!(is_in_range(ip("192.168.1.1"), base, Some(0)));
    }

    #[test]
    fn test_in_range_missing_or_invalid_prefix() {
        let base = ip("10.0.0.0");
        assert!(!is_in_range(base, base, None));
        assert!(!is_in_range(base, base, Some(33)));
        assert!(!is_in_range(base, base, Some(255)));
    }

    #[test]
    fn test_in_range_str() {
        assert!(is_in_range_str("10.0.0.5", "10.0.0.0", Some(24)).unwrap());
        assert!(!is_in_range_str("10.0.1.5", "10.0.0.0", Some(24)).unwrap());
        assert!(is_in_range_str("10.0.0.300", "10.0.0.0", Some(24)).is_err());
        assert!(is_in_range_str("10.0.0.5", "10.0.0", Some(24)).is_err());
    }

    #[test]
    fn test_address_range() {
        let range = AddressRange::new(ip("192.168.1.77"), 24).unwrap();
        assert_eq!(range.to_string(), "192.168.1.77/24");
        assert!(range.contains(ip("192.168.1.1")));
        assert!(!range.contains(ip("192.168.2.1")));

        assert!(AddressRange::new(ip("192.168.1.77"), 33).is_err());
        assert!(AddressRange::new(ip("10.1.2.3"), 0).unwrap().contains(ip("8.8.8.8")));
    }
}
