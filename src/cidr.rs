//! IPv4 CIDR Allow-List
//!
//! Parses `a.b.c.d/n` (or bare `a.b.c.d`, treated as `/32`) into inclusive
//! integer ranges and tests candidate addresses against their union.
//!
//! Parsing fails open: a malformed entry is dropped and the rest of the list
//! is kept. Matching fails closed: an address that does not parse as IPv4
//! never matches.

use tracing::debug;

/// Inclusive range of IPv4 addresses produced by one CIDR block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrRange {
    pub start: u32,
    pub end: u32,
}

impl AddrRange {
    /// Check whether an already-packed address falls inside this range
    pub fn contains_u32(&self, addr: u32) -> bool {
        self.start <= addr && addr <= self.end
    }
}

/// Pack a dotted-quad into a big-endian u32.
///
/// Returns `None` unless there are exactly four purely numeric octets in 0-255.
pub fn parse_ipv4(addr: &str) -> Option<u32> {
    let parts: Vec<&str> = addr.split('.').collect();
    if parts.len() != 4 {
        return None;
    }

    let mut result = 0u32;
    for part in parts {
        // u8::from_str accepts a leading '+'
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let octet: u8 = part.parse().ok()?;
        result = (result << 8) | u32::from(octet);
    }

    Some(result)
}

/// Parse one allow-list entry into a range
pub fn parse_range(spec: &str) -> Option<AddrRange> {
    let spec = spec.trim();

    let (ip, prefix_len) = match spec.split_once('/') {
        Some((ip, prefix)) => {
            if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let prefix_len: u32 = prefix.parse().ok()?;
            if prefix_len > 32 {
                return None;
            }
            (ip, prefix_len)
        }
        None => (spec, 32),
    };

    let addr = parse_ipv4(ip)?;
    let mask = if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len)
    };

    let start = addr & mask;
    Some(AddrRange {
        start,
        end: start | !mask,
    })
}

/// Build ranges from configured entries, silently skipping invalid ones
pub fn build_ranges<S: AsRef<str>>(specs: &[S]) -> Vec<AddrRange> {
    specs
        .iter()
        .filter_map(|spec| {
            let spec = spec.as_ref();
            let range = parse_range(spec);
            if range.is_none() {
                debug!(entry = spec, "Dropping malformed allow-list entry");
            }
            range
        })
        .collect()
}

/// Check whether `addr` lies inside any of `ranges`
pub fn contains(addr: &str, ranges: &[AddrRange]) -> bool {
    match parse_ipv4(addr.trim()) {
        Some(value) => ranges.iter().any(|r| r.contains_u32(value)),
        None => false,
    }
}

/// Immutable allow-list built once at startup
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    ranges: Vec<AddrRange>,
}

impl AllowList {
    /// Build from a list of CIDR/address entries
    pub fn from_specs<S: AsRef<str>>(specs: &[S]) -> Self {
        Self {
            ranges: build_ranges(specs),
        }
    }

    pub fn contains(&self, addr: &str) -> bool {
        contains(addr, &self.ranges)
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}
