// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Internet checksum arithmetic.
//!
//! Full checksum recomputation is done by `etherparse`; this module only
//! carries the incremental form needed when a transport checksum cannot be
//! recomputed from scratch (non-atomic fragments, where the checksum covers
//! payload bytes we do not hold).

use std::net::{Ipv4Addr, Ipv6Addr};

/// Fold a 32-bit accumulator into a 16-bit ones-complement sum.
#[must_use]
pub fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    #[allow(clippy::cast_possible_truncation)] // folded above
    {
        sum as u16
    }
}

/// Incrementally adjust a checksum after some covered 16-bit words changed
/// (RFC 1624 method): `removed` are the words no longer covered, `inserted`
/// the words now covered instead.
#[must_use]
pub fn adjust(
    checksum: u16,
    removed: impl IntoIterator<Item = u16>,
    inserted: impl IntoIterator<Item = u16>,
) -> u16 {
    let mut sum = u32::from(!checksum);
    for word in removed {
        sum += u32::from(!word);
    }
    for word in inserted {
        sum += u32::from(word);
    }
    !fold(sum)
}

/// The 16-bit words of an IPv4 address, as covered by pseudo-headers.
#[must_use]
pub fn addr_words_v4(addr: Ipv4Addr) -> [u16; 2] {
    let octets = addr.octets();
    [
        u16::from_be_bytes([octets[0], octets[1]]),
        u16::from_be_bytes([octets[2], octets[3]]),
    ]
}

/// The 16-bit words of an IPv6 address, as covered by pseudo-headers.
#[must_use]
pub fn addr_words_v6(addr: Ipv6Addr) -> [u16; 8] {
    addr.segments()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn adjust_matches_recompute_for_word_swap() {
        // checksum over [0x1234, 0xabcd]
        let initial = !fold(0x1234 + 0xabcd);
        // replace 0xabcd with 0x00ff
        let adjusted = adjust(initial, [0xabcd], [0x00ff]);
        assert_eq!(adjusted, !fold(0x1234 + 0x00ff));
    }

    #[test]
    fn addr_words() {
        assert_eq!(
            addr_words_v4(Ipv4Addr::new(192, 0, 2, 1)),
            [0xc000, 0x0201]
        );
    }
}
