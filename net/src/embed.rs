// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! IPv4-embedded IPv6 addressing.
//!
//! NAT64 represents every IPv4 peer as an IPv6 address built from a /96
//! translation prefix with the IPv4 address in the low 32 bits, either the
//! well-known prefix `64:ff9b::/96` or a pool-specific one.

use std::net::{Ipv4Addr, Ipv6Addr};

/// A /96 translation prefix used to embed IPv4 addresses in IPv6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nat64Prefix {
    bits: u128,
}

/// Errors raised when constructing a [`Nat64Prefix`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PrefixError {
    /// The given address has non-zero bits in the embedded-address suffix.
    #[error("prefix {0} has non-zero bits below /96")]
    SuffixBitsSet(Ipv6Addr),
}

impl Nat64Prefix {
    /// The well-known NAT64 prefix `64:ff9b::/96`.
    pub const WELL_KNOWN: Nat64Prefix = Nat64Prefix {
        bits: 0x0064_ff9b_0000_0000_0000_0000_0000_0000,
    };

    /// Create a prefix from the address covering its upper 96 bits.
    ///
    /// # Errors
    ///
    /// Returns [`PrefixError::SuffixBitsSet`] if any of the low 32 bits of
    /// `prefix` are set.
    pub fn new(prefix: Ipv6Addr) -> Result<Self, PrefixError> {
        let bits = u128::from(prefix);
        if bits & 0xFFFF_FFFF != 0 {
            return Err(PrefixError::SuffixBitsSet(prefix));
        }
        Ok(Self { bits })
    }

    /// Embed an IPv4 address into this prefix.
    #[must_use]
    pub fn embed(&self, addr: Ipv4Addr) -> Ipv6Addr {
        Ipv6Addr::from(self.bits | u128::from(u32::from(addr)))
    }

    /// Extract the embedded IPv4 address, or `None` if `addr` is not covered
    /// by this prefix.
    #[must_use]
    pub fn extract(&self, addr: Ipv6Addr) -> Option<Ipv4Addr> {
        let bits = u128::from(addr);
        if bits & !0xFFFF_FFFF != self.bits {
            return None;
        }
        #[allow(clippy::cast_possible_truncation)] // masked to 32 bits
        Some(Ipv4Addr::from((bits & 0xFFFF_FFFF) as u32))
    }

    /// Whether `addr` falls inside this /96 prefix.
    #[must_use]
    pub fn contains(&self, addr: Ipv6Addr) -> bool {
        u128::from(addr) & !0xFFFF_FFFF == self.bits
    }
}

impl Default for Nat64Prefix {
    fn default() -> Self {
        Self::WELL_KNOWN
    }
}
