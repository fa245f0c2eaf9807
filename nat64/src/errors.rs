// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Error types, split by scope: per-packet conditions the dispatcher recovers
//! into a drop, and setup-time misconfiguration reported to the caller.

use net::ip::NextHeader;

/// Per-packet translation failures.
///
/// None of these are fatal: the dispatcher logs them and drops the packet,
/// leaving the binding table untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Nat64Error {
    /// Every port in the configured pool is claimed by an active binding.
    #[error("address pool exhausted")]
    AddressPoolExhausted,
    /// The protocol has neither ports nor an identifier to key a binding on.
    #[error("unsupported protocol {0}")]
    UnsupportedProtocol(NextHeader),
    /// The packet's headers are inconsistent with the translation the engine
    /// was asked to perform.
    #[error("malformed header")]
    MalformedHeader,
    /// An inbound packet matched no existing binding. Bindings are never
    /// created on the return path.
    #[error("no binding for packet")]
    BindingNotFound,
}

/// Setup-time configuration errors. Never raised per packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The port pool bounds are unusable (reversed range or port zero).
    #[error("invalid port range {start}..={end}")]
    InvalidPortRange {
        /// First port of the rejected range.
        start: u16,
        /// Last port of the rejected range.
        end: u16,
    },
    /// No port pool has been configured.
    #[error("port pool is not configured")]
    EmptyPortPool,
    /// The inside (IPv6-facing) interface has not been set.
    #[error("inside interface is not set")]
    InsideNotSet,
    /// The outside (IPv4-facing) interface has not been set.
    #[error("outside interface is not set")]
    OutsideNotSet,
    /// No IPv4 address pool has been configured.
    #[error("no IPv4 address pool configured")]
    NoAddressPool,
    /// The address pool mask length does not fit an IPv4 prefix.
    #[error("invalid pool mask /{0}")]
    BadPoolMask(u8),
}
