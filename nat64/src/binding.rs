// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Binding entry types: flow tuples, static sessions and dynamic BIB entries.

use net::embed::Nat64Prefix;
use net::headers::Transport;
use std::fmt::{Display, Formatter};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// The transport protocols the translator can bind. TCP and UDP key on
/// ports; ICMP echo keys on the echo identifier, and the v4 and v6 flavors
/// of an echo flow share one binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Proto {
    /// TCP, keyed by port.
    Tcp,
    /// UDP, keyed by port.
    Udp,
    /// ICMP echo (v4 or v6), keyed by the echo identifier.
    Icmp,
}

impl Proto {
    /// The binding protocol of a parsed transport header.
    #[must_use]
    pub fn of_transport(transport: &Transport) -> Proto {
        match transport {
            Transport::Tcp(_) => Proto::Tcp,
            Transport::Udp(_) => Proto::Udp,
            Transport::Icmp4(_) | Transport::Icmp6(_) => Proto::Icmp,
        }
    }
}

impl Display for Proto {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Proto::Tcp => write!(f, "tcp"),
            Proto::Udp => write!(f, "udp"),
            Proto::Icmp => write!(f, "icmp"),
        }
    }
}

/// The IPv6-side flow key: source address plus port (or echo identifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InsideTuple {
    /// IPv6 address of the translated host.
    pub addr: Ipv6Addr,
    /// Source port, or echo identifier for ICMP.
    pub id: u16,
    /// Binding protocol.
    pub proto: Proto,
}

impl Display for InsideTuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]:{}/{}", self.addr, self.id, self.proto)
    }
}

/// An IPv4-side (address, port) pair: either the NAT-assigned pair visible
/// to v4 peers, or a v4 peer endpoint itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutsideTuple {
    /// IPv4 address.
    pub addr: Ipv4Addr,
    /// Port, or echo identifier for ICMP.
    pub id: u16,
    /// Binding protocol.
    pub proto: Proto,
}

impl Display for OutsideTuple {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.addr, self.id, self.proto)
    }
}

/// A static, administrator-configured mapping. Never created by traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    /// The inside (IPv6) endpoint being mapped.
    pub inside: InsideTuple,
    /// The IPv4 peer this session pairs the inside endpoint with.
    pub peer: OutsideTuple,
    /// The NAT-assigned outside pair v4 peers see.
    pub nat: OutsideTuple,
    /// The IPv6 form the v4 peer is presented as on the inside (the peer
    /// address embedded in the translation prefix).
    pub nat_v6: Ipv6Addr,
    /// Remaining lifetime. Zero means expired.
    pub lifetime: Duration,
}

impl Session {
    /// Assemble a session entry, deriving the peer's inside-facing IPv6 form
    /// from the translation prefix.
    #[must_use]
    pub fn new(
        inside: InsideTuple,
        peer: OutsideTuple,
        nat: OutsideTuple,
        prefix: &Nat64Prefix,
        lifetime: Duration,
    ) -> Self {
        Self {
            inside,
            peer,
            nat,
            nat_v6: prefix.embed(peer.addr),
            lifetime,
        }
    }
}

/// A dynamic Binding Information Base entry, created on the first outbound
/// packet of an unbound flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BibEntry {
    /// The inside (IPv6) endpoint.
    pub inside: InsideTuple,
    /// The NAT-assigned outside pair.
    pub nat: OutsideTuple,
    /// Remaining lifetime, refreshed by traffic in either direction.
    pub lifetime: Duration,
}

impl BibEntry {
    /// Assemble a BIB entry.
    #[must_use]
    pub fn new(inside: InsideTuple, nat: OutsideTuple, lifetime: Duration) -> Self {
        Self {
            inside,
            nat,
            lifetime,
        }
    }
}
