// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Aggregated header views used by the translation engine.

use crate::icmp4::Icmp4;
use crate::icmp6::Icmp6;
use crate::ip::NextHeader;
use crate::ipv4::Ipv4;
use crate::ipv6::Ipv6;
use crate::tcp::Tcp;
use crate::udp::Udp;

/// The network-layer header of a packet, one of the two translated families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Net {
    /// IPv4 header
    Ipv4(Ipv4),
    /// IPv6 header
    Ipv6(Ipv6),
}

impl Net {
    /// The next layer protocol (IPv4 "protocol" or IPv6 "next header"),
    /// looking through the IPv6 fragmentation extension when present.
    #[must_use]
    pub fn next_header(&self) -> NextHeader {
        match self {
            Net::Ipv4(ip) => ip.protocol(),
            Net::Ipv6(ip) => ip.next_header(),
        }
    }
}

/// The transport-layer header of a packet, as far as the translator cares:
/// TCP and UDP carry ports, ICMP echo messages carry an identifier that fills
/// the same role in tuple matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// TCP header
    Tcp(Tcp),
    /// UDP header
    Udp(Udp),
    /// ICMPv4 header
    Icmp4(Icmp4),
    /// ICMPv6 header
    Icmp6(Icmp6),
}

impl Transport {
    /// The source-side tuple identifier: TCP/UDP source port, or the echo
    /// identifier for ICMP echo messages. `None` when the message has no
    /// identifier semantics (non-echo ICMP).
    #[must_use]
    pub fn source_id(&self) -> Option<u16> {
        match self {
            Transport::Tcp(tcp) => Some(tcp.source()),
            Transport::Udp(udp) => Some(udp.source()),
            Transport::Icmp4(icmp) => icmp.echo().map(|(id, _)| id),
            Transport::Icmp6(icmp) => icmp.echo().map(|(id, _)| id),
        }
    }

    /// The destination-side tuple identifier: TCP/UDP destination port, or
    /// the echo identifier (echo messages carry a single identifier).
    #[must_use]
    pub fn destination_id(&self) -> Option<u16> {
        match self {
            Transport::Tcp(tcp) => Some(tcp.destination()),
            Transport::Udp(udp) => Some(udp.destination()),
            Transport::Icmp4(icmp) => icmp.echo().map(|(id, _)| id),
            Transport::Icmp6(icmp) => icmp.echo().map(|(id, _)| id),
        }
    }

    /// Length of the transport header in bytes.
    #[must_use]
    pub fn header_len(&self) -> usize {
        match self {
            Transport::Tcp(tcp) => tcp.header_len(),
            Transport::Udp(_) => Udp::LEN,
            Transport::Icmp4(icmp) => icmp.header_len(),
            Transport::Icmp6(icmp) => icmp.header_len(),
        }
    }
}

/// Fragmentation metadata, normalized across families.
///
/// For IPv4 this mirrors the identification/flags/offset header fields; for
/// IPv6 it mirrors the fragmentation extension header. Only first fragments
/// (`offset == 0`) carry a transport header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragInfo {
    /// Fragment identification. IPv4 only has 16 bits; IPv6 has 32.
    pub ident: u32,
    /// Offset of this fragment in units of eight bytes.
    pub offset: u16,
    /// Whether more fragments follow.
    pub more: bool,
}

impl FragInfo {
    /// True for the fragment that carries the transport header.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.offset == 0
    }
}
