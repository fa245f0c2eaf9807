// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Pure header translation between the two IP families.
//!
//! Both directions take a parsed packet and an already-resolved binding and
//! produce replacement headers; they never touch the binding table. Length
//! fields and fully recomputable checksums are left to
//! [`net::packet::Packet::fix_lengths`] and
//! [`net::packet::Packet::update_checksums`] after the rewrite; the one case
//! handled here is the first fragment of a fragmented TCP/UDP datagram,
//! whose transport checksum covers payload bytes we do not hold and is
//! therefore adjusted incrementally (RFC 1624) for the pseudo-header and
//! port changes.

use crate::binding::{InsideTuple, OutsideTuple};
use crate::errors::Nat64Error;
use net::checksum::{addr_words_v4, addr_words_v6, adjust};
use net::embed::Nat64Prefix;
use net::headers::{FragInfo, Net, Transport};
use net::icmp4::Icmp4;
use net::icmp6::Icmp6;
use net::ip::NextHeader;
use net::ipv4::Ipv4;
use net::ipv6::Ipv6;
use net::packet::Packet;

/// The replacement headers produced by one translation.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Translated {
    pub net: Net,
    pub transport: Option<Transport>,
    pub frag: Option<FragInfo>,
}

/// Translate an outbound IPv6 packet into its IPv4 form.
///
/// The source becomes the binding's NAT-assigned pair; the destination is
/// the IPv4 address embedded in the packet's destination.
pub(crate) fn v6_to_v4(
    packet: &Packet,
    nat: OutsideTuple,
    prefix: &Nat64Prefix,
) -> Result<Translated, Nat64Error> {
    let Net::Ipv6(ip6) = packet.net() else {
        return Err(Nat64Error::MalformedHeader);
    };
    let dst4 = prefix
        .extract(ip6.destination())
        .ok_or(Nat64Error::MalformedHeader)?;
    let proto = match ip6.next_header() {
        NextHeader::TCP => NextHeader::TCP,
        NextHeader::UDP => NextHeader::UDP,
        NextHeader::ICMP6 => NextHeader::ICMP,
        other => return Err(Nat64Error::UnsupportedProtocol(other)),
    };

    let mut ip4 = Ipv4::default();
    ip4.set_source(nat.addr)
        .set_destination(dst4)
        .set_ttl(ip6.hop_limit())
        .set_tos(ip6.traffic_class())
        .set_protocol(proto);

    let frag = match packet.frag() {
        Some(f) => {
            // the 32-bit IPv6 identification only has 16 bits of room here
            #[allow(clippy::cast_possible_truncation)]
            let ident = f.ident as u16;
            ip4.set_identification(ident).set_more_fragments(f.more);
            ip4.set_fragment_offset(f.offset)
                .map_err(|_| Nat64Error::MalformedHeader)?;
            Some(FragInfo {
                ident: u32::from(ident),
                offset: f.offset,
                more: f.more,
            })
        }
        None => {
            ip4.set_dont_fragment(true);
            None
        }
    };

    let fragmented = frag.is_some();
    let transport = match packet.transport() {
        None => None,
        Some(Transport::Tcp(tcp)) => {
            let mut tcp = tcp.clone();
            if fragmented {
                let checksum = adjust_tcp_udp(
                    tcp.checksum(),
                    PseudoDelta::ToV4 {
                        old_src: ip6.source(),
                        old_dst: ip6.destination(),
                        new_src: nat.addr,
                        new_dst: dst4,
                    },
                    tcp.source(),
                    nat.id,
                );
                tcp.set_checksum(checksum);
            }
            tcp.set_source(nat.id);
            Some(Transport::Tcp(tcp))
        }
        Some(Transport::Udp(udp)) => {
            let mut udp = udp.clone();
            if fragmented {
                let checksum = adjust_tcp_udp(
                    udp.checksum(),
                    PseudoDelta::ToV4 {
                        old_src: ip6.source(),
                        old_dst: ip6.destination(),
                        new_src: nat.addr,
                        new_dst: dst4,
                    },
                    udp.source(),
                    nat.id,
                );
                // zero means "no checksum" on the v4 side
                udp.set_checksum(if checksum == 0 { 0xFFFF } else { checksum });
            }
            udp.set_source(nat.id);
            Some(Transport::Udp(udp))
        }
        Some(Transport::Icmp6(icmp)) => {
            if fragmented {
                // an ICMPv6 checksum covers a pseudo-header over the whole
                // reassembled message, which a translator holding one
                // fragment cannot adjust honestly
                return Err(Nat64Error::UnsupportedProtocol(NextHeader::ICMP6));
            }
            let (_, seq) = icmp
                .echo()
                .ok_or(Nat64Error::UnsupportedProtocol(NextHeader::ICMP6))?;
            let icmp4 = if icmp.is_echo_request() {
                Icmp4::echo_request(nat.id, seq)
            } else {
                Icmp4::echo_reply(nat.id, seq)
            };
            Some(Transport::Icmp4(icmp4))
        }
        Some(Transport::Icmp4(_)) => return Err(Nat64Error::MalformedHeader),
    };

    Ok(Translated {
        net: Net::Ipv4(ip4),
        transport,
        frag,
    })
}

/// Translate an inbound IPv4 packet into its IPv6 form.
///
/// The destination becomes the binding's inside endpoint; the source is
/// embedded into the translation prefix.
pub(crate) fn v4_to_v6(
    packet: &Packet,
    inside: InsideTuple,
    prefix: &Nat64Prefix,
) -> Result<Translated, Nat64Error> {
    let Net::Ipv4(ip4) = packet.net() else {
        return Err(Nat64Error::MalformedHeader);
    };
    let src6 = prefix.embed(ip4.source());
    let proto = match ip4.protocol() {
        NextHeader::TCP => NextHeader::TCP,
        NextHeader::UDP => NextHeader::UDP,
        NextHeader::ICMP => NextHeader::ICMP6,
        other => return Err(Nat64Error::UnsupportedProtocol(other)),
    };

    let mut ip6 = Ipv6::default();
    ip6.set_source(src6)
        .set_destination(inside.addr)
        .set_hop_limit(ip4.ttl())
        .set_traffic_class(ip4.tos())
        .set_flow_label(0)
        .set_next_header(proto);

    // the v4 identification widens losslessly into the v6 extension header
    let frag = packet.frag();

    let fragmented = frag.is_some();
    let transport = match packet.transport() {
        None => None,
        Some(Transport::Tcp(tcp)) => {
            let mut tcp = tcp.clone();
            if fragmented {
                let checksum = adjust_tcp_udp(
                    tcp.checksum(),
                    PseudoDelta::ToV6 {
                        old_src: ip4.source(),
                        old_dst: ip4.destination(),
                        new_src: src6,
                        new_dst: inside.addr,
                    },
                    tcp.destination(),
                    inside.id,
                );
                tcp.set_checksum(checksum);
            }
            tcp.set_destination(inside.id);
            Some(Transport::Tcp(tcp))
        }
        Some(Transport::Udp(udp)) => {
            let mut udp = udp.clone();
            if fragmented {
                if udp.checksum() == 0 {
                    // the v4 sender omitted the checksum; IPv6 requires one
                    // and a lone fragment cannot supply it
                    return Err(Nat64Error::UnsupportedProtocol(NextHeader::UDP));
                }
                let checksum = adjust_tcp_udp(
                    udp.checksum(),
                    PseudoDelta::ToV6 {
                        old_src: ip4.source(),
                        old_dst: ip4.destination(),
                        new_src: src6,
                        new_dst: inside.addr,
                    },
                    udp.destination(),
                    inside.id,
                );
                udp.set_checksum(checksum);
            }
            udp.set_destination(inside.id);
            Some(Transport::Udp(udp))
        }
        Some(Transport::Icmp4(icmp)) => {
            if fragmented {
                return Err(Nat64Error::UnsupportedProtocol(NextHeader::ICMP));
            }
            let (_, seq) = icmp
                .echo()
                .ok_or(Nat64Error::UnsupportedProtocol(NextHeader::ICMP))?;
            let icmp6 = if icmp.is_echo_request() {
                Icmp6::echo_request(inside.id, seq)
            } else {
                Icmp6::echo_reply(inside.id, seq)
            };
            Some(Transport::Icmp6(icmp6))
        }
        Some(Transport::Icmp6(_)) => return Err(Nat64Error::MalformedHeader),
    };

    Ok(Translated {
        net: Net::Ipv6(ip6),
        transport,
        frag,
    })
}

enum PseudoDelta {
    ToV4 {
        old_src: std::net::Ipv6Addr,
        old_dst: std::net::Ipv6Addr,
        new_src: std::net::Ipv4Addr,
        new_dst: std::net::Ipv4Addr,
    },
    ToV6 {
        old_src: std::net::Ipv4Addr,
        old_dst: std::net::Ipv4Addr,
        new_src: std::net::Ipv6Addr,
        new_dst: std::net::Ipv6Addr,
    },
}

// TCP and UDP use the same protocol number and length fields in both
// pseudo-headers, so only the addresses and the rewritten port move the sum.
fn adjust_tcp_udp(checksum: u16, delta: PseudoDelta, old_port: u16, new_port: u16) -> u16 {
    match delta {
        PseudoDelta::ToV4 {
            old_src,
            old_dst,
            new_src,
            new_dst,
        } => adjust(
            checksum,
            addr_words_v6(old_src)
                .into_iter()
                .chain(addr_words_v6(old_dst))
                .chain([old_port]),
            addr_words_v4(new_src)
                .into_iter()
                .chain(addr_words_v4(new_dst))
                .chain([new_port]),
        ),
        PseudoDelta::ToV6 {
            old_src,
            old_dst,
            new_src,
            new_dst,
        } => adjust(
            checksum,
            addr_words_v4(old_src)
                .into_iter()
                .chain(addr_words_v4(old_dst))
                .chain([old_port]),
            addr_words_v6(new_src)
                .into_iter()
                .chain(addr_words_v6(new_dst))
                .chain([new_port]),
        ),
    }
}
