// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Packet builders for tests.

use crate::headers::{FragInfo, Net, Transport};
use crate::icmp4::Icmp4;
use crate::icmp6::Icmp6;
use crate::ip::NextHeader;
use crate::ipv4::Ipv4;
use crate::ipv6::Ipv6;
use crate::packet::Packet;
use crate::tcp::Tcp;
use crate::udp::Udp;
use std::net::{Ipv4Addr, Ipv6Addr};

const TEST_TTL: u8 = 64;

fn finish(
    net: Net,
    transport: Option<Transport>,
    frag: Option<FragInfo>,
    payload: Vec<u8>,
) -> Packet {
    let mut packet = Packet::new(net, transport, frag, payload);
    packet.fix_lengths();
    packet.update_checksums();
    packet
}

fn base_v4(src: Ipv4Addr, dst: Ipv4Addr, proto: NextHeader) -> Ipv4 {
    let mut ip = Ipv4::default();
    ip.set_source(src)
        .set_destination(dst)
        .set_ttl(TEST_TTL)
        .set_protocol(proto);
    ip
}

fn base_v6(src: Ipv6Addr, dst: Ipv6Addr, proto: NextHeader) -> Ipv6 {
    let mut ip = Ipv6::default();
    ip.set_source(src)
        .set_destination(dst)
        .set_hop_limit(TEST_TTL)
        .set_next_header(proto);
    ip
}

/// Build an unfragmented IPv4 UDP packet.
#[must_use]
pub fn build_udp_v4(
    src: Ipv4Addr,
    src_port: u16,
    dst: Ipv4Addr,
    dst_port: u16,
    payload: Vec<u8>,
) -> Packet {
    let ip = base_v4(src, dst, NextHeader::UDP);
    let mut udp = Udp::default();
    udp.set_source(src_port).set_destination(dst_port);
    finish(Net::Ipv4(ip), Some(Transport::Udp(udp)), None, payload)
}

/// Build an unfragmented IPv6 UDP packet.
#[must_use]
pub fn build_udp_v6(
    src: Ipv6Addr,
    src_port: u16,
    dst: Ipv6Addr,
    dst_port: u16,
    payload: Vec<u8>,
) -> Packet {
    let ip = base_v6(src, dst, NextHeader::UDP);
    let mut udp = Udp::default();
    udp.set_source(src_port).set_destination(dst_port);
    finish(Net::Ipv6(ip), Some(Transport::Udp(udp)), None, payload)
}

/// Build an unfragmented IPv4 TCP packet.
#[must_use]
pub fn build_tcp_v4(
    src: Ipv4Addr,
    src_port: u16,
    dst: Ipv4Addr,
    dst_port: u16,
    payload: Vec<u8>,
) -> Packet {
    let ip = base_v4(src, dst, NextHeader::TCP);
    let mut tcp = Tcp::default();
    tcp.set_source(src_port).set_destination(dst_port);
    finish(Net::Ipv4(ip), Some(Transport::Tcp(tcp)), None, payload)
}

/// Build an unfragmented IPv6 TCP packet.
#[must_use]
pub fn build_tcp_v6(
    src: Ipv6Addr,
    src_port: u16,
    dst: Ipv6Addr,
    dst_port: u16,
    payload: Vec<u8>,
) -> Packet {
    let ip = base_v6(src, dst, NextHeader::TCP);
    let mut tcp = Tcp::default();
    tcp.set_source(src_port).set_destination(dst_port);
    finish(Net::Ipv6(ip), Some(Transport::Tcp(tcp)), None, payload)
}

/// Build an ICMPv6 echo request (or reply) packet.
#[must_use]
pub fn build_icmp_echo_v6(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    id: u16,
    seq: u16,
    request: bool,
    payload: Vec<u8>,
) -> Packet {
    let ip = base_v6(src, dst, NextHeader::ICMP6);
    let icmp = if request {
        Icmp6::echo_request(id, seq)
    } else {
        Icmp6::echo_reply(id, seq)
    };
    finish(Net::Ipv6(ip), Some(Transport::Icmp6(icmp)), None, payload)
}

/// Build an ICMPv4 echo request (or reply) packet.
#[must_use]
pub fn build_icmp_echo_v4(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    id: u16,
    seq: u16,
    request: bool,
    payload: Vec<u8>,
) -> Packet {
    let ip = base_v4(src, dst, NextHeader::ICMP);
    let icmp = if request {
        Icmp4::echo_request(id, seq)
    } else {
        Icmp4::echo_reply(id, seq)
    };
    finish(Net::Ipv4(ip), Some(Transport::Icmp4(icmp)), None, payload)
}

/// Build a non-first IPv6 UDP fragment (no transport header).
#[must_use]
pub fn build_v6_fragment(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    ident: u32,
    offset: u16,
    more: bool,
    payload: Vec<u8>,
) -> Packet {
    debug_assert!(offset > 0, "first fragments carry a transport header");
    let ip = base_v6(src, dst, NextHeader::UDP);
    let frag = FragInfo {
        ident,
        offset,
        more,
    };
    finish(Net::Ipv6(ip), None, Some(frag), payload)
}

/// Build the first IPv6 fragment of a fragmented UDP datagram.
#[must_use]
pub fn build_v6_first_fragment(
    src: Ipv6Addr,
    src_port: u16,
    dst: Ipv6Addr,
    dst_port: u16,
    ident: u32,
    payload: Vec<u8>,
) -> Packet {
    let ip = base_v6(src, dst, NextHeader::UDP);
    let mut udp = Udp::default();
    #[allow(clippy::cast_possible_truncation)]
    udp.set_source(src_port)
        .set_destination(dst_port)
        .set_length(Udp::LEN as u16 + payload.len() as u16);
    let frag = FragInfo {
        ident,
        offset: 0,
        more: true,
    };
    finish(Net::Ipv6(ip), Some(Transport::Udp(udp)), Some(frag), payload)
}

/// Build a non-first IPv4 UDP fragment (no transport header).
#[must_use]
pub fn build_v4_fragment(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    ident: u16,
    offset: u16,
    more: bool,
    payload: Vec<u8>,
) -> Packet {
    debug_assert!(offset > 0, "first fragments carry a transport header");
    let mut ip = base_v4(src, dst, NextHeader::UDP);
    ip.set_identification(ident)
        .set_more_fragments(more)
        .set_fragment_offset(offset)
        .unwrap_or_else(|_| unreachable!());
    let frag = FragInfo {
        ident: u32::from(ident),
        offset,
        more,
    };
    finish(Net::Ipv4(ip), None, Some(frag), payload)
}

/// Build the first IPv4 fragment of a fragmented UDP datagram.
#[must_use]
pub fn build_v4_first_fragment(
    src: Ipv4Addr,
    src_port: u16,
    dst: Ipv4Addr,
    dst_port: u16,
    ident: u16,
    payload: Vec<u8>,
) -> Packet {
    let mut ip = base_v4(src, dst, NextHeader::UDP);
    ip.set_identification(ident).set_more_fragments(true);
    let mut udp = Udp::default();
    #[allow(clippy::cast_possible_truncation)]
    udp.set_source(src_port)
        .set_destination(dst_port)
        .set_length(Udp::LEN as u16 + payload.len() as u16);
    let frag = FragInfo {
        ident: u32::from(ident),
        offset: 0,
        more: true,
    };
    finish(Net::Ipv4(ip), Some(Transport::Udp(udp)), Some(frag), payload)
}
