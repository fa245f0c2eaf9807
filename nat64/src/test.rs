// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! End-to-end engine tests: packets through the hook dispatcher.

use crate::binding::{InsideTuple, OutsideTuple, Proto, Session};
use crate::engine::Nat64;
use net::embed::Nat64Prefix;
use net::headers::{Net, Transport};
use net::packet::Packet;
use net::test_utils::{
    build_icmp_echo_v4, build_icmp_echo_v6, build_udp_v4, build_udp_v6, build_v6_first_fragment,
    build_v6_fragment,
};
use netfilter::{Hook, HookChain, HookContext, HookPoint, InterfaceId, Verdict};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::Duration;
use tracing_test::traced_test;

const NAT_ADDR: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 1);
const PEER: Ipv4Addr = Ipv4Addr::new(203, 0, 113, 5);

fn inside_if() -> InterfaceId {
    InterfaceId::new(1)
}

fn outside_if() -> InterfaceId {
    InterfaceId::new(2)
}

fn engine() -> Nat64 {
    let nat = Nat64::new();
    nat.set_inside(inside_if());
    nat.set_outside(outside_if());
    nat.add_address_pool(NAT_ADDR, 32).expect("valid pool");
    nat.add_port_pool(10_000, 10_003).expect("valid range");
    nat.check_config().expect("fully configured");
    nat
}

fn out_ctx() -> HookContext {
    HookContext::new(HookPoint::PostRouting, Some(inside_if()), Some(outside_if()))
}

fn in_ctx() -> HookContext {
    HookContext::new(HookPoint::PreRouting, Some(outside_if()), None)
}

fn host() -> Ipv6Addr {
    Ipv6Addr::from_str("2001:db8::1").unwrap()
}

fn peer_v6() -> Ipv6Addr {
    Nat64Prefix::WELL_KNOWN.embed(PEER)
}

fn outbound_udp(src_port: u16) -> Packet {
    build_udp_v6(host(), src_port, peer_v6(), 53, b"query".to_vec())
}

fn source_port(packet: &Packet) -> Option<u16> {
    packet.transport().and_then(Transport::source_id)
}

#[test]
fn outbound_creates_binding_and_translates() {
    let mut nat = engine();
    let mut packet = outbound_udp(1500);
    assert_eq!(nat.inspect(out_ctx(), &mut packet), Verdict::Accept);

    let Net::Ipv4(ip4) = packet.net() else {
        panic!("packet was not translated to IPv4");
    };
    assert_eq!(ip4.source(), NAT_ADDR);
    assert_eq!(ip4.destination(), PEER);
    assert_eq!(source_port(&packet), Some(10_000));
    assert_eq!(nat.num_bib(), 1);
    assert_eq!(nat.bib_at(0).map(|e| e.nat.id), Some(10_000));

    // the rewritten packet is wire-consistent
    let bytes = packet.serialize();
    assert!(Packet::parse(&bytes).is_ok());
}

#[test]
fn distinct_flows_get_unique_ports_until_exhaustion() {
    let mut nat = engine(); // four ports: 10000..=10003
    for (i, expected) in (10_000u16..=10_003).enumerate() {
        #[allow(clippy::cast_possible_truncation)]
        let mut packet = outbound_udp(1500 + i as u16);
        assert_eq!(nat.inspect(out_ctx(), &mut packet), Verdict::Accept);
        assert_eq!(source_port(&packet), Some(expected));
    }
    assert_eq!(nat.num_bib(), 4);

    let mut packet = outbound_udp(1504);
    assert_eq!(nat.inspect(out_ctx(), &mut packet), Verdict::Drop);
    // exhaustion creates nothing
    assert_eq!(nat.num_bib(), 4);
}

#[test]
fn repeated_flows_reuse_their_binding() {
    let mut nat = engine();
    let mut first = outbound_udp(1500);
    let mut second = outbound_udp(1500);
    assert_eq!(nat.inspect(out_ctx(), &mut first), Verdict::Accept);
    assert_eq!(nat.inspect(out_ctx(), &mut second), Verdict::Accept);
    assert_eq!(source_port(&first), Some(10_000));
    assert_eq!(source_port(&second), Some(10_000));
    assert_eq!(nat.num_bib(), 1);
}

#[test]
fn round_trip_restores_the_inside_tuple() {
    let mut nat = engine();
    let mut outbound = outbound_udp(1500);
    assert_eq!(nat.inspect(out_ctx(), &mut outbound), Verdict::Accept);

    let mut reply = build_udp_v4(PEER, 53, NAT_ADDR, 10_000, b"answer".to_vec());
    assert_eq!(nat.inspect(in_ctx(), &mut reply), Verdict::Accept);

    let Net::Ipv6(ip6) = reply.net() else {
        panic!("reply was not translated to IPv6");
    };
    assert_eq!(ip6.source(), peer_v6());
    assert_eq!(ip6.destination(), host());
    let Some(Transport::Udp(udp)) = reply.transport() else {
        panic!("transport lost");
    };
    assert_eq!(udp.source(), 53);
    assert_eq!(udp.destination(), 1500);
}

#[test]
#[traced_test]
fn inbound_miss_never_creates_a_binding() {
    let mut nat = engine();
    let mut packet = build_udp_v4(PEER, 53, NAT_ADDR, 12_345, b"knock".to_vec());
    assert_eq!(nat.inspect(in_ctx(), &mut packet), Verdict::Drop);
    assert_eq!(nat.num_bib(), 0);
    assert!(logs_contain("no binding for packet"));
}

#[test]
fn removing_a_bib_entry_drops_return_traffic() {
    let mut nat = engine();
    let mut outbound = outbound_udp(1500);
    assert_eq!(nat.inspect(out_ctx(), &mut outbound), Verdict::Accept);

    let removed = nat.remove_bib_entry(0).expect("entry exists");
    assert_eq!(removed.nat.id, 10_000);

    let mut reply = build_udp_v4(PEER, 53, NAT_ADDR, 10_000, b"answer".to_vec());
    assert_eq!(nat.inspect(in_ctx(), &mut reply), Verdict::Drop);
}

#[test]
fn static_session_survives_dynamic_expiry_and_prints() {
    let mut nat = engine();
    let prefix = nat.prefix();
    let session = Session::new(
        InsideTuple {
            addr: host(),
            id: 9,
            proto: Proto::Udp,
        },
        OutsideTuple {
            addr: PEER,
            id: 9,
            proto: Proto::Udp,
        },
        OutsideTuple {
            addr: NAT_ADDR,
            id: 9,
            proto: Proto::Udp,
        },
        &prefix,
        Duration::from_secs(3600),
    );
    nat.add_session_entry(session);

    let mut outbound = outbound_udp(1500);
    assert_eq!(nat.inspect(out_ctx(), &mut outbound), Verdict::Accept);
    assert_eq!(nat.num_bib(), 1);

    // BIB default lifetime is 120s; the session outlives the sweep
    nat.tick(Duration::from_secs(300));
    assert_eq!(nat.sweep_expired(), 1);
    assert_eq!(nat.num_bib(), 0);
    assert_eq!(nat.num_sessions(), 1);

    // return traffic for the session still translates
    let mut reply = build_udp_v4(PEER, 9, NAT_ADDR, 9, b"syslog".to_vec());
    assert_eq!(nat.inspect(in_ctx(), &mut reply), Verdict::Accept);
    let Some(Transport::Udp(udp)) = reply.transport() else {
        panic!("transport lost");
    };
    assert_eq!(udp.destination(), 9);

    let mut printed = Vec::new();
    nat.print_table(&mut printed).expect("write to vec");
    let text = String::from_utf8(printed).expect("utf8");
    assert!(text.contains("[2001:db8::1]:9/udp"));
    assert!(text.contains("203.0.113.1:9/udp"));
    assert!(text.contains("3300s"));
}

#[test]
fn session_ports_are_never_reissued() {
    let mut nat = engine();
    let prefix = nat.prefix();
    nat.add_session_entry(Session::new(
        InsideTuple {
            addr: host(),
            id: 9,
            proto: Proto::Udp,
        },
        OutsideTuple {
            addr: PEER,
            id: 9,
            proto: Proto::Udp,
        },
        OutsideTuple {
            addr: NAT_ADDR,
            id: 10_001,
            proto: Proto::Udp,
        },
        &prefix,
        Duration::from_secs(3600),
    ));

    let mut first = outbound_udp(1500);
    let mut second = outbound_udp(1501);
    assert_eq!(nat.inspect(out_ctx(), &mut first), Verdict::Accept);
    assert_eq!(nat.inspect(out_ctx(), &mut second), Verdict::Accept);
    assert_eq!(source_port(&first), Some(10_000));
    // 10001 is claimed by the session, the allocator skips it
    assert_eq!(source_port(&second), Some(10_002));
}

#[test]
fn unrelated_traffic_passes_untouched() {
    let mut nat = engine();

    // IPv6 not addressed through the translation prefix
    let mut packet = build_udp_v6(
        host(),
        1500,
        Ipv6Addr::from_str("2001:db8::2").unwrap(),
        53,
        b"local".to_vec(),
    );
    let before = packet.clone();
    assert_eq!(nat.inspect(out_ctx(), &mut packet), Verdict::Accept);
    assert_eq!(packet, before);
    assert_eq!(nat.num_bib(), 0);

    // IPv4 not addressed to the NAT pool
    let mut packet = build_udp_v4(PEER, 53, Ipv4Addr::new(192, 0, 2, 44), 9999, b"".to_vec());
    let before = packet.clone();
    assert_eq!(nat.inspect(in_ctx(), &mut packet), Verdict::Accept);
    assert_eq!(packet, before);

    // IPv6 on the wrong hook point
    let mut packet = outbound_udp(1500);
    let ctx = HookContext::new(HookPoint::PreRouting, Some(inside_if()), None);
    assert_eq!(nat.inspect(ctx, &mut packet), Verdict::Accept);
    assert_eq!(nat.num_bib(), 0);
}

#[test]
fn port_less_protocol_is_dropped() {
    let mut nat = engine();
    let mut packet = outbound_udp(1500);
    let Net::Ipv6(ip6) = packet.net() else {
        panic!("wrong family");
    };
    let mut ip6 = ip6.clone();
    ip6.set_next_header(net::ip::NextHeader::new(47)); // GRE
    packet.set_headers(Net::Ipv6(ip6), None, None);
    assert_eq!(nat.inspect(out_ctx(), &mut packet), Verdict::Drop);
    assert_eq!(nat.num_bib(), 0);
}

#[test]
fn icmp_echo_round_trip_uses_the_identifier() {
    let mut nat = engine();
    let mut request = build_icmp_echo_v6(host(), peer_v6(), 0xabcd, 1, true, b"ping".to_vec());
    assert_eq!(nat.inspect(out_ctx(), &mut request), Verdict::Accept);
    let Some(Transport::Icmp4(icmp)) = request.transport() else {
        panic!("not ICMPv4");
    };
    assert_eq!(icmp.echo(), Some((10_000, 1)));

    let mut reply = build_icmp_echo_v4(PEER, NAT_ADDR, 10_000, 1, false, b"pong".to_vec());
    assert_eq!(nat.inspect(in_ctx(), &mut reply), Verdict::Accept);
    let Some(Transport::Icmp6(icmp)) = reply.transport() else {
        panic!("not ICMPv6");
    };
    assert_eq!(icmp.echo(), Some((0xabcd, 1)));
    let Net::Ipv6(ip6) = reply.net() else {
        panic!("wrong family");
    };
    assert_eq!(ip6.destination(), host());
}

#[test]
fn fragments_follow_their_first_fragment() {
    let mut nat = engine();
    let mut first = build_v6_first_fragment(host(), 1500, peer_v6(), 53, 0xbeef, vec![0; 64]);
    assert_eq!(nat.inspect(out_ctx(), &mut first), Verdict::Accept);
    let Net::Ipv4(ip4) = first.net() else {
        panic!("wrong family");
    };
    assert_eq!(ip4.identification(), 0xbeef);
    assert!(ip4.more_fragments());
    assert_eq!(source_port(&first), Some(10_000));

    let mut last = build_v6_fragment(host(), peer_v6(), 0xbeef, 9, false, vec![0; 40]);
    assert_eq!(nat.inspect(out_ctx(), &mut last), Verdict::Accept);
    let Net::Ipv4(ip4) = last.net() else {
        panic!("wrong family");
    };
    assert_eq!(ip4.source(), NAT_ADDR);
    assert_eq!(ip4.identification(), 0xbeef);
    assert_eq!(ip4.fragment_offset(), 9);
    assert!(!ip4.more_fragments());

    // one flow, one binding
    assert_eq!(nat.num_bib(), 1);
}

#[test]
fn reordered_trailing_fragments_still_translate() {
    let mut nat = engine();
    let mut first = build_v6_first_fragment(host(), 1500, peer_v6(), 53, 0xbeef, vec![0; 64]);
    assert_eq!(nat.inspect(out_ctx(), &mut first), Verdict::Accept);
    let mut last = build_v6_fragment(host(), peer_v6(), 0xbeef, 18, false, vec![0; 40]);
    assert_eq!(nat.inspect(out_ctx(), &mut last), Verdict::Accept);

    // a middle fragment delivered after the last one still finds its flow
    let mut middle = build_v6_fragment(host(), peer_v6(), 0xbeef, 9, true, vec![0; 72]);
    assert_eq!(nat.inspect(out_ctx(), &mut middle), Verdict::Accept);
    let Net::Ipv4(ip4) = middle.net() else {
        panic!("wrong family");
    };
    assert_eq!(ip4.source(), NAT_ADDR);
    assert_eq!(ip4.identification(), 0xbeef);
    assert_eq!(ip4.fragment_offset(), 9);
    assert!(ip4.more_fragments());
    assert_eq!(nat.num_bib(), 1);

    // the sweep reclaims the correlation entry; a late straggler misses
    nat.sweep_expired();
    let mut straggler = build_v6_fragment(host(), peer_v6(), 0xbeef, 14, true, vec![0; 40]);
    assert_eq!(nat.inspect(out_ctx(), &mut straggler), Verdict::Drop);
}

#[test]
fn orphan_fragment_is_dropped() {
    let mut nat = engine();
    let mut orphan = build_v6_fragment(host(), peer_v6(), 0x7777, 9, false, vec![0; 40]);
    assert_eq!(nat.inspect(out_ctx(), &mut orphan), Verdict::Drop);
}

#[test]
fn chain_integration_translates_on_accept() {
    let nat = engine();
    let mut chain: HookChain<Packet> = HookChain::new();
    nat.attach(&mut chain, 0);
    assert_eq!(chain.len(HookPoint::PreRouting), 1);
    assert_eq!(chain.len(HookPoint::PostRouting), 1);

    let mut packet = outbound_udp(1500);
    let forwarded = chain.dispatch_then(out_ctx(), &mut packet, |p| {
        matches!(p.net(), Net::Ipv4(_))
    });
    assert_eq!(forwarded, Some(true));
    assert_eq!(nat.num_bib(), 1);
}

#[test]
fn misconfiguration_is_reported_before_traffic() {
    let nat = Nat64::new();
    assert!(matches!(
        nat.check_config(),
        Err(crate::errors::ConfigError::InsideNotSet)
    ));
    nat.set_inside(inside_if());
    nat.set_outside(outside_if());
    assert!(matches!(
        nat.check_config(),
        Err(crate::errors::ConfigError::NoAddressPool)
    ));
    nat.add_address_pool(NAT_ADDR, 32).expect("valid pool");
    assert!(matches!(
        nat.check_config(),
        Err(crate::errors::ConfigError::EmptyPortPool)
    ));
    assert!(nat.add_address_pool(NAT_ADDR, 40).is_err());
    assert!(nat.add_port_pool(20, 10).is_err());
    nat.add_port_pool(10_000, 10_500).expect("valid range");
    assert!(nat.check_config().is_ok());
}
