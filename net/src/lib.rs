// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]

//! Packet header types for the NAT64 translator.
//!
//! This crate wraps the [`etherparse`] header codecs in owned types that the
//! translation engine can manipulate without touching raw bytes: IPv4 and
//! IPv6 headers, a transport summary (TCP, UDP, ICMP echo), fragment
//! metadata, and the IPv4-embedded-IPv6 addressing used to represent IPv4
//! peers on the IPv6 side.

pub mod checksum;
pub mod embed;
pub mod headers;
pub mod icmp4;
pub mod icmp6;
pub mod ip;
pub mod ipv4;
pub mod ipv6;
pub mod packet;
pub mod tcp;
pub mod udp;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
