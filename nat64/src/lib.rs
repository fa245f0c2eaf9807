// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]

//! # Stateful NAT64 translation engine
//!
//! Maps IPv6 flows onto a shared pool of IPv4 addresses and ports (and back)
//! so IPv6-only hosts can reach IPv4-only peers. The engine keeps two kinds
//! of bindings: administrator-configured [`Session`] entries and
//! traffic-triggered [`BibEntry`] entries, both held in a [`BindingTable`]
//! with forward (inside tuple) and reverse (outside tuple) indexes. Outside
//! ports come from a [`PortAllocator`] that guarantees each active binding a
//! unique (address, port) pair.
//!
//! The engine attaches to a forwarding path through the hook machinery in
//! `nat64-netfilter`: register a [`Nat64`] at pre-routing and post-routing
//! and it will rewrite matching packets in place, returning `Accept` or
//! `Drop`.

mod alloc;
mod binding;
mod engine;
mod errors;
mod port;
mod table;
mod translate;

#[cfg(test)]
mod test;

pub use alloc::PortAllocator;
pub use binding::{BibEntry, InsideTuple, OutsideTuple, Proto, Session};
pub use engine::Nat64;
pub use errors::{ConfigError, Nat64Error};
pub use port::{NatPort, NatPortError};
pub use table::{BindingTable, Mapping};
