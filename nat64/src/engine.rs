// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! The NAT64 engine: per-packet dispatch, binding resolution and creation,
//! administrative configuration and table introspection.
//!
//! One engine owns one binding table and one port allocator behind a single
//! mutex; a packet holds the critical section from lookup through insertion,
//! so the claim-set an allocation reads is the claim-set its binding is
//! written against. The engine is `Clone` (clones share state), which is how
//! it registers at both hook points of a chain.

use crate::alloc::PortAllocator;
use crate::binding::{BibEntry, InsideTuple, OutsideTuple, Proto, Session};
use crate::errors::{ConfigError, Nat64Error};
use crate::table::{BindingTable, Mapping};
use crate::translate;
use ipnet::Ipv4Net;
use net::embed::Nat64Prefix;
use net::headers::Net;
use net::packet::Packet;
use netfilter::{Hook, HookChain, HookContext, HookPoint, InterfaceId, Verdict};
use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, trace};

type Map<K, V> = HashMap<K, V, ahash::RandomState>;

/// Default lifetime for traffic-created BIB entries, refreshed on every
/// translated packet of the flow.
const DEFAULT_BIB_LIFETIME: Duration = Duration::from_secs(120);

#[derive(Debug)]
struct Nat64State {
    inside: Option<InterfaceId>,
    outside: Option<InterfaceId>,
    pool: Option<Ipv4Net>,
    prefix: Nat64Prefix,
    allocator: PortAllocator,
    table: BindingTable,
    bib_lifetime: Duration,
    // fragment correlation: non-first fragments carry no ports, so the
    // first fragment of a flow records which binding its siblings belong to
    frags_out: Map<(Ipv6Addr, Ipv6Addr, u32), InsideTuple>,
    frags_in: Map<(Ipv4Addr, Ipv4Addr, u16), OutsideTuple>,
}

impl Default for Nat64State {
    fn default() -> Self {
        Self {
            inside: None,
            outside: None,
            pool: None,
            prefix: Nat64Prefix::WELL_KNOWN,
            allocator: PortAllocator::default(),
            table: BindingTable::new(),
            bib_lifetime: DEFAULT_BIB_LIFETIME,
            frags_out: Map::default(),
            frags_in: Map::default(),
        }
    }
}

/// A stateful NAT64 translator.
///
/// Configure it with the administrative methods, then [`Nat64::attach`] it
/// to a [`HookChain`]. Per packet it only ever returns [`Verdict::Accept`]
/// (translated in place, or not NAT64 traffic at all) or [`Verdict::Drop`].
#[derive(Debug, Clone, Default)]
pub struct Nat64 {
    inner: Arc<Mutex<Nat64State>>,
}

impl Nat64 {
    /// Create an engine with empty tables, no interfaces and the well-known
    /// translation prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inside (IPv6-facing) interface.
    pub fn set_inside(&self, interface: InterfaceId) {
        debug!("inside interface set to {interface}");
        self.lock().inside = Some(interface);
    }

    /// Set the outside (IPv4-facing) interface.
    pub fn set_outside(&self, interface: InterfaceId) {
        debug!("outside interface set to {interface}");
        self.lock().outside = Some(interface);
    }

    /// Replace the translation prefix (defaults to `64:ff9b::/96`).
    pub fn set_prefix(&self, prefix: Nat64Prefix) {
        self.lock().prefix = prefix;
    }

    /// The translation prefix currently in use.
    #[must_use]
    pub fn prefix(&self) -> Nat64Prefix {
        self.lock().prefix
    }

    /// Configure the IPv4 address pool NAT bindings draw from.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BadPoolMask`] if `mask_len` exceeds 32.
    pub fn add_address_pool(&self, addr: Ipv4Addr, mask_len: u8) -> Result<(), ConfigError> {
        let pool = Ipv4Net::new(addr, mask_len).map_err(|_| ConfigError::BadPoolMask(mask_len))?;
        debug!("address pool set to {pool}");
        self.lock().pool = Some(pool);
        Ok(())
    }

    /// Configure the outside port range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPortRange`] for a reversed range or one
    /// including port zero.
    pub fn add_port_pool(&self, start: u16, end: u16) -> Result<(), ConfigError> {
        self.lock().allocator.configure(start, end)
    }

    /// Change the lifetime granted to traffic-created BIB entries.
    pub fn set_bib_lifetime(&self, lifetime: Duration) {
        self.lock().bib_lifetime = lifetime;
    }

    /// Add a static session entry.
    pub fn add_session_entry(&self, session: Session) {
        self.lock().table.add_session(session);
    }

    /// Add a BIB entry by hand (normally traffic does this).
    pub fn add_bib_entry(&self, entry: BibEntry) {
        self.lock().table.add_bib(entry);
    }

    /// Remove the session at a position (insertion order).
    pub fn remove_session_entry(&self, index: usize) -> Option<Session> {
        self.lock().table.remove_session(index)
    }

    /// Remove the BIB entry at a position (insertion order).
    pub fn remove_bib_entry(&self, index: usize) -> Option<BibEntry> {
        self.lock().table.remove_bib(index)
    }

    /// The session at a position, copied out.
    #[must_use]
    pub fn session_at(&self, index: usize) -> Option<Session> {
        self.lock().table.session_at(index).copied()
    }

    /// The BIB entry at a position, copied out.
    #[must_use]
    pub fn bib_at(&self, index: usize) -> Option<BibEntry> {
        self.lock().table.bib_at(index).copied()
    }

    /// Number of session entries.
    #[must_use]
    pub fn num_sessions(&self) -> usize {
        self.lock().table.num_sessions()
    }

    /// Number of BIB entries.
    #[must_use]
    pub fn num_bib(&self) -> usize {
        self.lock().table.num_bib()
    }

    /// Verify the engine is fully configured for traffic.
    ///
    /// # Errors
    ///
    /// Returns the first missing piece of configuration.
    pub fn check_config(&self) -> Result<(), ConfigError> {
        let state = self.lock();
        if state.inside.is_none() {
            return Err(ConfigError::InsideNotSet);
        }
        if state.outside.is_none() {
            return Err(ConfigError::OutsideNotSet);
        }
        if state.pool.is_none() {
            return Err(ConfigError::NoAddressPool);
        }
        if !state.allocator.is_configured() {
            return Err(ConfigError::EmptyPortPool);
        }
        Ok(())
    }

    /// Age every binding by `elapsed`. Driven by the external scheduler.
    pub fn tick(&self, elapsed: Duration) {
        self.lock().table.tick(elapsed);
    }

    /// Drop expired bindings and stale fragment correlation state, returning
    /// the number of bindings removed.
    pub fn sweep_expired(&self) -> usize {
        let mut state = self.lock();
        state.frags_out.clear();
        state.frags_in.clear();
        state.table.sweep_expired()
    }

    /// Write a fixed-column listing of all sessions and BIB entries, in
    /// insertion order.
    ///
    /// # Errors
    ///
    /// Propagates write failures from `out`.
    pub fn print_table(&self, out: &mut impl io::Write) -> io::Result<()> {
        let state = self.lock();
        writeln!(out, "sessions ({}):", state.table.num_sessions())?;
        writeln!(
            out,
            "  {:<34} {:<26} {:<26} {:<30} {:>8}",
            "inside", "nat", "peer", "nat-v6", "lifetime"
        )?;
        for session in state.table.sessions() {
            writeln!(
                out,
                "  {:<34} {:<26} {:<26} {:<30} {:>7}s",
                session.inside.to_string(),
                session.nat.to_string(),
                session.peer.to_string(),
                session.nat_v6.to_string(),
                session.lifetime.as_secs()
            )?;
        }
        writeln!(out, "bib ({}):", state.table.num_bib())?;
        writeln!(out, "  {:<34} {:<26} {:>8}", "inside", "nat", "lifetime")?;
        for entry in state.table.bib() {
            writeln!(
                out,
                "  {:<34} {:<26} {:>7}s",
                entry.inside.to_string(),
                entry.nat.to_string(),
                entry.lifetime.as_secs()
            )?;
        }
        Ok(())
    }

    /// Register this engine at both hook points of a chain.
    pub fn attach(&self, chain: &mut HookChain<Packet>, priority: i32) {
        chain.register(HookPoint::PreRouting, priority, self.clone());
        chain.register(HookPoint::PostRouting, priority, self.clone());
    }

    fn lock(&self) -> MutexGuard<'_, Nat64State> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Hook<Packet> for Nat64 {
    fn inspect(&mut self, ctx: HookContext, packet: &mut Packet) -> Verdict {
        self.lock().inspect(ctx, packet)
    }
}

impl Nat64State {
    fn inspect(&mut self, ctx: HookContext, packet: &mut Packet) -> Verdict {
        if self.outside.is_none() {
            return Verdict::Accept;
        }
        let is_v6 = matches!(packet.net(), Net::Ipv6(_));
        let result = match ctx.hook {
            HookPoint::PostRouting if is_v6 && ctx.out_if == self.outside => {
                self.process_outbound(packet)
            }
            HookPoint::PreRouting if !is_v6 && ctx.in_if == self.outside => {
                self.process_inbound(packet)
            }
            _ => return Verdict::Accept,
        };
        match result {
            Ok(verdict) => verdict,
            Err(err) => {
                debug!("dropping packet at {}: {err}", ctx.hook);
                Verdict::Drop
            }
        }
    }

    /// IPv6 leaving through the outside interface: source becomes the
    /// NAT-assigned pair, creating a BIB entry on first sight of the flow.
    fn process_outbound(&mut self, packet: &mut Packet) -> Result<Verdict, Nat64Error> {
        let Net::Ipv6(ip6) = packet.net() else {
            return Err(Nat64Error::MalformedHeader);
        };
        let src = ip6.source();
        let dst = ip6.destination();
        let proto = ip6.next_header();
        if !self.prefix.contains(dst) {
            // not addressed through the translator
            return Ok(Verdict::Accept);
        }

        let frag = packet.frag();
        let tuple = match packet.transport() {
            Some(transport) => InsideTuple {
                addr: src,
                id: transport
                    .source_id()
                    .ok_or(Nat64Error::UnsupportedProtocol(proto))?,
                proto: Proto::of_transport(transport),
            },
            None => {
                let f = frag.ok_or(Nat64Error::UnsupportedProtocol(proto))?;
                *self
                    .frags_out
                    .get(&(src, dst, f.ident))
                    .ok_or(Nat64Error::BindingNotFound)?
            }
        };

        let (mapping, fresh) = match self.table.find_by_inside_tuple(tuple) {
            Some(mapping) => (mapping, false),
            None => {
                let pool = self.pool.ok_or(Nat64Error::AddressPoolExhausted)?;
                let nat_addr = pool.addr();
                let port = self
                    .allocator
                    .allocate(|p| self.table.outside_port_claimed(nat_addr, p))?;
                let nat = OutsideTuple {
                    addr: nat_addr,
                    id: port.as_u16(),
                    proto: tuple.proto,
                };
                (Mapping { inside: tuple, nat }, true)
            }
        };

        // translate first: a failed translation must leave no binding behind
        let translated = translate::v6_to_v4(packet, mapping.nat, &self.prefix)?;
        if fresh {
            debug!("new BIB entry {} -> {}", tuple, mapping.nat);
            self.table
                .add_bib(BibEntry::new(tuple, mapping.nat, self.bib_lifetime));
        } else {
            self.table.refresh_bib(tuple, self.bib_lifetime);
        }
        // fragments arrive in any order; the entry outlives the last
        // fragment and is reclaimed by the sweep
        if let Some(f) = frag
            && f.is_first()
            && f.more
        {
            self.frags_out.insert((src, dst, f.ident), tuple);
        }

        packet.set_headers(translated.net, translated.transport, translated.frag);
        packet.fix_lengths();
        packet.update_checksums();
        trace!("translated outbound {} as {}", tuple, mapping.nat);
        Ok(Verdict::Accept)
    }

    /// IPv4 arriving on the outside interface, addressed to the pool: the
    /// destination becomes the bound inside endpoint. A miss is a hard miss.
    fn process_inbound(&mut self, packet: &mut Packet) -> Result<Verdict, Nat64Error> {
        let Net::Ipv4(ip4) = packet.net() else {
            return Err(Nat64Error::MalformedHeader);
        };
        let src = ip4.source();
        let dst = ip4.destination();
        let proto = ip4.protocol();
        match self.pool {
            Some(pool) if pool.contains(&dst) => {}
            // not addressed to the NAT pool
            _ => return Ok(Verdict::Accept),
        }

        let frag = packet.frag();
        let tuple = match packet.transport() {
            Some(transport) => OutsideTuple {
                addr: dst,
                id: transport
                    .destination_id()
                    .ok_or(Nat64Error::UnsupportedProtocol(proto))?,
                proto: Proto::of_transport(transport),
            },
            None => {
                let f = frag.ok_or(Nat64Error::UnsupportedProtocol(proto))?;
                #[allow(clippy::cast_possible_truncation)] // parsed from a u16 field
                let ident = f.ident as u16;
                *self
                    .frags_in
                    .get(&(src, dst, ident))
                    .ok_or(Nat64Error::BindingNotFound)?
            }
        };

        let mapping = self
            .table
            .find_by_outside_tuple(tuple)
            .ok_or(Nat64Error::BindingNotFound)?;
        let translated = translate::v4_to_v6(packet, mapping.inside, &self.prefix)?;
        self.table.refresh_bib(mapping.inside, self.bib_lifetime);
        if let Some(f) = frag
            && f.is_first()
            && f.more
        {
            #[allow(clippy::cast_possible_truncation)]
            let ident = f.ident as u16;
            self.frags_in.insert((src, dst, ident), tuple);
        }

        packet.set_headers(translated.net, translated.transport, translated.frag);
        packet.fix_lengths();
        packet.update_checksums();
        trace!("translated inbound {} as {}", tuple, mapping.inside);
        Ok(Verdict::Accept)
    }
}
