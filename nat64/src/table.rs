// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! The binding table: insertion-ordered sessions and BIB entries with
//! tuple-keyed forward and reverse indexes.
//!
//! Entries are identified internally by a monotonically increasing id, so
//! positional removal never disturbs another entry's key identity. Duplicate
//! tuples are accepted at insertion time; the newest entry owns the key
//! indexes (last-write-wins on lookup) while every entry stays positionally
//! visible.

use crate::binding::{BibEntry, InsideTuple, OutsideTuple, Session};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::trace;

type Map<K, V> = HashMap<K, V, ahash::RandomState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EntryId(u64);

/// A resolved binding, as returned by lookups: enough to translate a packet
/// in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// The inside (IPv6) endpoint.
    pub inside: InsideTuple,
    /// The NAT-assigned outside pair.
    pub nat: OutsideTuple,
}

/// The set of active bindings.
#[derive(Debug, Default)]
pub struct BindingTable {
    next_id: u64,
    session_order: Vec<EntryId>,
    bib_order: Vec<EntryId>,
    session_entries: Map<EntryId, Session>,
    bib_entries: Map<EntryId, BibEntry>,
    by_inside: Map<InsideTuple, EntryId>,
    by_outside: Map<OutsideTuple, EntryId>,
    // claim count per NAT (address, port); sessions and BIB entries both
    // contribute, duplicates stack
    claims: Map<(Ipv4Addr, u16), u32>,
}

impl BindingTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a static session entry.
    pub fn add_session(&mut self, session: Session) {
        let id = self.fresh_id();
        trace!("adding session {} -> {}", session.inside, session.nat);
        self.index(id, session.inside, session.nat);
        self.session_order.push(id);
        self.session_entries.insert(id, session);
    }

    /// Append a dynamic BIB entry.
    pub fn add_bib(&mut self, entry: BibEntry) {
        let id = self.fresh_id();
        trace!("adding BIB entry {} -> {}", entry.inside, entry.nat);
        self.index(id, entry.inside, entry.nat);
        self.bib_order.push(id);
        self.bib_entries.insert(id, entry);
    }

    /// Remove the session at a position (in insertion order).
    pub fn remove_session(&mut self, index: usize) -> Option<Session> {
        let id = *self.session_order.get(index)?;
        self.session_order.remove(index);
        let session = self
            .session_entries
            .remove(&id)
            .unwrap_or_else(|| unreachable!());
        self.unindex(id, session.inside, session.nat);
        Some(session)
    }

    /// Remove the BIB entry at a position (in insertion order).
    pub fn remove_bib(&mut self, index: usize) -> Option<BibEntry> {
        let id = *self.bib_order.get(index)?;
        self.bib_order.remove(index);
        let entry = self
            .bib_entries
            .remove(&id)
            .unwrap_or_else(|| unreachable!());
        self.unindex(id, entry.inside, entry.nat);
        Some(entry)
    }

    /// The session at a position (in insertion order).
    #[must_use]
    pub fn session_at(&self, index: usize) -> Option<&Session> {
        self.session_order
            .get(index)
            .and_then(|id| self.session_entries.get(id))
    }

    /// The BIB entry at a position (in insertion order).
    #[must_use]
    pub fn bib_at(&self, index: usize) -> Option<&BibEntry> {
        self.bib_order
            .get(index)
            .and_then(|id| self.bib_entries.get(id))
    }

    /// Number of session entries (expired ones included until swept).
    #[must_use]
    pub fn num_sessions(&self) -> usize {
        self.session_order.len()
    }

    /// Number of BIB entries (expired ones included until swept).
    #[must_use]
    pub fn num_bib(&self) -> usize {
        self.bib_order.len()
    }

    /// Sessions in insertion order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.session_order
            .iter()
            .filter_map(|id| self.session_entries.get(id))
    }

    /// BIB entries in insertion order.
    pub fn bib(&self) -> impl Iterator<Item = &BibEntry> {
        self.bib_order
            .iter()
            .filter_map(|id| self.bib_entries.get(id))
    }

    /// Look up the binding owning an inside (IPv6-side) tuple.
    ///
    /// An expired entry is removed on sight and never returned.
    pub fn find_by_inside_tuple(&mut self, tuple: InsideTuple) -> Option<Mapping> {
        let id = *self.by_inside.get(&tuple)?;
        self.resolve_live(id)
    }

    /// Look up the binding owning an outside (NAT v4-side) tuple.
    ///
    /// An expired entry is removed on sight and never returned.
    pub fn find_by_outside_tuple(&mut self, tuple: OutsideTuple) -> Option<Mapping> {
        let id = *self.by_outside.get(&tuple)?;
        self.resolve_live(id)
    }

    /// Reset the lifetime of the BIB entry owning an inside tuple. Sessions
    /// keep their configured lifetime; traffic does not refresh them.
    pub fn refresh_bib(&mut self, tuple: InsideTuple, lifetime: Duration) {
        if let Some(id) = self.by_inside.get(&tuple)
            && let Some(entry) = self.bib_entries.get_mut(id)
        {
            entry.lifetime = lifetime;
        }
    }

    /// Whether some active entry claims the NAT pair (`addr`, `port`).
    #[must_use]
    pub fn outside_port_claimed(&self, addr: Ipv4Addr, port: u16) -> bool {
        self.claims.contains_key(&(addr, port))
    }

    /// Age every entry by `elapsed`. Expired entries linger until the next
    /// lookup touches them or [`BindingTable::sweep_expired`] runs.
    pub fn tick(&mut self, elapsed: Duration) {
        for session in self.session_entries.values_mut() {
            session.lifetime = session.lifetime.saturating_sub(elapsed);
        }
        for entry in self.bib_entries.values_mut() {
            entry.lifetime = entry.lifetime.saturating_sub(elapsed);
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn sweep_expired(&mut self) -> usize {
        let dead_sessions: Vec<EntryId> = self
            .session_entries
            .iter()
            .filter(|(_, s)| s.lifetime.is_zero())
            .map(|(id, _)| *id)
            .collect();
        let dead_bib: Vec<EntryId> = self
            .bib_entries
            .iter()
            .filter(|(_, e)| e.lifetime.is_zero())
            .map(|(id, _)| *id)
            .collect();
        let removed = dead_sessions.len() + dead_bib.len();
        for id in dead_sessions {
            let session = self
                .session_entries
                .remove(&id)
                .unwrap_or_else(|| unreachable!());
            self.session_order.retain(|x| *x != id);
            self.unindex(id, session.inside, session.nat);
        }
        for id in dead_bib {
            let entry = self
                .bib_entries
                .remove(&id)
                .unwrap_or_else(|| unreachable!());
            self.bib_order.retain(|x| *x != id);
            self.unindex(id, entry.inside, entry.nat);
        }
        if removed > 0 {
            trace!("swept {removed} expired bindings");
        }
        removed
    }

    fn resolve_live(&mut self, id: EntryId) -> Option<Mapping> {
        let (mapping, expired) = if let Some(session) = self.session_entries.get(&id) {
            (
                Mapping {
                    inside: session.inside,
                    nat: session.nat,
                },
                session.lifetime.is_zero(),
            )
        } else if let Some(entry) = self.bib_entries.get(&id) {
            (
                Mapping {
                    inside: entry.inside,
                    nat: entry.nat,
                },
                entry.lifetime.is_zero(),
            )
        } else {
            return None;
        };
        if expired {
            self.remove_expired(id);
            return None;
        }
        Some(mapping)
    }

    fn remove_expired(&mut self, id: EntryId) {
        if let Some(session) = self.session_entries.remove(&id) {
            self.session_order.retain(|x| *x != id);
            self.unindex(id, session.inside, session.nat);
        } else if let Some(entry) = self.bib_entries.remove(&id) {
            self.bib_order.retain(|x| *x != id);
            self.unindex(id, entry.inside, entry.nat);
        }
    }

    fn fresh_id(&mut self) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        id
    }

    fn index(&mut self, id: EntryId, inside: InsideTuple, nat: OutsideTuple) {
        self.by_inside.insert(inside, id);
        self.by_outside.insert(nat, id);
        *self.claims.entry((nat.addr, nat.id)).or_insert(0) += 1;
    }

    // Drop the key indexes only if they still point at `id`: a newer
    // duplicate owns them otherwise.
    fn unindex(&mut self, id: EntryId, inside: InsideTuple, nat: OutsideTuple) {
        if self.by_inside.get(&inside) == Some(&id) {
            self.by_inside.remove(&inside);
        }
        if self.by_outside.get(&nat) == Some(&id) {
            self.by_outside.remove(&nat);
        }
        if let Entry::Occupied(mut claim) = self.claims.entry((nat.addr, nat.id)) {
            if *claim.get() <= 1 {
                claim.remove();
            } else {
                *claim.get_mut() -= 1;
            }
        }
    }
}
