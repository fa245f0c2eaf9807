// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]

//! # Packet Hook Dispatch
//!
//! This crate provides the netfilter-style hook machinery the translation
//! engine plugs into: interception points in the forwarding path
//! ([`HookPoint`]), a [`Hook`] trait for packet inspectors, the [`Verdict`]s
//! they return, and a [`HookChain`] that runs registered hooks in priority
//! order.
//!
//! A hook is anything that implements [`Hook`] over a packet type `P`. The
//! chain is generic over `P` so it can be tested without real packets.
//!
//! ```rust
//! use nat64_netfilter::{Hook, HookChain, HookContext, HookPoint, Verdict};
//!
//! struct DropAll;
//!
//! impl Hook<u32> for DropAll {
//!     fn inspect(&mut self, _ctx: HookContext, _packet: &mut u32) -> Verdict {
//!         Verdict::Drop
//!     }
//! }
//!
//! let mut chain = HookChain::new();
//! chain.register(HookPoint::PreRouting, 0, DropAll);
//! let ctx = HookContext::new(HookPoint::PreRouting, None, None);
//! assert_eq!(chain.dispatch(ctx, &mut 0), Verdict::Drop);
//! ```

mod chain;

pub use chain::HookChain;

use std::fmt::{Display, Formatter};

/// An opaque identifier for a network interface.
///
/// The dispatcher does not own interface state; callers assign identifiers
/// and hooks compare them against the ones they were configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(u32);

impl InterfaceId {
    /// Create an interface id from a raw index.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw interface index.
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl Display for InterfaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// The interception points at which hooks can be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// A packet has been received on some interface and has not been routed
    /// yet.
    PreRouting,
    /// A routing decision has been made and the packet is about to leave on
    /// its output interface.
    PostRouting,
}

impl Display for HookPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HookPoint::PreRouting => write!(f, "prerouting"),
            HookPoint::PostRouting => write!(f, "postrouting"),
        }
    }
}

/// What a hook decided about a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Let the packet continue to the next hook (and, past the last hook, to
    /// the forwarding path).
    Accept,
    /// Discard the packet.
    Drop,
    /// The hook took ownership of the packet; the caller must not forward it.
    Stolen,
    /// Hand the packet to a userspace queue.
    Queue,
    /// Re-run the same hook on the (possibly rewritten) packet.
    Repeat,
}

/// Per-invocation context passed to hooks: the hook point being traversed
/// and the interfaces involved, where known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookContext {
    /// The hook point being traversed.
    pub hook: HookPoint,
    /// The interface the packet arrived on, if known.
    pub in_if: Option<InterfaceId>,
    /// The interface the packet will leave on, if already decided.
    pub out_if: Option<InterfaceId>,
}

impl HookContext {
    /// Assemble a context for one traversal.
    #[must_use]
    pub fn new(hook: HookPoint, in_if: Option<InterfaceId>, out_if: Option<InterfaceId>) -> Self {
        Self { hook, in_if, out_if }
    }
}

/// A packet inspector attached to a [`HookChain`].
pub trait Hook<P> {
    /// Inspect (and possibly rewrite) a packet traversing a hook point.
    fn inspect(&mut self, ctx: HookContext, packet: &mut P) -> Verdict;
}
