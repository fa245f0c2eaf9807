// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Outside-port allocation.

use crate::errors::{ConfigError, Nat64Error};
use crate::port::NatPort;
use tracing::debug;

/// Hands out ports from an inclusive range, rotating a cursor so consecutive
/// flows get consecutive ports and freed ports are eventually reused.
///
/// The allocator holds no claim state of its own: the caller supplies a view
/// of the ports currently claimed in the binding table, so exhaustion is
/// always judged against live table state.
#[derive(Debug, Clone, Default)]
pub struct PortAllocator {
    start: u16,
    end: u16,
    next: u16,
    configured: bool,
}

impl PortAllocator {
    /// Configure the inclusive port range `[start, end]`.
    ///
    /// Reconfiguring resets the rotation cursor to `start`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPortRange`] if the range is reversed or
    /// includes port zero.
    pub fn configure(&mut self, start: u16, end: u16) -> Result<(), ConfigError> {
        if start == 0 || start > end {
            return Err(ConfigError::InvalidPortRange { start, end });
        }
        debug!("port pool configured: {start}..={end}");
        self.start = start;
        self.end = end;
        self.next = start;
        self.configured = true;
        Ok(())
    }

    /// Whether [`PortAllocator::configure`] has been called successfully.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Allocate the next unclaimed port.
    ///
    /// Scans from the cursor, wrapping at the end of the range, and skips
    /// every port for which `claimed` returns true. The cursor only advances
    /// on success, so a failed allocation leaves the allocator untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Nat64Error::AddressPoolExhausted`] once every port in the
    /// range has been tried in this call, or if the allocator was never
    /// configured.
    pub fn allocate(&mut self, claimed: impl Fn(u16) -> bool) -> Result<NatPort, Nat64Error> {
        if !self.configured {
            return Err(Nat64Error::AddressPoolExhausted);
        }
        let range_len = usize::from(self.end - self.start) + 1;
        let mut candidate = self.next;
        for _ in 0..range_len {
            if claimed(candidate) {
                candidate = self.successor(candidate);
                continue;
            }
            self.next = self.successor(candidate);
            return Ok(NatPort::new_checked(candidate).unwrap_or_else(|_| unreachable!()));
        }
        Err(Nat64Error::AddressPoolExhausted)
    }

    fn successor(&self, port: u16) -> u16 {
        if port == self.end { self.start } else { port + 1 }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn rejects_bad_ranges() {
        let mut alloc = PortAllocator::default();
        assert_eq!(
            alloc.configure(0, 10),
            Err(ConfigError::InvalidPortRange { start: 0, end: 10 })
        );
        assert_eq!(
            alloc.configure(20, 10),
            Err(ConfigError::InvalidPortRange { start: 20, end: 10 })
        );
        assert!(!alloc.is_configured());
        assert_eq!(
            alloc.allocate(|_| false),
            Err(Nat64Error::AddressPoolExhausted)
        );
    }

    #[test]
    fn issues_the_whole_range_in_order_then_fails() {
        let mut alloc = PortAllocator::default();
        alloc.configure(10_000, 10_500).expect("valid range");
        let mut claimed = BTreeSet::new();
        for expected in 10_000..=10_500u16 {
            let port = alloc
                .allocate(|p| claimed.contains(&p))
                .expect("pool not yet exhausted");
            assert_eq!(port.as_u16(), expected);
            claimed.insert(port.as_u16());
        }
        assert_eq!(claimed.len(), 501);
        assert_eq!(
            alloc.allocate(|p| claimed.contains(&p)),
            Err(Nat64Error::AddressPoolExhausted)
        );
    }

    #[test]
    fn skips_preclaimed_ports() {
        let mut alloc = PortAllocator::default();
        alloc.configure(10_000, 10_004).expect("valid range");
        let statically_claimed = [10_001u16, 10_002];
        let mut issued = Vec::new();
        while let Ok(port) =
            alloc.allocate(|p| statically_claimed.contains(&p) || issued.contains(&p.into()))
        {
            issued.push(u32::from(port.as_u16()));
        }
        assert_eq!(issued, vec![10_000, 10_003, 10_004]);
    }

    #[test]
    fn wraps_around_to_reuse_freed_ports() {
        let mut alloc = PortAllocator::default();
        alloc.configure(1000, 1002).expect("valid range");
        let mut claimed = BTreeSet::new();
        for _ in 0..3 {
            let port = alloc.allocate(|p| claimed.contains(&p)).expect("free port");
            claimed.insert(port.as_u16());
        }
        // free the middle port; the cursor is back at 1000 so the scan must
        // skip the still-claimed neighbors
        claimed.remove(&1001);
        let port = alloc.allocate(|p| claimed.contains(&p)).expect("freed port");
        assert_eq!(port.as_u16(), 1001);
    }

    #[test]
    fn failed_allocation_leaves_cursor_alone() {
        let mut alloc = PortAllocator::default();
        alloc.configure(2000, 2001).expect("valid range");
        assert_eq!(
            alloc.allocate(|_| true),
            Err(Nat64Error::AddressPoolExhausted)
        );
        let port = alloc.allocate(|_| false).expect("free port");
        assert_eq!(port.as_u16(), 2000);
    }
}
