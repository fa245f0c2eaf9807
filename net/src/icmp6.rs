// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! ICMPv6 header type and logic.

use etherparse::{IcmpEchoHeader, Icmpv6Header, Icmpv6Type};

/// An ICMPv6 header.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icmp6(pub(crate) Icmpv6Header);

impl Icmp6 {
    /// Create an echo request header.
    #[must_use]
    pub fn echo_request(id: u16, seq: u16) -> Self {
        Self(Icmpv6Header::new(Icmpv6Type::EchoRequest(IcmpEchoHeader {
            id,
            seq,
        })))
    }

    /// Create an echo reply header.
    #[must_use]
    pub fn echo_reply(id: u16, seq: u16) -> Self {
        Self(Icmpv6Header::new(Icmpv6Type::EchoReply(IcmpEchoHeader {
            id,
            seq,
        })))
    }

    /// For echo request/reply messages, the (identifier, sequence) pair.
    /// `None` for every other message type.
    #[must_use]
    pub fn echo(&self) -> Option<(u16, u16)> {
        match self.0.icmp_type {
            Icmpv6Type::EchoRequest(echo) | Icmpv6Type::EchoReply(echo) => {
                Some((echo.id, echo.seq))
            }
            _ => None,
        }
    }

    /// True for an echo request (as opposed to a reply).
    #[must_use]
    pub fn is_echo_request(&self) -> bool {
        matches!(self.0.icmp_type, Icmpv6Type::EchoRequest(_))
    }

    /// Replace the echo identifier, keeping the sequence number and
    /// request/reply direction. No effect on non-echo messages.
    pub fn set_echo_id(&mut self, id: u16) -> &mut Self {
        match &mut self.0.icmp_type {
            Icmpv6Type::EchoRequest(echo) | Icmpv6Type::EchoReply(echo) => echo.id = id,
            _ => {}
        }
        self
    }

    /// Length of the header in bytes.
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.0.header_len()
    }
}

impl From<Icmpv6Header> for Icmp6 {
    fn from(header: Icmpv6Header) -> Self {
        Self(header)
    }
}
