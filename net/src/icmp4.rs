// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! ICMPv4 header type and logic.

use etherparse::{IcmpEchoHeader, Icmpv4Header, Icmpv4Type};

/// An ICMPv4 header.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Icmp4(pub(crate) Icmpv4Header);

impl Icmp4 {
    /// Create an echo request header.
    #[must_use]
    pub fn echo_request(id: u16, seq: u16) -> Self {
        Self(Icmpv4Header::new(Icmpv4Type::EchoRequest(IcmpEchoHeader {
            id,
            seq,
        })))
    }

    /// Create an echo reply header.
    #[must_use]
    pub fn echo_reply(id: u16, seq: u16) -> Self {
        Self(Icmpv4Header::new(Icmpv4Type::EchoReply(IcmpEchoHeader {
            id,
            seq,
        })))
    }

    /// For echo request/reply messages, the (identifier, sequence) pair.
    /// `None` for every other message type.
    #[must_use]
    pub fn echo(&self) -> Option<(u16, u16)> {
        match self.0.icmp_type {
            Icmpv4Type::EchoRequest(echo) | Icmpv4Type::EchoReply(echo) => {
                Some((echo.id, echo.seq))
            }
            _ => None,
        }
    }

    /// True for an echo request (as opposed to a reply).
    #[must_use]
    pub fn is_echo_request(&self) -> bool {
        matches!(self.0.icmp_type, Icmpv4Type::EchoRequest(_))
    }

    /// Replace the echo identifier, keeping the sequence number and
    /// request/reply direction. No effect on non-echo messages.
    pub fn set_echo_id(&mut self, id: u16) -> &mut Self {
        match &mut self.0.icmp_type {
            Icmpv4Type::EchoRequest(echo) | Icmpv4Type::EchoReply(echo) => echo.id = id,
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

impl From<Icmpv4Header> for Icmp4 {
    fn from(header: Icmpv4Header) -> Self {
        Self(header)
    }
}
