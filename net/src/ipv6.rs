// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! IPv6 header type and manipulation

use crate::ip::NextHeader;
use etherparse::{Ipv6FlowLabel, Ipv6Header};
use std::net::Ipv6Addr;

/// An IPv6 header
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ipv6(pub(crate) Ipv6Header);

impl Ipv6 {
    /// The (fixed) length of an [`Ipv6`] header in bytes.
    pub const LEN: usize = 40;

    /// Create a new [`Ipv6`] header from its etherparse representation.
    #[must_use]
    pub fn new(header: Ipv6Header) -> Self {
        Self(header)
    }

    /// Get the source [`Ipv6Addr`] for this header
    #[must_use]
    pub fn source(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.0.source)
    }

    /// Get the destination [`Ipv6Addr`] for this header
    #[must_use]
    pub fn destination(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.0.destination)
    }

    /// Get the type of the next header.
    #[must_use]
    pub fn next_header(&self) -> NextHeader {
        NextHeader(self.0.next_header)
    }

    /// Get the hop limit for this header (analogous to [`crate::ipv4::Ipv4::ttl`])
    #[must_use]
    pub fn hop_limit(&self) -> u8 {
        self.0.hop_limit
    }

    /// Get the traffic class for this header
    #[must_use]
    pub fn traffic_class(&self) -> u8 {
        self.0.traffic_class
    }

    /// Get this header's flow label as a raw value.
    #[must_use]
    pub fn flow_label(&self) -> u32 {
        self.0.flow_label.value()
    }

    /// Value of the payload length field (everything after the fixed header,
    /// extension headers included).
    #[must_use]
    pub fn payload_length(&self) -> u16 {
        self.0.payload_length
    }

    /// Set the source ip address of this header
    pub fn set_source(&mut self, source: Ipv6Addr) -> &mut Self {
        self.0.source = source.octets();
        self
    }

    /// Set the destination ip address of this header
    pub fn set_destination(&mut self, destination: Ipv6Addr) -> &mut Self {
        self.0.destination = destination.octets();
        self
    }

    /// Set the hop limit for this header
    pub fn set_hop_limit(&mut self, hop_limit: u8) -> &mut Self {
        self.0.hop_limit = hop_limit;
        self
    }

    /// Set the traffic class for this header
    pub fn set_traffic_class(&mut self, traffic_class: u8) -> &mut Self {
        self.0.traffic_class = traffic_class;
        self
    }

    /// Set this header's flow label. Values above 20 bits are truncated.
    pub fn set_flow_label(&mut self, flow_label: u32) -> &mut Self {
        self.0.flow_label = Ipv6FlowLabel::try_new(flow_label & 0x000F_FFFF)
            .unwrap_or_else(|_| unreachable!());
        self
    }

    /// Set the next header type.
    pub fn set_next_header(&mut self, next_header: NextHeader) -> &mut Self {
        self.0.next_header = next_header.0;
        self
    }

    /// Set the payload length field.
    pub fn set_payload_length(&mut self, length: u16) -> &mut Self {
        self.0.payload_length = length;
        self
    }
}

impl From<Ipv6Header> for Ipv6 {
    fn from(header: Ipv6Header) -> Self {
        Self(header)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flow_label_truncated_to_twenty_bits() {
        let mut header = Ipv6::default();
        header.set_flow_label(u32::MAX);
        assert_eq!(header.flow_label(), 0x000F_FFFF);
    }
}
