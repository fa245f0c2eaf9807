// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! IPv4 header type and manipulation

use crate::ip::NextHeader;
use etherparse::{IpDscp, IpEcn, Ipv4Header};
use std::net::Ipv4Addr;

/// An IPv4 header
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ipv4(pub(crate) Ipv4Header);

impl Ipv4 {
    /// The length of an IPv4 header with no options, in bytes.
    pub const MIN_LEN: usize = 20;

    /// Create a new [`Ipv4`] header from its etherparse representation.
    #[must_use]
    pub fn new(header: Ipv4Header) -> Self {
        Self(header)
    }

    /// Get the source ip address of the header
    #[must_use]
    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.source)
    }

    /// Get the destination ip address of the header
    #[must_use]
    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.destination)
    }

    /// Get the next layer protocol which follows this header.
    #[must_use]
    pub fn protocol(&self) -> NextHeader {
        NextHeader(self.0.protocol)
    }

    /// Length of the header (includes options) in bytes.
    ///
    /// <div class="warning">
    /// The returned value is in bytes (not in units of 32 bits as per the IHL field).
    /// </div>
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.0.header_len()
    }

    /// Value of the total length ip header field
    #[must_use]
    pub fn total_len(&self) -> u16 {
        self.0.total_len
    }

    /// The number of routing hops the packet is allowed to take.
    #[must_use]
    pub fn ttl(&self) -> u8 {
        self.0.time_to_live
    }

    /// The legacy type-of-service octet: DSCP in the upper six bits, ECN in
    /// the lower two. NAT64 copies this whole octet from/to the IPv6 traffic
    /// class.
    #[must_use]
    pub fn tos(&self) -> u8 {
        (self.0.dscp.value() << 2) | self.0.ecn.value()
    }

    /// Return the header's "identification" (used to correlate fragments).
    #[must_use]
    pub fn identification(&self) -> u16 {
        self.0.identification
    }

    /// Returns true if the "don't fragment" bit is set in this header.
    #[must_use]
    pub fn dont_fragment(&self) -> bool {
        self.0.dont_fragment
    }

    /// Returns true if the "more-fragments" bit is set in this header.
    #[must_use]
    pub fn more_fragments(&self) -> bool {
        self.0.more_fragments
    }

    /// The fragment offset, in units of eight bytes.
    #[must_use]
    pub fn fragment_offset(&self) -> u16 {
        self.0.fragment_offset.value()
    }

    /// The value of the header checksum field (not recomputed).
    #[must_use]
    pub fn checksum(&self) -> u16 {
        self.0.header_checksum
    }

    /// Set the source ip of the header.
    pub fn set_source(&mut self, source: Ipv4Addr) -> &mut Self {
        self.0.source = source.octets();
        self
    }

    /// Set the destination ip address for this header.
    pub fn set_destination(&mut self, dest: Ipv4Addr) -> &mut Self {
        self.0.destination = dest.octets();
        self
    }

    /// Set the header's time to live.
    pub fn set_ttl(&mut self, ttl: u8) -> &mut Self {
        self.0.time_to_live = ttl;
        self
    }

    /// Set the next layer protocol.
    pub fn set_protocol(&mut self, protocol: NextHeader) -> &mut Self {
        self.0.protocol = protocol.0;
        self
    }

    /// Set the type-of-service octet (DSCP and ECN together).
    pub fn set_tos(&mut self, tos: u8) -> &mut Self {
        self.0.dscp = IpDscp::try_new(tos >> 2).unwrap_or_else(|_| unreachable!());
        self.0.ecn = IpEcn::try_new(tos & 0b11).unwrap_or_else(|_| unreachable!());
        self
    }

    /// Set the "identification" of this packet.
    pub fn set_identification(&mut self, id: u16) -> &mut Self {
        self.0.identification = id;
        self
    }

    /// Set the "don't fragment" bit of the header
    pub fn set_dont_fragment(&mut self, dont_fragment: bool) -> &mut Self {
        self.0.dont_fragment = dont_fragment;
        self
    }

    /// Set the "more-fragments" flag
    pub fn set_more_fragments(&mut self, more_fragments: bool) -> &mut Self {
        self.0.more_fragments = more_fragments;
        self
    }

    /// Set the fragment offset (in units of eight bytes).
    ///
    /// # Errors
    ///
    /// Returns [`Ipv4FieldError::FragOffsetTooBig`] if the value does not fit
    /// in the header's 13 bits.
    pub fn set_fragment_offset(&mut self, offset: u16) -> Result<&mut Self, Ipv4FieldError> {
        self.0.fragment_offset = etherparse::IpFragOffset::try_new(offset)
            .map_err(|e| Ipv4FieldError::FragOffsetTooBig(e.actual))?;
        Ok(self)
    }

    /// Set the length _of the payload_ of the ipv4 packet, adjusting the
    /// total length field for the header's own length.
    pub fn set_payload_len(&mut self, payload_len: u16) -> &mut Self {
        #[allow(clippy::cast_possible_truncation)] // header_len is at most 60
        let total = payload_len.saturating_add(self.0.header_len() as u16);
        self.0.total_len = total;
        self
    }

    /// Recompute and store the mandatory IPv4 header checksum.
    pub fn update_checksum(&mut self) -> &mut Self {
        self.0.header_checksum = self.0.calc_header_checksum();
        self
    }
}

/// Error raised when an IPv4 header field is assigned an unrepresentable value.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Ipv4FieldError {
    /// Fragment offset exceeds 13 bits.
    #[error("fragment offset {0} too large (13 bits max)")]
    FragOffsetTooBig(u16),
}

impl From<Ipv4Header> for Ipv4 {
    fn from(header: Ipv4Header) -> Self {
        Self(header)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tos_round_trips_dscp_and_ecn() {
        let mut header = Ipv4::default();
        header.set_tos(0b1010_1110);
        assert_eq!(header.tos(), 0b1010_1110);
        header.set_tos(0);
        assert_eq!(header.tos(), 0);
    }

    #[test]
    fn checksum_changes_with_ttl() {
        let mut header = Ipv4::default();
        header
            .set_source(Ipv4Addr::new(192, 0, 2, 1))
            .set_destination(Ipv4Addr::new(203, 0, 113, 5))
            .set_ttl(64)
            .update_checksum();
        let before = header.checksum();
        header.set_ttl(63).update_checksum();
        assert_ne!(before, header.checksum());
    }
}
