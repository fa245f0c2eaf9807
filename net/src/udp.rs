// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! UDP header type and manipulation

use etherparse::UdpHeader;

/// A UDP header
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Udp(pub(crate) UdpHeader);

impl Udp {
    /// The length of a UDP header in bytes.
    pub const LEN: usize = 8;

    /// Create a new [`Udp`] header from its etherparse representation.
    #[must_use]
    pub fn new(header: UdpHeader) -> Self {
        Self(header)
    }

    /// Get the source port of the header.
    #[must_use]
    pub fn source(&self) -> u16 {
        self.0.source_port
    }

    /// Get the destination port of the header.
    #[must_use]
    pub fn destination(&self) -> u16 {
        self.0.destination_port
    }

    /// Value of the UDP length field (header plus payload).
    #[must_use]
    pub fn length(&self) -> u16 {
        self.0.length
    }

    /// The value of the checksum field (not recomputed). Zero means the
    /// sender did not compute one (allowed over IPv4 only).
    #[must_use]
    pub fn checksum(&self) -> u16 {
        self.0.checksum
    }

    /// Set the source port of the header.
    pub fn set_source(&mut self, port: u16) -> &mut Self {
        self.0.source_port = port;
        self
    }

    /// Store a checksum computed (or adjusted) by the caller.
    pub fn set_checksum(&mut self, checksum: u16) -> &mut Self {
        self.0.checksum = checksum;
        self
    }

    /// Set the destination port of the header.
    pub fn set_destination(&mut self, port: u16) -> &mut Self {
        self.0.destination_port = port;
        self
    }

    /// Set the UDP length field (header plus payload).
    pub fn set_length(&mut self, length: u16) -> &mut Self {
        self.0.length = length;
        self
    }
}

impl From<UdpHeader> for Udp {
    fn from(header: UdpHeader) -> Self {
        Self(header)
    }
}
