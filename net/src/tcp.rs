// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! TCP header type and manipulation

use etherparse::TcpHeader;

/// A TCP header
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tcp(pub(crate) TcpHeader);

impl Tcp {
    /// Create a new [`Tcp`] header from its etherparse representation.
    #[must_use]
    pub fn new(header: TcpHeader) -> Self {
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

    /// Length of the header (options included) in bytes.
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.0.header_len()
    }

    /// The value of the checksum field (not recomputed).
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
}

impl From<TcpHeader> for Tcp {
    fn from(header: TcpHeader) -> Self {
        Self(header)
    }
}
