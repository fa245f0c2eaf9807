// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Helper types which are common between IPv4 and IPv6

use etherparse::IpNumber;
use std::fmt::{Display, Formatter};

/// Thin wrapper around [`IpNumber`].
///
/// In an IPv4 header this value is called "protocol"; in an IPv6 header it is
/// "next header". Both families use the same number space, which is what
/// makes the NAT64 protocol mapping mostly a copy.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NextHeader(pub(crate) IpNumber);

impl NextHeader {
    /// TCP (protocol number 6)
    pub const TCP: NextHeader = NextHeader(IpNumber::TCP);
    /// UDP (protocol number 17)
    pub const UDP: NextHeader = NextHeader(IpNumber::UDP);
    /// ICMP for IPv4 (protocol number 1)
    pub const ICMP: NextHeader = NextHeader(IpNumber::ICMP);
    /// ICMPv6 (protocol number 58)
    pub const ICMP6: NextHeader = NextHeader(IpNumber::IPV6_ICMP);
    /// The IPv6 fragmentation extension header (protocol number 44)
    pub const IPV6_FRAG: NextHeader = NextHeader(IpNumber::IPV6_FRAGMENTATION_HEADER);

    /// Generate a new [`NextHeader`]
    #[must_use]
    pub fn new(inner: u8) -> Self {
        Self(IpNumber::from(inner))
    }

    /// Return the [`NextHeader`] represented as a `u8`
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0.0
    }
}

impl From<NextHeader> for IpNumber {
    fn from(value: NextHeader) -> Self {
        value.0
    }
}

impl From<IpNumber> for NextHeader {
    fn from(value: IpNumber) -> Self {
        Self(value)
    }
}

impl Display for NextHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            IpNumber::TCP => write!(f, "TCP"),
            IpNumber::UDP => write!(f, "UDP"),
            IpNumber::ICMP => write!(f, "ICMP"),
            IpNumber::IPV6_ICMP => write!(f, "ICMPv6"),
            other => write!(f, "proto({})", other.0),
        }
    }
}
