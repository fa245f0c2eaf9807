// SPDX-License-Identifier: Apache-2.0
// Copyright NAT64 Gateway Authors

//! Owned packet representation: one network header, an optional transport
//! header, fragmentation metadata, and the remaining payload bytes.
//!
//! Parsing normalizes the IPv6 fragmentation extension: after a successful
//! parse the [`Ipv6`] header's next-header field always names the transported
//! protocol, and [`Packet::serialize`] re-inserts the extension header from
//! the [`FragInfo`] when present.

use crate::headers::{FragInfo, Net, Transport};
use crate::icmp4::Icmp4;
use crate::icmp6::Icmp6;
use crate::ip::NextHeader;
use crate::ipv4::Ipv4;
use crate::ipv6::Ipv6;
use crate::tcp::Tcp;
use crate::udp::Udp;
use etherparse::{
    Icmpv4Header, Icmpv6Header, IpFragOffset, IpNumber, Ipv4Header, Ipv6FragmentHeader,
    Ipv6Header, TcpHeader, UdpHeader,
};
use tracing::debug;

/// Errors raised while parsing a packet from wire bytes.
///
/// All of them describe an internally inconsistent or truncated header; the
/// dispatcher maps every one of them to a drop.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Buffer too short to hold any IP header.
    #[error("packet truncated ({0} bytes)")]
    Truncated(usize),
    /// The version nibble is neither 4 nor 6.
    #[error("unsupported IP version {0}")]
    BadVersion(u8),
    /// The IPv4 header failed to decode.
    #[error("invalid IPv4 header: {0}")]
    BadIpv4(etherparse::err::ipv4::HeaderSliceError),
    /// The IPv6 header failed to decode.
    #[error("invalid IPv6 header: {0}")]
    BadIpv6(etherparse::err::ipv6::HeaderSliceError),
    /// A transport or extension header failed to decode.
    #[error("invalid transport header")]
    BadTransport,
    /// A length field disagrees with the buffer.
    #[error("length field inconsistent with buffer")]
    LengthMismatch,
}

/// A parsed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    net: Net,
    transport: Option<Transport>,
    frag: Option<FragInfo>,
    payload: Vec<u8>,
}

impl Packet {
    /// Assemble a packet from its parts (used by builders and the rewrite
    /// stage; wire input goes through [`Packet::parse`]).
    #[must_use]
    pub fn new(
        net: Net,
        transport: Option<Transport>,
        frag: Option<FragInfo>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            net,
            transport,
            frag,
            payload,
        }
    }

    /// Parse a packet from wire bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] describing the first inconsistency found.
    pub fn parse(buf: &[u8]) -> Result<Self, ParseError> {
        let version = buf.first().ok_or(ParseError::Truncated(0))? >> 4;
        match version {
            4 => Self::parse_v4(buf),
            6 => Self::parse_v6(buf),
            other => Err(ParseError::BadVersion(other)),
        }
    }

    fn parse_v4(buf: &[u8]) -> Result<Self, ParseError> {
        let (header, _) = Ipv4Header::from_slice(buf).map_err(ParseError::BadIpv4)?;
        let header_len = header.header_len();
        let total_len = usize::from(header.total_len);
        if total_len < header_len || total_len > buf.len() {
            return Err(ParseError::LengthMismatch);
        }
        let l4 = &buf[header_len..total_len];

        let frag = (header.fragment_offset.value() > 0 || header.more_fragments).then(|| {
            FragInfo {
                ident: u32::from(header.identification),
                offset: header.fragment_offset.value(),
                more: header.more_fragments,
            }
        });

        let (transport, payload) = if frag.is_some_and(|f| !f.is_first()) {
            (None, l4.to_vec())
        } else {
            Self::parse_transport(NextHeader(header.protocol), l4)?
        };

        Ok(Self {
            net: Net::Ipv4(Ipv4::new(header)),
            transport,
            frag,
            payload,
        })
    }

    fn parse_v6(buf: &[u8]) -> Result<Self, ParseError> {
        let (mut header, rest) = Ipv6Header::from_slice(buf).map_err(ParseError::BadIpv6)?;
        let payload_len = usize::from(header.payload_length);
        if payload_len > rest.len() {
            return Err(ParseError::LengthMismatch);
        }
        let mut l4 = &rest[..payload_len];

        let mut frag = None;
        if header.next_header == IpNumber::IPV6_FRAGMENTATION_HEADER {
            let (ext, after) = Ipv6FragmentHeader::from_slice(l4).map_err(|e| {
                debug!("failed to parse fragment extension: {e:?}");
                ParseError::BadTransport
            })?;
            frag = Some(FragInfo {
                ident: ext.identification,
                offset: ext.fragment_offset.value(),
                more: ext.more_fragments,
            });
            // Normalize: the header we keep names the transported protocol,
            // the extension is re-synthesized on serialize.
            header.next_header = ext.next_header;
            l4 = after;
        }

        let (transport, payload) = if frag.is_some_and(|f| !f.is_first()) {
            (None, l4.to_vec())
        } else {
            Self::parse_transport(NextHeader(header.next_header), l4)?
        };

        Ok(Self {
            net: Net::Ipv6(Ipv6::new(header)),
            transport,
            frag,
            payload,
        })
    }

    fn parse_transport(
        proto: NextHeader,
        l4: &[u8],
    ) -> Result<(Option<Transport>, Vec<u8>), ParseError> {
        let bad = |e: &dyn std::fmt::Debug| {
            debug!("failed to parse transport header: {e:?}");
            ParseError::BadTransport
        };
        match proto {
            NextHeader::TCP => {
                let (tcp, rest) = TcpHeader::from_slice(l4).map_err(|e| bad(&e))?;
                Ok((Some(Transport::Tcp(Tcp::new(tcp))), rest.to_vec()))
            }
            NextHeader::UDP => {
                let (udp, rest) = UdpHeader::from_slice(l4).map_err(|e| bad(&e))?;
                Ok((Some(Transport::Udp(Udp::new(udp))), rest.to_vec()))
            }
            NextHeader::ICMP => {
                let (icmp, rest) = Icmpv4Header::from_slice(l4).map_err(|e| bad(&e))?;
                Ok((Some(Transport::Icmp4(Icmp4::from(icmp))), rest.to_vec()))
            }
            NextHeader::ICMP6 => {
                let (icmp, rest) = Icmpv6Header::from_slice(l4).map_err(|e| bad(&e))?;
                Ok((Some(Transport::Icmp6(Icmp6::from(icmp))), rest.to_vec()))
            }
            _ => Ok((None, l4.to_vec())),
        }
    }

    /// The network-layer header.
    #[must_use]
    pub fn net(&self) -> &Net {
        &self.net
    }

    /// The transport-layer header, if one was present and supported.
    #[must_use]
    pub fn transport(&self) -> Option<&Transport> {
        self.transport.as_ref()
    }

    /// Fragmentation metadata, if the packet is (part of) a fragmented
    /// datagram.
    #[must_use]
    pub fn frag(&self) -> Option<FragInfo> {
        self.frag
    }

    /// The payload bytes after the transport header (or after the IP and
    /// extension headers when no transport header is present).
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Length of the transport header plus payload.
    #[must_use]
    pub fn l4_len(&self) -> usize {
        self.transport.as_ref().map_or(0, Transport::header_len) + self.payload.len()
    }

    /// Replace the headers in one go: the rewrite stage of translation.
    pub fn set_headers(
        &mut self,
        net: Net,
        transport: Option<Transport>,
        frag: Option<FragInfo>,
    ) {
        self.net = net;
        self.transport = transport;
        self.frag = frag;
    }

    /// Recompute the length fields from the actual payload: IPv4 total
    /// length, IPv6 payload length (extension header included), and the UDP
    /// length field for unfragmented datagrams (a fragment's UDP length
    /// describes the original datagram and must not be touched).
    pub fn fix_lengths(&mut self) {
        #[allow(clippy::cast_possible_truncation)] // wire lengths fit u16
        let l4_len = self.l4_len() as u16;
        match &mut self.net {
            Net::Ipv4(ip) => {
                ip.set_payload_len(l4_len);
            }
            Net::Ipv6(ip) => {
                let ext = if self.frag.is_some() { 8 } else { 0 };
                ip.set_payload_length(l4_len + ext);
            }
        }
        if self.frag.is_none()
            && let Some(Transport::Udp(udp)) = &mut self.transport
        {
            #[allow(clippy::cast_possible_truncation)]
            udp.set_length(Udp::LEN as u16 + self.payload.len() as u16);
        }
    }

    /// Recompute checksums: the IPv4 header checksum always, and the full
    /// transport checksum when the packet is not a fragment (a fragment's
    /// transport checksum covers bytes we do not hold; the translator adjusts
    /// it incrementally instead).
    pub fn update_checksums(&mut self) {
        if let Net::Ipv4(ip) = &mut self.net {
            ip.update_checksum();
        }
        if self.frag.is_some_and(|f| f.more || f.offset > 0) {
            return;
        }
        match (&self.net, &mut self.transport) {
            (Net::Ipv4(ip), Some(Transport::Tcp(tcp))) => {
                tcp.0.checksum = tcp
                    .0
                    .calc_checksum_ipv4(&ip.0, &self.payload)
                    .unwrap_or_else(|_| unreachable!());
            }
            (Net::Ipv4(ip), Some(Transport::Udp(udp))) => {
                udp.0.checksum = udp
                    .0
                    .calc_checksum_ipv4(&ip.0, &self.payload)
                    .unwrap_or_else(|_| unreachable!());
            }
            (Net::Ipv4(_), Some(Transport::Icmp4(icmp))) => {
                icmp.0.checksum = icmp.0.icmp_type.calc_checksum(&self.payload);
            }
            (Net::Ipv6(ip), Some(Transport::Tcp(tcp))) => {
                tcp.0.checksum = tcp
                    .0
                    .calc_checksum_ipv6(&ip.0, &self.payload)
                    .unwrap_or_else(|_| unreachable!());
            }
            (Net::Ipv6(ip), Some(Transport::Udp(udp))) => {
                udp.0.checksum = udp
                    .0
                    .calc_checksum_ipv6(&ip.0, &self.payload)
                    .unwrap_or_else(|_| unreachable!());
            }
            (Net::Ipv6(ip), Some(Transport::Icmp6(icmp))) => {
                icmp.0.checksum = icmp
                    .0
                    .icmp_type
                    .calc_checksum(ip.0.source, ip.0.destination, &self.payload)
                    .unwrap_or_else(|_| unreachable!());
            }
            _ => {}
        }
    }

    /// Serialize back to wire bytes, re-inserting the IPv6 fragmentation
    /// extension header when the packet carries fragment metadata.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Ipv6::LEN + 8 + self.l4_len());
        match &self.net {
            Net::Ipv4(ip) => {
                out.extend_from_slice(&ip.0.to_bytes());
            }
            Net::Ipv6(ip) => {
                if let Some(frag) = self.frag {
                    let mut header = ip.0.clone();
                    header.next_header = IpNumber::IPV6_FRAGMENTATION_HEADER;
                    out.extend_from_slice(&header.to_bytes());
                    let ext = Ipv6FragmentHeader {
                        next_header: ip.0.next_header,
                        fragment_offset: IpFragOffset::try_new(frag.offset)
                            .unwrap_or_else(|_| unreachable!()),
                        more_fragments: frag.more,
                        identification: frag.ident,
                    };
                    out.extend_from_slice(&ext.to_bytes());
                } else {
                    out.extend_from_slice(&ip.0.to_bytes());
                }
            }
        }
        match &self.transport {
            Some(Transport::Tcp(tcp)) => out.extend_from_slice(&tcp.0.to_bytes()),
            Some(Transport::Udp(udp)) => out.extend_from_slice(&udp.0.to_bytes()),
            Some(Transport::Icmp4(icmp)) => out.extend_from_slice(&icmp.0.to_bytes()),
            Some(Transport::Icmp6(icmp)) => out.extend_from_slice(&icmp.0.to_bytes()),
            None => {}
        }
        out.extend_from_slice(&self.payload);
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::{build_udp_v4, build_udp_v6};
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::str::FromStr;

    #[test]
    fn parse_back_udp_v4() {
        let packet = build_udp_v4(
            Ipv4Addr::new(192, 0, 2, 1),
            1234,
            Ipv4Addr::new(203, 0, 113, 5),
            53,
            b"hello".to_vec(),
        );
        let bytes = packet.serialize();
        let parsed = Packet::parse(&bytes).expect("parse failed");
        assert_eq!(parsed, packet);
    }

    #[test]
    fn parse_back_udp_v6() {
        let packet = build_udp_v6(
            Ipv6Addr::from_str("2001:db8::1").unwrap(),
            1234,
            Ipv6Addr::from_str("64:ff9b::cb00:7105").unwrap(),
            53,
            b"hello".to_vec(),
        );
        let bytes = packet.serialize();
        let parsed = Packet::parse(&bytes).expect("parse failed");
        assert_eq!(parsed, packet);
    }

    #[test]
    fn v6_fragment_extension_is_normalized() {
        let packet = crate::test_utils::build_v6_fragment(
            Ipv6Addr::from_str("2001:db8::1").unwrap(),
            Ipv6Addr::from_str("64:ff9b::cb00:7105").unwrap(),
            0xdead_beef,
            185,
            true,
            vec![0u8; 64],
        );
        let bytes = packet.serialize();
        let parsed = Packet::parse(&bytes).expect("parse failed");
        let frag = parsed.frag().expect("fragment info lost");
        assert_eq!(frag.ident, 0xdead_beef);
        assert_eq!(frag.offset, 185);
        assert!(frag.more);
        // next-header normalized to the transported protocol
        assert_eq!(parsed.net().next_header(), NextHeader::UDP);
        assert!(parsed.transport().is_none());
    }

    #[test]
    fn truncated_and_bad_version_are_rejected() {
        assert!(matches!(Packet::parse(&[]), Err(ParseError::Truncated(0))));
        assert!(matches!(
            Packet::parse(&[0x50u8; 40]),
            Err(ParseError::BadVersion(5))
        ));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let packet = build_udp_v4(
            Ipv4Addr::new(192, 0, 2, 1),
            1234,
            Ipv4Addr::new(203, 0, 113, 5),
            53,
            b"hello".to_vec(),
        );
        let mut bytes = packet.serialize();
        bytes.truncate(bytes.len() - 3); // total_len now exceeds the buffer
        assert!(matches!(
            Packet::parse(&bytes),
            Err(ParseError::LengthMismatch)
        ));
    }
}
