//! Bounds-checked decoding of the headers the classifier looks at.
//!
//! Packets arrive as read from a TUN device without `IFF_NO_PI`: a 4-byte prefix (flags and
//! protocol) followed by the IP packet. Every decoder validates the buffer length before
//! exposing a field and returns a [`DecodeError`] instead of reading out of bounds.

use std::net::Ipv4Addr;

use linkdelay_common::constants::{MIN_IPV4_HEADER_LEN, TUN_PREFIX_LEN};
use linkdelay_rules::protocol;
use pnet::packet::ipv4::Ipv4Packet;

/// Offset of the protocol field inside an IPv4 header.
const IPV4_PROTOCOL_OFFSET: usize = 9;

/// TCP and UDP both start with the source and destination ports.
const PORTS_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("packet ends inside the link-layer prefix")]
    MissingPrefix,
    #[error("truncated IPv4 header")]
    TruncatedIp,
    #[error("invalid IPv4 header length of {0} words")]
    HeaderLength(u8),
    #[error("truncated transport header")]
    TruncatedTransport,
    #[error("protocol {0} has no ports")]
    NoPorts(u8),
}

/// The IPv4 header fields relevant to rule matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Header {
    pub protocol: u8,
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    /// Header length in bytes (IHL * 4).
    pub header_len: usize,
}

impl Ipv4Header {
    /// Offset of the transport header from the start of the raw buffer, prefix included.
    #[inline]
    pub const fn transport_offset(&self) -> usize {
        TUN_PREFIX_LEN + self.header_len
    }
}

/// Source and destination ports of a TCP or UDP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ports {
    pub source: u16,
    pub destination: u16,
}

/// Returns the IP version nibble of the packet following the prefix.
pub fn ip_version(packet: &[u8]) -> Result<u8, DecodeError> {
    packet.get(TUN_PREFIX_LEN).map(|b| b >> 4).ok_or(DecodeError::MissingPrefix)
}

/// Returns the byte at the IPv4 protocol offset, whatever the IP version. Used as a sanity
/// check on packets that are not IPv4.
pub fn protocol_byte(packet: &[u8]) -> Option<u8> {
    packet.get(TUN_PREFIX_LEN + IPV4_PROTOCOL_OFFSET).copied()
}

/// Decodes the IPv4 header following the prefix.
pub fn decode_ipv4(packet: &[u8]) -> Result<Ipv4Header, DecodeError> {
    let ip = packet.get(TUN_PREFIX_LEN..).ok_or(DecodeError::MissingPrefix)?;
    let header = Ipv4Packet::new(ip).ok_or(DecodeError::TruncatedIp)?;

    let words = header.get_header_length();
    let header_len = usize::from(words) * 4;
    if header_len < MIN_IPV4_HEADER_LEN {
        return Err(DecodeError::HeaderLength(words));
    }
    if header_len > ip.len() {
        return Err(DecodeError::TruncatedIp);
    }

    Ok(Ipv4Header {
        protocol: header.get_next_level_protocol().0,
        source: header.get_source(),
        destination: header.get_destination(),
        header_len,
    })
}

/// Decodes the ports of the TCP or UDP header following `ip`.
///
/// Only the leading port pair has to be present; the rest of the transport header may be
/// cut short.
pub fn decode_ports(packet: &[u8], ip: &Ipv4Header) -> Result<Ports, DecodeError> {
    if !matches!(ip.protocol, protocol::TCP | protocol::UDP) {
        return Err(DecodeError::NoPorts(ip.protocol));
    }

    let start = ip.transport_offset();
    let ports = packet
        .get(start..start + PORTS_LEN)
        .ok_or(DecodeError::TruncatedTransport)?;

    Ok(Ports {
        source: u16::from_be_bytes([ports[0], ports[1]]),
        destination: u16::from_be_bytes([ports[2], ports[3]]),
    })
}
