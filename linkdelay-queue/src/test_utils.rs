//! Raw packet builders for unit tests.

use std::net::Ipv4Addr;

use linkdelay_rules::protocol;

/// TUN prefix announcing an IPv4 payload.
const PREFIX: [u8; 4] = [0x00, 0x00, 0x08, 0x00];

/// Prefix + IPv4 header of `words` 32-bit words (at least 20 bytes are always written),
/// followed by `payload_len` zero bytes.
pub(crate) fn ipv4_packet(
    protocol: u8,
    src: Ipv4Addr,
    dst: Ipv4Addr,
    words: u8,
    payload_len: usize,
) -> Vec<u8> {
    let header_len = (usize::from(words) * 4).max(20);
    let total = (header_len + payload_len) as u16;

    let mut packet = PREFIX.to_vec();
    packet.push(0x40 | (words & 0x0f));
    packet.push(0);
    packet.extend_from_slice(&total.to_be_bytes());
    packet.extend_from_slice(&[0, 0, 0x40, 0]);
    packet.push(64);
    packet.push(protocol);
    packet.extend_from_slice(&[0, 0]);
    packet.extend_from_slice(&src.octets());
    packet.extend_from_slice(&dst.octets());
    packet.resize(PREFIX.len() + header_len + payload_len, 0);
    packet
}

/// A TCP segment whose raw buffer (prefix included) is `len` bytes long. `len` must be at
/// least 44.
pub(crate) fn tcp_packet(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    sport: u16,
    dport: u16,
    len: usize,
) -> Vec<u8> {
    let mut packet = ipv4_packet(protocol::TCP, src, dst, 5, 0);
    packet.extend_from_slice(&sport.to_be_bytes());
    packet.extend_from_slice(&dport.to_be_bytes());
    packet.extend_from_slice(&[0; 8]);
    packet.push(0x50);
    packet.push(0x18);
    packet.extend_from_slice(&[0xff, 0xff, 0, 0, 0, 0]);
    assert!(len >= packet.len(), "tcp packet needs at least {} bytes", packet.len());
    packet.resize(len, 0);
    packet
}

/// A UDP datagram whose raw buffer (prefix included) is `len` bytes long. `len` must be at
/// least 32.
pub(crate) fn udp_packet(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    sport: u16,
    dport: u16,
    len: usize,
) -> Vec<u8> {
    let mut packet = ipv4_packet(protocol::UDP, src, dst, 5, 0);
    packet.extend_from_slice(&sport.to_be_bytes());
    packet.extend_from_slice(&dport.to_be_bytes());
    packet.extend_from_slice(&((len - 24) as u16).to_be_bytes());
    packet.extend_from_slice(&[0, 0]);
    assert!(len >= packet.len(), "udp packet needs at least {} bytes", packet.len());
    packet.resize(len, 0);
    packet
}

/// A minimal IPv6 packet carrying TCP, `len` bytes including the prefix (at least 48).
///
/// The byte at the IPv4 protocol offset (inside the IPv6 source address) is 6.
pub(crate) fn ipv6_packet(len: usize) -> Vec<u8> {
    let len = len.max(48);
    let mut packet = vec![0x00, 0x00, 0x86, 0xdd, 0x60, 0, 0, 0];
    packet.extend_from_slice(&((len - 44) as u16).to_be_bytes());
    packet.push(protocol::TCP);
    packet.push(64);
    packet.resize(len, 0);
    packet[4 + 9] = protocol::TCP;
    packet
}
