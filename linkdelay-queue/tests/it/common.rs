use std::net::Ipv4Addr;

use bytes::Bytes;
use pnet::packet::{
    ip::{IpNextHeaderProtocol, IpNextHeaderProtocols},
    ipv4::MutableIpv4Packet,
    tcp::MutableTcpPacket,
    udp::MutableUdpPacket,
};

const PREFIX_LEN: usize = 4;
const IP_HEADER_LEN: usize = 20;

pub const HOST: Ipv4Addr = Ipv4Addr::new(100, 64, 0, 2);

fn ipv4(len: usize, protocol: IpNextHeaderProtocol, src: Ipv4Addr, dst: Ipv4Addr) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    buf[2..4].copy_from_slice(&[0x08, 0x00]);

    let mut ip = MutableIpv4Packet::new(&mut buf[PREFIX_LEN..]).unwrap();
    ip.set_version(4);
    ip.set_header_length(5);
    ip.set_total_length((len - PREFIX_LEN) as u16);
    ip.set_ttl(64);
    ip.set_next_level_protocol(protocol);
    ip.set_source(src);
    ip.set_destination(dst);

    buf
}

/// A TCP segment of `len` bytes, link-layer prefix included.
pub fn tcp(src: Ipv4Addr, dst: Ipv4Addr, sport: u16, dport: u16, len: usize) -> Bytes {
    let mut buf = ipv4(len, IpNextHeaderProtocols::Tcp, src, dst);

    let mut tcp = MutableTcpPacket::new(&mut buf[PREFIX_LEN + IP_HEADER_LEN..]).unwrap();
    tcp.set_source(sport);
    tcp.set_destination(dport);
    tcp.set_data_offset(5);

    Bytes::from(buf)
}

/// A UDP datagram of `len` bytes, link-layer prefix included.
pub fn udp(src: Ipv4Addr, dst: Ipv4Addr, sport: u16, dport: u16, len: usize) -> Bytes {
    let mut buf = ipv4(len, IpNextHeaderProtocols::Udp, src, dst);

    let mut udp = MutableUdpPacket::new(&mut buf[PREFIX_LEN + IP_HEADER_LEN..]).unwrap();
    udp.set_source(sport);
    udp.set_destination(dport);
    udp.set_length((len - PREFIX_LEN - IP_HEADER_LEN) as u16);

    Bytes::from(buf)
}

/// An ICMP message of `len` bytes, link-layer prefix included.
pub fn icmp(src: Ipv4Addr, dst: Ipv4Addr, len: usize) -> Bytes {
    Bytes::from(ipv4(len, IpNextHeaderProtocols::Icmp, src, dst))
}
