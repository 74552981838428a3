//! Destinations for released packets.

use std::io;

use bytes::Bytes;

/// Something that transmits one packet per call, e.g. the file descriptor of a TUN device.
pub trait PacketSink {
    /// Writes a single packet. Implementations must not merge or split packets.
    fn write_packet(&mut self, packet: &[u8]) -> io::Result<()>;
}

impl<W: io::Write> PacketSink for W {
    fn write_packet(&mut self, packet: &[u8]) -> io::Result<()> {
        // `write_all` returns without calling `write` for an empty buffer.
        if packet.is_empty() {
            return self.write(packet).map(drop);
        }
        self.write_all(packet)
    }
}

/// Keeps every released packet in memory, preserving packet boundaries.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    packets: Vec<Bytes>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The packets written so far, in write order.
    pub fn packets(&self) -> &[Bytes] {
        &self.packets
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    pub fn into_packets(self) -> Vec<Bytes> {
        self.packets
    }
}

impl io::Write for CollectingSink {
    /// Every call is one packet.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.packets.push(Bytes::copy_from_slice(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
