use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

use bytes::Bytes;
use linkdelay_common::{Clock, PacketSink};

use crate::{Error, Result};

/// Wait reported when nothing is scheduled.
pub const IDLE_WAIT: Duration = Duration::from_millis(u16::MAX as u64);

/// A packet waiting for its release time. Ordered only by release time, earliest first.
#[derive(Debug, Clone)]
pub struct PendingPacket {
    /// Absolute release timestamp in milliseconds.
    pub release_at: u64,
    pub payload: Bytes,
}

impl PartialEq for PendingPacket {
    fn eq(&self, other: &Self) -> bool {
        self.release_at == other.release_at
    }
}

impl Eq for PendingPacket {}

impl Ord for PendingPacket {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: `BinaryHeap` is a max-heap.
        other.release_at.cmp(&self.release_at)
    }
}

impl PartialOrd for PendingPacket {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Min-heap of packets keyed by release time. Packets with equal release times come out in
/// no particular order.
#[derive(Debug, Clone, Default)]
pub struct ReleaseHeap {
    heap: BinaryHeap<PendingPacket>,
}

impl ReleaseHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, release_at: u64, payload: Bytes) {
        self.heap.push(PendingPacket { release_at, payload });
    }

    /// Release time of the earliest packet.
    pub fn next_release(&self) -> Option<u64> {
        self.heap.peek().map(|packet| packet.release_at)
    }

    /// Pops the earliest packet if it is due at `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<PendingPacket> {
        if self.next_release()? <= now {
            self.heap.pop()
        } else {
            None
        }
    }

    /// How long until the earliest packet is due: zero if it already is, [`IDLE_WAIT`] if the
    /// heap is empty.
    pub fn wait(&self, now: u64) -> Duration {
        match self.next_release() {
            None => IDLE_WAIT,
            Some(release_at) => Duration::from_millis(release_at.saturating_sub(now)),
        }
    }

    /// Writes every due packet to `sink`, one write per packet, reading the clock before each
    /// pop. Returns the number of packets written.
    ///
    /// A packet whose write fails is dropped and the error returned; later packets stay queued.
    pub fn drain_due<C: Clock + ?Sized>(
        &mut self,
        clock: &C,
        sink: &mut dyn PacketSink,
    ) -> Result<usize> {
        let mut written = 0;
        while let Some(packet) = self.pop_due(clock.now_millis()) {
            sink.write_packet(&packet.payload).map_err(Error::Sink)?;
            written += 1;
        }
        Ok(written)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
