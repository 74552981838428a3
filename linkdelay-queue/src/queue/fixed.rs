use std::time::Duration;

use bytes::Bytes;
use linkdelay_common::{Clock, MonotonicClock, PacketSink};

use super::PacketQueue;
use crate::{heap::ReleaseHeap, Result};

/// Delays every packet by the same amount.
#[derive(Debug)]
pub struct FixedDelayQueue<C = MonotonicClock> {
    delay: u64,
    heap: ReleaseHeap,
    clock: C,
}

impl FixedDelayQueue {
    /// Creates a queue delaying packets by `delay` milliseconds.
    pub fn new(delay: u64) -> Self {
        Self::with_clock(delay, MonotonicClock::new())
    }
}

impl<C: Clock> FixedDelayQueue<C> {
    pub fn with_clock(delay: u64, clock: C) -> Self {
        Self { delay, heap: ReleaseHeap::new(), clock }
    }

    pub const fn delay(&self) -> u64 {
        self.delay
    }

    /// Number of packets waiting for release.
    pub fn pending(&self) -> usize {
        self.heap.len()
    }
}

impl<C: Clock> PacketQueue for FixedDelayQueue<C> {
    fn enqueue(&mut self, packet: Bytes) -> Result<()> {
        let release_at = self.clock.now_millis().saturating_add(self.delay);
        self.heap.push(release_at, packet);
        Ok(())
    }

    fn drain(&mut self, sink: &mut dyn PacketSink) -> Result<usize> {
        self.heap.drain_due(&self.clock, sink)
    }

    fn time_until_next(&self) -> Duration {
        self.heap.wait(self.clock.now_millis())
    }
}
