//! Packet delay queues.
//!
//! A queue is a passive, single-writer structure driven by an outer poller: the poller
//! calls [`PacketQueue::enqueue`] for every packet read from the link, sleeps for at most
//! [`PacketQueue::time_until_next`] and calls [`PacketQueue::drain`] to transmit the packets
//! whose release time has come. Queues never block and never spawn anything.

use std::time::Duration;

use bytes::Bytes;
use linkdelay_common::PacketSink;

use crate::Result;

mod fixed;
mod rules;

pub use fixed::FixedDelayQueue;
pub use rules::RuleDelayQueue;

/// The scheduling interface shared by every delay queue.
pub trait PacketQueue {
    /// Schedules a raw packet (link-layer prefix included) for release.
    fn enqueue(&mut self, packet: Bytes) -> Result<()>;

    /// Writes every packet that is due to `sink`, earliest first, one write per packet.
    /// Returns the number of packets written.
    fn drain(&mut self, sink: &mut dyn PacketSink) -> Result<usize>;

    /// How long until the next packet is due. Zero if one already is,
    /// [`IDLE_WAIT`](crate::IDLE_WAIT) if nothing is queued.
    fn time_until_next(&self) -> Duration;

    /// Whether [`drain`](Self::drain) would write at least one packet right now.
    fn has_pending_output(&self) -> bool {
        self.time_until_next().is_zero()
    }

    /// Queues never finish on their own; their lifetime is controlled by the owner.
    fn is_finished(&self) -> bool {
        false
    }
}

impl<Q: PacketQueue + ?Sized> PacketQueue for Box<Q> {
    fn enqueue(&mut self, packet: Bytes) -> Result<()> {
        (**self).enqueue(packet)
    }

    fn drain(&mut self, sink: &mut dyn PacketSink) -> Result<usize> {
        (**self).drain(sink)
    }

    fn time_until_next(&self) -> Duration {
        (**self).time_until_next()
    }

    fn has_pending_output(&self) -> bool {
        (**self).has_pending_output()
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}
