use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use linkdelay_common::{constants::MIN_IPV4_HEADER_LEN, Clock, MonotonicClock, PacketSink};
use linkdelay_rules::{Direction, RuleSet};
use tracing::{debug, error};

use super::PacketQueue;
use crate::{
    classify::Classifier, heap::ReleaseHeap, persist::CounterFiles, ConnectionCounters, Error,
    LinkConfig, Result,
};

/// Delays packets according to a [`RuleSet`], for one direction of a link.
///
/// Besides the release heap, the queue keeps the total number of bytes it was handed and the
/// per-connection counters of rule-matched TCP traffic. When the queue is closed (or dropped)
/// those counters are written next to the configured output prefix, see [`CounterFiles`].
/// Packets still waiting at that point are discarded.
///
/// Persistence is off when [`LinkConfig::output_prefix`] is `None`, the default of
/// [`LinkConfig::new`]: closing or dropping such a queue writes nothing.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use linkdelay_queue::{LinkConfig, PacketQueue, RuleDelayQueue};
/// use linkdelay_rules::{Direction, RuleSet};
///
/// let rules: RuleSet = "6 10.0.0.5 80 100 50 1000 5000".parse().unwrap();
/// let mut queue = RuleDelayQueue::new(Arc::new(rules), Direction::Uplink, &LinkConfig::new(20));
///
/// assert!(!queue.has_pending_output());
/// queue.close().unwrap();
/// ```
#[derive(Debug)]
pub struct RuleDelayQueue<C: Clock = MonotonicClock> {
    classifier: Classifier,
    counters: ConnectionCounters,
    heap: ReleaseHeap,
    /// Bytes handed to [`PacketQueue::enqueue`], matched or not.
    total_bytes: u64,
    /// `None` once the counters have been written.
    output: Option<CounterFiles>,
    clock: C,
}

impl RuleDelayQueue {
    pub fn new(rules: Arc<RuleSet>, direction: Direction, config: &LinkConfig) -> Self {
        Self::with_clock(rules, direction, config, MonotonicClock::new())
    }
}

impl<C: Clock> RuleDelayQueue<C> {
    pub fn with_clock(
        rules: Arc<RuleSet>,
        direction: Direction,
        config: &LinkConfig,
        clock: C,
    ) -> Self {
        let counters = ConnectionCounters::seeded(&rules);
        let output =
            config.output_prefix.as_ref().map(|prefix| CounterFiles::new(prefix, direction));

        debug!(
            %direction,
            default_delay = config.default_delay,
            rules = rules.len(),
            connections = counters.len(),
            "created rule delay queue"
        );

        Self {
            classifier: Classifier::new(rules, direction, config.default_delay),
            counters,
            heap: ReleaseHeap::new(),
            total_bytes: 0,
            output,
            clock,
        }
    }

    pub const fn direction(&self) -> Direction {
        self.classifier.direction()
    }

    pub const fn default_delay(&self) -> u64 {
        self.classifier.default_delay()
    }

    /// Total bytes enqueued so far.
    pub const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub const fn counters(&self) -> &ConnectionCounters {
        &self.counters
    }

    /// Number of packets waiting for release.
    pub fn pending(&self) -> usize {
        self.heap.len()
    }

    /// The files the counters will be written to, `None` when persistence is off.
    pub const fn counter_files(&self) -> Option<&CounterFiles> {
        self.output.as_ref()
    }

    /// Tears the queue down, writing the counters if an output prefix was configured. Pending
    /// packets are discarded.
    pub fn close(mut self) -> Result<()> {
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        let Some(files) = self.output.take() else {
            return Ok(());
        };

        debug!(
            direction = %self.direction(),
            total_bytes = self.total_bytes,
            discarded = self.heap.len(),
            "closing rule delay queue"
        );
        files.write(self.total_bytes, &self.counters)
    }
}

impl<C: Clock> PacketQueue for RuleDelayQueue<C> {
    fn enqueue(&mut self, packet: Bytes) -> Result<()> {
        self.total_bytes = self.total_bytes.saturating_add(packet.len() as u64);
        if packet.len() < MIN_IPV4_HEADER_LEN {
            return Err(Error::PacketTooSmall { len: packet.len(), min: MIN_IPV4_HEADER_LEN });
        }

        let verdict = self.classifier.classify(&packet, &mut self.counters);
        let release_at = self.clock.now_millis().saturating_add(verdict.delay);
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

impl<C: Clock> Drop for RuleDelayQueue<C> {
    fn drop(&mut self) {
        if let Err(e) = self.persist() {
            error!(?e, direction = %self.direction(), "failed to persist queue counters");
        }
    }
}
