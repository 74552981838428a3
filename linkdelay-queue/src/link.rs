use std::{sync::Arc, time::Duration};

use linkdelay_common::{Clock, MonotonicClock};
use linkdelay_rules::{Direction, RuleSet};

use crate::{LinkConfig, PacketQueue, Result, RuleDelayQueue};

/// Both directions of a rule-delayed link.
///
/// The two queues share the rule set and nothing else, so each may be driven from its own
/// thread.
#[derive(Debug)]
pub struct DelayLink<C: Clock = MonotonicClock> {
    pub uplink: RuleDelayQueue<C>,
    pub downlink: RuleDelayQueue<C>,
}

impl DelayLink {
    pub fn new(rules: Arc<RuleSet>, config: &LinkConfig) -> Self {
        Self::with_clock(rules, config, MonotonicClock::new())
    }
}

impl<C: Clock + Clone> DelayLink<C> {
    pub fn with_clock(rules: Arc<RuleSet>, config: &LinkConfig, clock: C) -> Self {
        let uplink = RuleDelayQueue::with_clock(
            Arc::clone(&rules),
            Direction::Uplink,
            config,
            clock.clone(),
        );
        let downlink = RuleDelayQueue::with_clock(rules, Direction::Downlink, config, clock);
        Self { uplink, downlink }
    }
}

impl<C: Clock> DelayLink<C> {
    pub fn queue(&self, direction: Direction) -> &RuleDelayQueue<C> {
        match direction {
            Direction::Uplink => &self.uplink,
            Direction::Downlink => &self.downlink,
        }
    }

    pub fn queue_mut(&mut self, direction: Direction) -> &mut RuleDelayQueue<C> {
        match direction {
            Direction::Uplink => &mut self.uplink,
            Direction::Downlink => &mut self.downlink,
        }
    }

    /// The shorter wait of the two directions, for pollers that serve both.
    pub fn time_until_next(&self) -> Duration {
        self.uplink.time_until_next().min(self.downlink.time_until_next())
    }

    /// Closes both directions. The downlink counters are still written (on drop) when the
    /// uplink fails.
    pub fn close(self) -> Result<()> {
        let Self { uplink, downlink } = self;
        uplink.close()?;
        downlink.close()
    }
}
