#![doc(issue_tracker_base_url = "https://github.com/chainbound/msg-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Per-packet delay for emulated links.
//!
//! Packets read from a virtual interface are classified against a
//! [`RuleSet`](linkdelay_rules::RuleSet), held in a release-time ordered heap and written
//! out once their delay has elapsed. See [`RuleDelayQueue`] for the rule-driven queue and
//! [`DelayLink`] for a ready-made uplink/downlink pair.

pub mod classify;
mod config;
mod counters;
mod error;
pub mod header;
mod heap;
mod link;
pub mod persist;
mod queue;

#[cfg(test)]
mod test_utils;

pub use classify::{Classifier, Verdict};
pub use config::LinkConfig;
pub use counters::{ConnectionCounters, ConnectionKey};
pub use error::{Error, Result};
pub use heap::{PendingPacket, ReleaseHeap, IDLE_WAIT};
pub use link::DelayLink;
pub use persist::CounterFiles;
pub use queue::{FixedDelayQueue, PacketQueue, RuleDelayQueue};
