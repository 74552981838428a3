use std::{collections::BTreeMap, net::Ipv4Addr};

use linkdelay_rules::RuleSet;

/// The `(ip, port)` pair a connection is counted under, taken from the matching rule.
pub type ConnectionKey = (Ipv4Addr, u16);

/// Bytes and packets carried per rule-matched connection in one direction.
///
/// Both maps hold an entry for every `(ip, port)` of the rule set the counters were created
/// from, so connections that never saw traffic are still reported with a zero count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionCounters {
    bytes: BTreeMap<ConnectionKey, u64>,
    packets: BTreeMap<ConnectionKey, u64>,
}

impl ConnectionCounters {
    /// Creates zeroed counters for every `(ip, port)` in `rules`.
    pub fn seeded(rules: &RuleSet) -> Self {
        let bytes: BTreeMap<_, _> = rules.connections().map(|key| (key, 0)).collect();
        let packets = bytes.clone();
        Self { bytes, packets }
    }

    /// Accounts one packet of `len` bytes and returns the byte count *before* it.
    pub fn record(&mut self, key: ConnectionKey, len: u64) -> u64 {
        let bytes = self.bytes.entry(key).or_insert(0);
        let before = *bytes;
        *bytes = bytes.saturating_add(len);

        let packets = self.packets.entry(key).or_insert(0);
        *packets = packets.saturating_add(1);

        before
    }

    pub fn bytes(&self, key: ConnectionKey) -> Option<u64> {
        self.bytes.get(&key).copied()
    }

    pub fn packets(&self, key: ConnectionKey) -> Option<u64> {
        self.packets.get(&key).copied()
    }

    /// Byte counts in `(ip, port)` order.
    pub fn iter_bytes(&self) -> impl Iterator<Item = (ConnectionKey, u64)> + '_ {
        self.bytes.iter().map(|(key, count)| (*key, *count))
    }

    /// Packet counts in `(ip, port)` order.
    pub fn iter_packets(&self) -> impl Iterator<Item = (ConnectionKey, u64)> + '_ {
        self.packets.iter().map(|(key, count)| (*key, *count))
    }

    /// Number of tracked connections.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
