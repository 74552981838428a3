//! Rule matching for raw packets.

use std::sync::Arc;

use linkdelay_rules::{protocol, DelayRule, Direction, PortRules, RuleKey, RuleSet, WILDCARD_PORT};
use tracing::{trace, warn};

use crate::{
    counters::ConnectionCounters,
    header::{self, Ipv4Header},
};

/// IPv6 packets are expected to carry this value where IPv4 keeps its protocol field.
const NON_IPV4_SENTINEL: u8 = 6;

/// Outcome of classifying one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Delay to apply, in milliseconds.
    pub delay: u64,
    /// Key of the rule that produced the delay, `None` when the default delay applies.
    pub matched: Option<RuleKey>,
}

impl Verdict {
    const fn fallback(delay: u64) -> Self {
        Self { delay, matched: None }
    }

    const fn rule(rule: &DelayRule, delay: u64) -> Self {
        Self { delay, matched: Some(rule.key()) }
    }
}

/// Picks a delay for every packet of one direction of a link.
///
/// Lookup goes protocol, then address (destination on the uplink, source on the downlink),
/// then port. A wildcard-port rule at the address wins over any port rule. TCP matches go
/// through the byte threshold of their rule; UDP and wildcard matches always get the base
/// delay. Anything that cannot be matched, including every non-IPv4 packet, gets the default
/// delay.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Arc<RuleSet>,
    direction: Direction,
    default_delay: u64,
}

impl Classifier {
    pub fn new(rules: Arc<RuleSet>, direction: Direction, default_delay: u64) -> Self {
        Self { rules, direction, default_delay }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    pub const fn default_delay(&self) -> u64 {
        self.default_delay
    }

    /// Classifies a raw packet (link-layer prefix included). Matched TCP packets are
    /// accounted in `counters`; nothing else touches them.
    pub fn classify(&self, packet: &[u8], counters: &mut ConnectionCounters) -> Verdict {
        let verdict = match header::ip_version(packet) {
            Ok(4) => self.classify_ipv4(packet, counters),
            Ok(version) => self.classify_other(packet, version),
            Err(e) => {
                trace!(?e, len = packet.len(), "undecodable packet");
                self.fallback()
            }
        };

        trace!(
            direction = %self.direction,
            delay = verdict.delay,
            matched = ?verdict.matched,
            "classified packet"
        );
        verdict
    }

    fn classify_ipv4(&self, packet: &[u8], counters: &mut ConnectionCounters) -> Verdict {
        let ip = match header::decode_ipv4(packet) {
            Ok(ip) => ip,
            Err(e) => {
                trace!(?e, len = packet.len(), "invalid IPv4 header");
                return self.fallback();
            }
        };

        let address = match self.direction {
            Direction::Uplink => ip.destination,
            Direction::Downlink => ip.source,
        };

        let Some(ports) = self.rules.ports(ip.protocol, address) else {
            return self.fallback();
        };

        if let Some(rule) = ports.get(&WILDCARD_PORT) {
            return Verdict::rule(rule, rule.base_delay(self.direction));
        }

        match ip.protocol {
            protocol::TCP => self.classify_tcp(packet, &ip, ports, counters),
            protocol::UDP => self.classify_udp(packet, &ip, ports),
            // ICMP and friends only ever match through a wildcard rule.
            _ => self.fallback(),
        }
    }

    fn classify_tcp(
        &self,
        packet: &[u8],
        ip: &Ipv4Header,
        ports: &PortRules,
        counters: &mut ConnectionCounters,
    ) -> Verdict {
        let Some(rule) = self.port_rule(packet, ip, ports) else {
            return self.fallback();
        };

        let bytes_so_far = counters.record((rule.ip(), rule.port()), packet.len() as u64);
        Verdict::rule(rule, rule.delay_after(self.direction, bytes_so_far))
    }

    fn classify_udp(&self, packet: &[u8], ip: &Ipv4Header, ports: &PortRules) -> Verdict {
        match self.port_rule(packet, ip, ports) {
            Some(rule) => Verdict::rule(rule, rule.base_delay(self.direction)),
            None => self.fallback(),
        }
    }

    /// Finds the rule for the port facing away from the emulated host.
    fn port_rule<'a>(
        &self,
        packet: &[u8],
        ip: &Ipv4Header,
        ports: &'a PortRules,
    ) -> Option<&'a DelayRule> {
        let decoded = header::decode_ports(packet, ip)
            .map_err(|e| trace!(?e, protocol = ip.protocol, "invalid transport header"))
            .ok()?;

        let port = match self.direction {
            Direction::Uplink => decoded.destination,
            Direction::Downlink => decoded.source,
        };
        ports.get(&port)
    }

    /// Non-IPv4 traffic is never matched against rules.
    fn classify_other(&self, packet: &[u8], version: u8) -> Verdict {
        if !has_non_ipv4_sentinel(packet) {
            let sentinel = header::protocol_byte(packet);
            warn!(version, ?sentinel, len = packet.len(), "unexpected non-IPv4 packet");
        }
        self.fallback()
    }

    const fn fallback(&self) -> Verdict {
        Verdict::fallback(self.default_delay)
    }
}

fn has_non_ipv4_sentinel(packet: &[u8]) -> bool {
    header::protocol_byte(packet) == Some(NON_IPV4_SENTINEL)
}
