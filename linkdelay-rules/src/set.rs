use std::{collections::BTreeMap, fmt, net::Ipv4Addr, str::FromStr};

use crate::{parse, DelayRule, Error, NO_THRESHOLD, WILDCARD_PORT};

/// Rules for one `(protocol, ip)` pair, by port.
pub type PortRules = BTreeMap<u16, DelayRule>;

/// Rules for one protocol, by address.
pub type AddressRules = BTreeMap<Ipv4Addr, PortRules>;

/// A complete set of delay rules, indexed `protocol -> ip -> port`.
///
/// Iteration is ordered by protocol, then address, then port. A set is built once and then
/// shared read-only, usually behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: BTreeMap<u8, AddressRules>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a rule, replacing and returning any rule stored under the same key.
    pub fn insert(&mut self, rule: DelayRule) -> Option<DelayRule> {
        self.rules
            .entry(rule.protocol())
            .or_default()
            .entry(rule.ip())
            .or_default()
            .insert(rule.port(), rule)
    }

    /// Returns the rule stored under exactly this key. The wildcard port is not consulted.
    pub fn get(&self, protocol: u8, ip: Ipv4Addr, port: u16) -> Option<&DelayRule> {
        self.ports(protocol, ip)?.get(&port)
    }

    /// Returns all rules for an address under a protocol.
    pub fn ports(&self, protocol: u8, ip: Ipv4Addr) -> Option<&PortRules> {
        self.rules.get(&protocol)?.get(&ip)
    }

    /// Returns the wildcard-port rule for an address under a protocol.
    pub fn wildcard(&self, protocol: u8, ip: Ipv4Addr) -> Option<&DelayRule> {
        self.get(protocol, ip, WILDCARD_PORT)
    }

    /// Returns whether any rule exists for the protocol.
    pub fn has_protocol(&self, protocol: u8) -> bool {
        self.rules.contains_key(&protocol)
    }

    /// All rules, in key order.
    pub fn iter(&self) -> impl Iterator<Item = &DelayRule> + '_ {
        self.rules.values().flat_map(|ips| ips.values()).flat_map(|ports| ports.values())
    }

    /// The distinct `(ip, port)` pairs across all protocols, in order.
    pub fn connections(&self) -> impl Iterator<Item = (Ipv4Addr, u16)> + '_ {
        let mut seen: Vec<_> = self.iter().map(|rule| (rule.ip(), rule.port())).collect();
        seen.sort_unstable();
        seen.dedup();
        seen.into_iter()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// A human readable table of the rules, one numbered rule per line.
    pub fn table(&self) -> RuleTable<'_> {
        RuleTable(self)
    }
}

impl Extend<DelayRule> for RuleSet {
    fn extend<I: IntoIterator<Item = DelayRule>>(&mut self, iter: I) {
        for rule in iter {
            self.insert(rule);
        }
    }
}

impl FromIterator<DelayRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = DelayRule>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl FromStr for RuleSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_str(s)
    }
}

/// Renders the set in rule file format. Parsing the output yields an equal set.
impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in self.iter() {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

/// Table view of a [`RuleSet`], see [`RuleSet::table`].
#[derive(Debug, Clone, Copy)]
pub struct RuleTable<'a>(&'a RuleSet);

impl fmt::Display for RuleTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn limit(value: u64) -> String {
            if value == NO_THRESHOLD {
                "*".to_owned()
            } else {
                value.to_string()
            }
        }

        for (i, rule) in self.0.iter().enumerate() {
            let port =
                if rule.is_wildcard() { "*".to_owned() } else { rule.port().to_string() };

            writeln!(
                f,
                "#- Rule#{:03}  {:>3} {:>15}({:>10}) {:>5} {:>5}ms {:>5}ms   F@{:>10} {:>5}ms   B@{:>10} {:>5}ms",
                i + 1,
                rule.protocol(),
                rule.ip().to_string(),
                u32::from(rule.ip()),
                port,
                rule.forward_delay(),
                rule.reverse_delay(),
                limit(rule.forward_threshold()),
                rule.forward_alt_delay(),
                limit(rule.reverse_threshold()),
                rule.reverse_alt_delay(),
            )?;
        }
        Ok(())
    }
}
