use std::{fmt, net::Ipv4Addr};

/// Port value of a rule that applies to every port (and to protocols without ports, e.g. ICMP).
pub const WILDCARD_PORT: u16 = 0;

/// Threshold value meaning "never switch to the alternate delay".
pub const NO_THRESHOLD: u64 = u64::MAX;

/// IANA protocol numbers the classifier knows about.
pub mod protocol {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
}

/// Direction of traffic relative to the emulated host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Leaving the emulated host towards the real destination. Uses the forward delays.
    Uplink,
    /// Returning to the emulated host. Uses the reverse delays.
    Downlink,
}

impl Direction {
    #[inline]
    pub const fn is_uplink(self) -> bool {
        matches!(self, Self::Uplink)
    }

    /// Lowercase name, used as a file name suffix.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uplink => "uplink",
            Self::Downlink => "downlink",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `(protocol, ip, port)` triple a rule is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleKey {
    pub protocol: u8,
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.protocol, self.ip, self.port)
    }
}

/// A per-destination delay rule.
///
/// Every rule carries a base delay per direction and, optionally, a byte threshold after
/// which the delay switches to an alternate value for the rest of the connection's life.
/// Without a threshold the alternate delay equals the base delay, so the rule is a constant
/// delay.
///
/// # Example
///
/// ```
/// use std::net::Ipv4Addr;
/// use linkdelay_rules::{protocol, DelayRule, Direction};
///
/// // 40ms each way to 10.0.0.5:443, 200ms uplink once 1MB has been sent.
/// let rule = DelayRule::new(protocol::TCP, Ipv4Addr::new(10, 0, 0, 5), 443, 40, 40)
///     .with_forward_threshold(1_000_000, 200);
///
/// assert_eq!(rule.delay_after(Direction::Uplink, 999_999), 40);
/// assert_eq!(rule.delay_after(Direction::Uplink, 1_000_000), 200);
/// assert_eq!(rule.delay_after(Direction::Downlink, u64::MAX - 1), 40);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DelayRule {
    protocol: u8,
    ip: Ipv4Addr,
    port: u16,
    forward_delay: u64,
    reverse_delay: u64,
    forward_threshold: u64,
    forward_alt_delay: u64,
    reverse_threshold: u64,
    reverse_alt_delay: u64,
}

impl DelayRule {
    /// Creates a constant-delay rule. Delays are in milliseconds.
    pub const fn new(
        protocol: u8,
        ip: Ipv4Addr,
        port: u16,
        forward_delay: u64,
        reverse_delay: u64,
    ) -> Self {
        Self {
            protocol,
            ip,
            port,
            forward_delay,
            reverse_delay,
            forward_threshold: NO_THRESHOLD,
            forward_alt_delay: forward_delay,
            reverse_threshold: NO_THRESHOLD,
            reverse_alt_delay: reverse_delay,
        }
    }

    /// Switch the uplink delay to `alt_delay` once `threshold` bytes have been sent.
    pub const fn with_forward_threshold(mut self, threshold: u64, alt_delay: u64) -> Self {
        self.forward_threshold = threshold;
        self.forward_alt_delay = alt_delay;
        self
    }

    /// Switch the downlink delay to `alt_delay` once `threshold` bytes have been received.
    pub const fn with_reverse_threshold(mut self, threshold: u64, alt_delay: u64) -> Self {
        self.reverse_threshold = threshold;
        self.reverse_alt_delay = alt_delay;
        self
    }

    pub const fn protocol(&self) -> u8 {
        self.protocol
    }

    pub const fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    pub const fn key(&self) -> RuleKey {
        RuleKey { protocol: self.protocol, ip: self.ip, port: self.port }
    }

    /// True if the rule applies regardless of port.
    pub const fn is_wildcard(&self) -> bool {
        self.port == WILDCARD_PORT
    }

    pub const fn forward_delay(&self) -> u64 {
        self.forward_delay
    }

    pub const fn reverse_delay(&self) -> u64 {
        self.reverse_delay
    }

    pub const fn forward_threshold(&self) -> u64 {
        self.forward_threshold
    }

    pub const fn forward_alt_delay(&self) -> u64 {
        self.forward_alt_delay
    }

    pub const fn reverse_threshold(&self) -> u64 {
        self.reverse_threshold
    }

    pub const fn reverse_alt_delay(&self) -> u64 {
        self.reverse_alt_delay
    }

    /// The delay before any threshold applies.
    pub const fn base_delay(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Uplink => self.forward_delay,
            Direction::Downlink => self.reverse_delay,
        }
    }

    /// The delay for a packet on a connection that has already carried `bytes_so_far` bytes
    /// in `direction`, not counting the packet itself.
    pub const fn delay_after(&self, direction: Direction, bytes_so_far: u64) -> u64 {
        let (delay, threshold, alt_delay) = match direction {
            Direction::Uplink => {
                (self.forward_delay, self.forward_threshold, self.forward_alt_delay)
            }
            Direction::Downlink => {
                (self.reverse_delay, self.reverse_threshold, self.reverse_alt_delay)
            }
        };

        if bytes_so_far < threshold {
            delay
        } else {
            alt_delay
        }
    }

    const fn has_forward_threshold(&self) -> bool {
        self.forward_threshold != NO_THRESHOLD || self.forward_alt_delay != self.forward_delay
    }

    const fn has_reverse_threshold(&self) -> bool {
        self.reverse_threshold != NO_THRESHOLD || self.reverse_alt_delay != self.reverse_delay
    }
}

/// Formats the rule as a rule file line, using the shortest column layout that describes it.
impl fmt::Display for DelayRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {}",
            self.protocol, self.ip, self.port, self.forward_delay, self.reverse_delay
        )?;

        let reverse = self.has_reverse_threshold();
        if reverse || self.has_forward_threshold() {
            write!(f, " {} {}", self.forward_threshold, self.forward_alt_delay)?;
        }
        if reverse {
            write!(f, " {} {}", self.reverse_threshold, self.reverse_alt_delay)?;
        }

        Ok(())
    }
}
