//! Rule generation from measured round-trip times.
//!
//! An RTT file lists one measured server per line as `<ip> <port> <rtt-ms>`. Every record
//! becomes a TCP rule that splits the (scaled) RTT evenly between the two directions.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    net::Ipv4Addr,
    path::Path,
    str::FromStr,
};

use crate::{protocol, DelayRule, Error, Result, RuleSet};

/// How measured RTTs are scaled before being turned into delays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Profile {
    /// Reproduce the measured RTT.
    #[default]
    Base,
    /// Emulate a link a third as slow as the measured one.
    Speed,
}

impl Profile {
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Base => 1.0,
            Self::Speed => 0.33,
        }
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "base" => Ok(Self::Base),
            "speed" => Ok(Self::Speed),
            other => Err(format!("unknown profile '{other}', expected 'base' or 'speed'")),
        }
    }
}

/// A measured round-trip time towards one server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttRecord {
    pub ip: Ipv4Addr,
    pub port: u16,
    pub rtt_ms: f64,
}

impl RttRecord {
    /// One-way delays `(uplink, downlink)` in milliseconds: the RTT is rounded up, scaled,
    /// halved and rounded to the nearest millisecond (ties to even).
    pub fn link_delays(&self, profile: Profile) -> (u64, u64) {
        let rtt = self.rtt_ms.ceil() * profile.multiplier();
        let half = (rtt * 0.5).round_ties_even() as u64;
        (half, half)
    }

    pub fn to_rule(&self, profile: Profile) -> DelayRule {
        let (up, down) = self.link_delays(profile);
        DelayRule::new(protocol::TCP, self.ip, self.port, up, down)
    }
}

/// Reads RTT records from a file.
pub fn read_rtt_file(path: impl AsRef<Path>) -> Result<Vec<RttRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Io { path: path.to_owned(), source })?;
    read_rtts(BufReader::new(file))
}

/// Reads RTT records, one per line. Blank lines are skipped.
pub fn read_rtts<R: BufRead>(reader: R) -> Result<Vec<RttRecord>> {
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|source| Error::Read { line: line_no, source })?;

        let cols: Vec<&str> = line.split_whitespace().collect();
        match cols.as_slice() {
            [] => continue,
            [ip, port, rtt] => records.push(parse_record(line_no, ip, port, rtt)?),
            _ => {
                return Err(Error::Rtt {
                    line: line_no,
                    reason: format!("expected 3 fields, found {}", cols.len()),
                })
            }
        }
    }

    Ok(records)
}

fn parse_record(line: usize, ip: &str, port: &str, rtt: &str) -> Result<RttRecord> {
    let invalid = |reason: String| Error::Rtt { line, reason };

    let ip = ip.parse().map_err(|_| invalid(format!("invalid address '{ip}'")))?;
    let port = port.parse().map_err(|_| invalid(format!("invalid port '{port}'")))?;
    let rtt_ms = rtt
        .parse::<f64>()
        .ok()
        .filter(|rtt| rtt.is_finite() && *rtt >= 0.0)
        .ok_or_else(|| invalid(format!("invalid rtt '{rtt}'")))?;

    Ok(RttRecord { ip, port, rtt_ms })
}

/// Turns RTT records into a rule set. Later records for the same server win.
pub fn rules_from_rtts<'a>(
    records: impl IntoIterator<Item = &'a RttRecord>,
    profile: Profile,
) -> RuleSet {
    records.into_iter().map(|record| record.to_rule(profile)).collect()
}
