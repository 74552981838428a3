//! Rule file parsing.
//!
//! A rule file holds one rule per line, with whitespace separated columns:
//!
//! ```text
//! <proto> <ip> <port> <fwd-delay> <rev-delay>
//!     [<fwd-limit> <fwd-alt-delay> [<rev-limit> <rev-alt-delay>]]
//! ```
//!
//! * `proto`: IANA protocol number, `0..=255`.
//! * `ip`: IPv4 address in dotted-quad notation.
//! * `port`: `0..=65535`, where `0` matches any port (use it for ICMP).
//! * delays are milliseconds; fractional delays are truncated.
//! * limits are byte counts after which the alternate delay applies.

use std::{
    fs::File,
    io::{BufRead, BufReader},
    net::Ipv4Addr,
    path::Path,
};

use tracing::{debug, warn};

use crate::{DelayRule, Error, Result, RuleSet};

/// Loads a rule file from disk.
pub fn parse_file(path: impl AsRef<Path>) -> Result<RuleSet> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| Error::Io { path: path.to_owned(), source })?;

    let rules = parse_reader(BufReader::new(file))?;
    debug!(path = %path.display(), rules = rules.len(), "loaded delay rules");

    Ok(rules)
}

/// Parses rules from in-memory text.
pub fn parse_str(text: &str) -> Result<RuleSet> {
    parse_reader(text.as_bytes())
}

/// Parses rules line by line from a reader. Later rules replace earlier ones with the same
/// `(protocol, ip, port)`.
pub fn parse_reader<R: BufRead>(reader: R) -> Result<RuleSet> {
    let mut rules = RuleSet::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line.map_err(|source| Error::Read { line: line_no, source })?;

        let rule = parse_line(line_no, &line)?;
        if let Some(old) = rules.insert(rule) {
            debug!(line = line_no, key = %old.key(), "rule replaces an earlier one");
        }
    }

    Ok(rules)
}

/// Parses a single rule line. `line_no` is only used for error reporting.
pub fn parse_line(line_no: usize, line: &str) -> Result<DelayRule> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    if !matches!(cols.len(), 5 | 7 | 9) {
        return Err(Error::FieldCount { line: line_no, count: cols.len() });
    }

    let protocol = parse_integer(line_no, "protocol", cols[0])?;
    let protocol = u8::try_from(protocol)
        .map_err(|_| Error::Protocol { line: line_no, value: protocol })?;

    let ip: Ipv4Addr = cols[1].parse().map_err(|source| Error::Address {
        line: line_no,
        value: cols[1].to_owned(),
        source,
    })?;

    let port = parse_integer(line_no, "port", cols[2])?;
    let port = u16::try_from(port).map_err(|_| Error::Port { line: line_no, value: port })?;

    let forward_delay = parse_amount(line_no, "forward delay", cols[3])?;
    let reverse_delay = parse_amount(line_no, "reverse delay", cols[4])?;

    let mut rule = DelayRule::new(protocol, ip, port, forward_delay, reverse_delay);

    if cols.len() >= 7 {
        let limit = parse_amount(line_no, "forward threshold", cols[5])?;
        let alt_delay = parse_amount(line_no, "forward alternate delay", cols[6])?;
        rule = rule.with_forward_threshold(limit, alt_delay);

        if cols.len() == 9 {
            // Existing rule files rely on the reverse pair mirroring columns 5 and 6; columns
            // 7 and 8 are validated but not used.
            let rev_limit = parse_amount(line_no, "reverse threshold", cols[7])?;
            let rev_alt_delay = parse_amount(line_no, "reverse alternate delay", cols[8])?;
            if (rev_limit, rev_alt_delay) != (limit, alt_delay) {
                warn!(
                    line = line_no,
                    rev_limit,
                    rev_alt_delay,
                    used_limit = limit,
                    used_alt_delay = alt_delay,
                    "reverse threshold columns ignored, forward threshold applies both ways"
                );
            }
            rule = rule.with_reverse_threshold(limit, alt_delay);
        }
    }

    Ok(rule)
}

fn parse_integer(line: usize, field: &'static str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| Error::Number { line, field, value: value.to_owned() })
}

/// Parses a delay or byte count. Decimal fractions are truncated towards zero.
fn parse_amount(line: usize, field: &'static str, value: &str) -> Result<u64> {
    if let Ok(amount) = value.parse::<u64>() {
        return Ok(amount);
    }

    match value.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount.trunc() as u64),
        _ => Err(Error::Number { line, field, value: value.to_owned() }),
    }
}
