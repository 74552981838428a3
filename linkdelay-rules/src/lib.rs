#![doc(issue_tracker_base_url = "https://github.com/chainbound/msg-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Delay rules: the per-destination delay model, the rule file format and rule generation
//! from RTT measurements.

mod error;
pub mod parse;
mod rule;
pub mod rtt;
mod set;

pub use error::{Error, Result};
pub use parse::{parse_file, parse_reader, parse_str};
pub use rule::{protocol, DelayRule, Direction, RuleKey, NO_THRESHOLD, WILDCARD_PORT};
pub use set::{AddressRules, PortRules, RuleSet, RuleTable};
