#![doc(issue_tracker_base_url = "https://github.com/chainbound/msg-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub use linkdelay_common::*;
pub use linkdelay_queue::*;
pub use linkdelay_rules::{
    parse, parse_file, parse_str, protocol, rtt, DelayRule, Direction, RuleKey, RuleSet,
    NO_THRESHOLD, WILDCARD_PORT,
};

/// Errors of the rule model and parser.
pub use linkdelay_rules::Error as RuleError;
