#![doc(issue_tracker_base_url = "https://github.com/chainbound/msg-rs/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Interfaces the delay engine consumes from its surroundings: a millisecond clock and a
//! sink that transmits released packets.

pub mod clock;
pub mod sink;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use sink::{CollectingSink, PacketSink};

pub mod constants {
    /// Length of the metadata prefix (two flag bytes, two protocol bytes) that a TUN device
    /// without `IFF_NO_PI` puts in front of every packet.
    pub const TUN_PREFIX_LEN: usize = 4;

    /// Minimum length of an IPv4 header, in bytes.
    pub const MIN_IPV4_HEADER_LEN: usize = 20;
}
