use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("packet too small: {len} bytes, expected at least {min}")]
    PacketTooSmall { len: usize, min: usize },
    #[error("failed to write packet to sink: {0}")]
    Sink(#[source] io::Error),
    #[error("failed to write counters to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
