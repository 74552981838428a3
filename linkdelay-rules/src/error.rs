use std::{io, net::AddrParseError, path::PathBuf};

/// Errors raised while loading rules or RTT records. Line numbers are 1-based.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse rule #{line}: invalid number of fields ({count}), expected 5, 7 or 9")]
    FieldCount { line: usize, count: usize },
    #[error("invalid protocol number '{value}' in rule #{line}")]
    Protocol { line: usize, value: u64 },
    #[error("'{value}' in rule #{line} is not a valid IPv4 address: {source}")]
    Address {
        line: usize,
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("invalid port number '{value}' in rule #{line}")]
    Port { line: usize, value: u64 },
    #[error("invalid {field} '{value}' in rule #{line}")]
    Number { line: usize, field: &'static str, value: String },
    #[error("failed to parse RTT record #{line}: {reason}")]
    Rtt { line: usize, reason: String },
}

impl Error {
    /// The 1-based line the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Io { .. } => None,
            Self::Read { line, .. } |
            Self::FieldCount { line, .. } |
            Self::Protocol { line, .. } |
            Self::Address { line, .. } |
            Self::Port { line, .. } |
            Self::Number { line, .. } |
            Self::Rtt { line, .. } => Some(*line),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
