//! Writing counters to disk when a queue is torn down.

use std::{
    ffi::OsString,
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use linkdelay_rules::Direction;

use crate::{counters::ConnectionKey, ConnectionCounters, Error, Result};

/// The counter files of one queue: `<prefix>.bytes_<dir>`, `<prefix>.bytes_per_conn_<dir>`
/// and `<prefix>.pkts_per_conn_<dir>`, where `<dir>` is `uplink` or `downlink`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterFiles {
    prefix: PathBuf,
    direction: Direction,
}

impl CounterFiles {
    pub fn new(prefix: impl Into<PathBuf>, direction: Direction) -> Self {
        Self { prefix: prefix.into(), direction }
    }

    /// File holding the total number of bytes that went through the queue.
    pub fn total_bytes_path(&self) -> PathBuf {
        self.path("bytes")
    }

    /// File holding `ip:port bytes` lines.
    pub fn bytes_per_conn_path(&self) -> PathBuf {
        self.path("bytes_per_conn")
    }

    /// File holding `ip:port packets` lines.
    pub fn packets_per_conn_path(&self) -> PathBuf {
        self.path("pkts_per_conn")
    }

    fn path(&self, counter: &str) -> PathBuf {
        let mut name = OsString::from(self.prefix.as_os_str());
        name.push(format!(".{counter}_{}", self.direction));
        PathBuf::from(name)
    }

    /// Writes all three files. Stops at the first file that cannot be written.
    pub fn write(&self, total_bytes: u64, counters: &ConnectionCounters) -> Result<()> {
        write_file(&self.total_bytes_path(), |w| writeln!(w, "{total_bytes}"))?;
        write_file(&self.bytes_per_conn_path(), |w| write_per_conn(w, counters.iter_bytes()))?;
        write_file(&self.packets_per_conn_path(), |w| write_per_conn(w, counters.iter_packets()))?;
        Ok(())
    }
}

fn write_per_conn(
    w: &mut impl Write,
    counts: impl Iterator<Item = (ConnectionKey, u64)>,
) -> io::Result<()> {
    for ((ip, port), count) in counts {
        writeln!(w, "{ip}:{port} {count}")?;
    }
    Ok(())
}

fn write_file<F>(path: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let result = File::create(path).and_then(|file| {
        let mut writer = BufWriter::new(file);
        f(&mut writer)?;
        writer.flush()
    });

    result.map_err(|source| Error::Persist { path: path.to_owned(), source })
}
