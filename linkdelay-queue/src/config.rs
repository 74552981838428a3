use std::path::PathBuf;

/// Settings shared by both directions of a delayed link.
///
/// [`LinkConfig::new`] leaves the output prefix unset, which turns counter persistence off:
/// queues built from it write no counter files at teardown. Set a prefix with
/// [`LinkConfig::with_output_prefix`] to get them.
///
/// # Example
///
/// ```
/// use linkdelay_queue::LinkConfig;
///
/// let config = LinkConfig::new(20).with_output_prefix("/tmp/page-load");
/// assert_eq!(config.default_delay, 20);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkConfig {
    /// Delay in milliseconds for packets no rule matches.
    pub default_delay: u64,
    /// Path prefix of the counter files written at teardown. Counters are not persisted
    /// when unset.
    pub output_prefix: Option<PathBuf>,
}

impl LinkConfig {
    pub const fn new(default_delay: u64) -> Self {
        Self { default_delay, output_prefix: None }
    }

    /// Set the path prefix of the counter files.
    pub fn with_output_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.output_prefix = Some(prefix.into());
        self
    }
}
