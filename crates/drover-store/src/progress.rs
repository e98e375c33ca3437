//! Byte-progress reporting seam for artifact transfers.
//!
//! Display is out of scope for the core; callers attach whatever reporter
//! they want (a progress bar, a log line, nothing).

/// Receives byte progress during an upload or download.
///
/// Implementations must be cheap and thread-safe; transfers invoke them from
/// concurrent worker tasks.
pub trait Progress: Send + Sync {
    /// Called once, before any bytes move, with the total byte size.
    fn start(&self, _total_bytes: u64) {}

    /// Called after each file completes with the bytes transferred.
    fn advance(&self, _bytes: u64) {}
}

/// Discards all progress.
pub struct NoProgress;

impl Progress for NoProgress {}

/// Reports progress through the log at debug level.
pub struct LogProgress {
    label: String,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Progress for LogProgress {
    fn start(&self, total_bytes: u64) {
        log::debug!("{}: transferring {} bytes", self.label, total_bytes);
    }

    fn advance(&self, bytes: u64) {
        log::debug!("{}: +{} bytes", self.label, bytes);
    }
}
