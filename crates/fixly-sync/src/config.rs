//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default capacity of the deduplication index.
const DEFAULT_DEDUP_CAPACITY: usize = 4096;

/// Default deadline for a single remote put attempt.
const DEFAULT_PUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default backoff before the single retried put attempt.
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Tunables for the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum number of digest entries kept in the dedup index before
    /// least-recently-used entries are evicted.
    pub dedup_capacity: usize,
    /// Deadline for each remote put attempt. A timed-out attempt is
    /// treated like any other transient store failure.
    pub put_timeout: Duration,
    /// Pause before the single retried remote attempt. Exactly one
    /// retry is ever made; unbounded retry loops would hold the
    /// per-session guard open indefinitely.
    pub retry_backoff: Duration,
    /// Key prefix for snapshot artifacts in the remote store.
    pub remote_prefix: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
            put_timeout: DEFAULT_PUT_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            remote_prefix: "sessions".to_string(),
        }
    }
}

impl SyncConfig {
    /// Sets the dedup index capacity.
    pub fn with_dedup_capacity(mut self, capacity: usize) -> Self {
        self.dedup_capacity = capacity;
        self
    }

    /// Sets the remote put deadline.
    pub fn with_put_timeout(mut self, timeout: Duration) -> Self {
        self.put_timeout = timeout;
        self
    }

    /// Sets the retry backoff.
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Sets the remote key prefix.
    pub fn with_remote_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.remote_prefix = prefix.into();
        self
    }
}
