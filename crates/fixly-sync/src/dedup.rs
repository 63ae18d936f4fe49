//! Content-addressed deduplication index.

use std::collections::HashMap;
use std::sync::Mutex;

use fixly_core::Digest;

use crate::TRACING_TARGET;

/// In-memory digest → remote URL index.
///
/// Best-effort by design: losing the index (restart, eviction) only
/// costs a redundant remote write, never correctness, because remote
/// keys are digest-derived and uploads of identical bytes are
/// idempotent. Entries for local fallback artifacts are never recorded
/// here; `file://` paths are not globally resolvable and must not
/// satisfy future remote lookups.
///
/// The index has its own fine-grained lock, separate from the per-key
/// guard, because lookups and records are idempotent and commutative.
#[derive(Debug)]
pub struct DeduplicationIndex {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    entries: HashMap<Digest, Entry>,
    capacity: usize,
    /// Monotonic access counter backing LRU eviction.
    tick: u64,
    evictions: u64,
}

#[derive(Debug)]
struct Entry {
    url: String,
    last_access: u64,
}

impl DeduplicationIndex {
    /// Creates an index holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                capacity: capacity.max(1),
                tick: 0,
                evictions: 0,
            }),
        }
    }

    /// Returns the remote URL previously recorded for `digest`, if any.
    pub fn lookup(&self, digest: &Digest) -> Option<String> {
        let mut inner = self.inner.lock().expect("dedup index poisoned");
        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.entries.get_mut(digest)?;
        entry.last_access = tick;
        Some(entry.url.clone())
    }

    /// Records that `digest` is stored at `url`.
    ///
    /// First-writer-wins: re-recording the same digest with a different
    /// URL keeps the original and logs the conflict.
    pub fn record(&self, digest: Digest, url: impl Into<String>) {
        let url = url.into();
        let mut inner = self.inner.lock().expect("dedup index poisoned");
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(existing) = inner.entries.get_mut(&digest) {
            if existing.url != url {
                tracing::warn!(
                    target: TRACING_TARGET,
                    digest = %digest,
                    existing = %existing.url,
                    rejected = %url,
                    "Conflicting dedup record; keeping first location"
                );
            }
            existing.last_access = tick;
            return;
        }

        if inner.entries.len() >= inner.capacity {
            inner.evict_lru();
        }

        inner.entries.insert(
            digest,
            Entry {
                url,
                last_access: tick,
            },
        );
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("dedup index poisoned").entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total evictions since creation.
    pub fn evictions(&self) -> u64 {
        self.inner.lock().expect("dedup index poisoned").evictions
    }
}

impl Inner {
    fn evict_lru(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(digest, _)| digest.clone());
        if let Some(digest) = victim {
            self.entries.remove(&digest);
            self.evictions += 1;
            tracing::debug!(
                target: TRACING_TARGET,
                digest = %digest,
                "Evicted least-recently-used dedup entry"
            );
        }
    }
}
