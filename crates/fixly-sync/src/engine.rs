//! The sync engine facade.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use fixly_core::{Digest, SNAPSHOT_CONTENT_TYPE, StageName, StorageObject, StoreLocation};
use fixly_store::{BlobStore, LocalFallbackStore, StoreError};
use serde::Serialize;

use crate::TRACING_TARGET;
use crate::config::SyncConfig;
use crate::consolidator::SessionConsolidator;
use crate::dedup::DeduplicationIndex;
use crate::error::{SyncError, SyncResult};
use crate::single_flight::SingleFlight;

/// Label used for artifacts produced by [`SyncEngine::finalize_session`].
const FINAL_LABEL: &str = "final";

/// Public entry point for session persistence.
///
/// Every operation for a session runs inside that session's
/// single-flight critical section; unrelated sessions never wait on
/// each other. The persist pipeline is: merge fragment → canonical
/// snapshot → content digest → unchanged short-circuit → dedup-index
/// reuse → remote put (bounded by a timeout, with one retried attempt)
/// → local fallback → hard error.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    remote: Arc<dyn BlobStore>,
    fallback: LocalFallbackStore,
    consolidator: SessionConsolidator,
    dedup: DeduplicationIndex,
    guard: SingleFlight<i64>,
    config: SyncConfig,
    counters: Counters,
}

#[derive(Debug, Default)]
struct Counters {
    remote_writes: AtomicU64,
    dedup_hits: AtomicU64,
    short_circuits: AtomicU64,
    fallback_writes: AtomicU64,
}

/// Point-in-time engine counters for operator visibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Snapshots uploaded to the remote store.
    pub remote_writes: u64,
    /// Persists satisfied from the dedup index without a write.
    pub dedup_hits: u64,
    /// Persists skipped because the snapshot was unchanged.
    pub short_circuits: u64,
    /// Snapshots written to the local fallback area.
    pub fallback_writes: u64,
    /// Entries currently in the dedup index.
    pub dedup_entries: u64,
    /// Dedup entries evicted under the capacity bound.
    pub dedup_evictions: u64,
}

impl SyncEngine {
    /// Creates an engine over the given remote store and fallback area.
    pub fn new(
        remote: Arc<dyn BlobStore>,
        fallback: LocalFallbackStore,
        config: SyncConfig,
    ) -> Self {
        let dedup = DeduplicationIndex::new(config.dedup_capacity);
        Self {
            inner: Arc::new(Inner {
                remote,
                fallback,
                consolidator: SessionConsolidator::new(),
                dedup,
                guard: SingleFlight::new(),
                config,
                counters: Counters::default(),
            }),
        }
    }

    /// Merges `payload` into the session's `stage` and persists the
    /// consolidated snapshot.
    ///
    /// A payload that cannot be serialized is rejected before any I/O.
    /// Remote store failures never surface here; the result is a
    /// `file://` fallback location instead. The only hard failures are
    /// [`SyncError::Serialization`] and [`SyncError::FallbackWrite`].
    pub async fn sync_stage(
        &self,
        session_id: i64,
        stage: StageName,
        payload: impl Serialize,
    ) -> SyncResult<StorageObject> {
        let payload = serde_json::to_value(payload).map_err(SyncError::serialization)?;

        let inner = &self.inner;
        inner
            .guard
            .run(session_id, || async move {
                inner.consolidator.merge(session_id, stage, payload);
                inner.persist(session_id, stage.as_str()).await
            })
            .await
    }

    /// Persists the complete consolidated document for the session.
    ///
    /// Runs the same pipeline as [`sync_stage`](Self::sync_stage)
    /// without merging anything; an unchanged document still resolves
    /// to the previously persisted object. Fails with
    /// [`SyncError::UnknownSession`] if no fragment has ever arrived.
    pub async fn finalize_session(&self, session_id: i64) -> SyncResult<StorageObject> {
        let inner = &self.inner;
        inner
            .guard
            .run(session_id, || async move {
                inner.persist(session_id, FINAL_LABEL).await
            })
            .await
    }

    /// Like [`sync_stage`](Self::sync_stage), but converts hard
    /// failures into an `error://` sentinel object so route handlers
    /// can always hand the caller *a* location without the workflow
    /// blocking on storage.
    pub async fn sync_stage_or_sentinel(
        &self,
        session_id: i64,
        stage: StageName,
        payload: impl Serialize,
    ) -> StorageObject {
        match self.sync_stage(session_id, stage, payload).await {
            Ok(object) => object,
            Err(err) => self.inner.sentinel(session_id, &err),
        }
    }

    /// Like [`finalize_session`](Self::finalize_session), returning an
    /// `error://` sentinel instead of a hard failure.
    pub async fn finalize_session_or_sentinel(&self, session_id: i64) -> StorageObject {
        match self.finalize_session(session_id).await {
            Ok(object) => object,
            Err(err) => self.inner.sentinel(session_id, &err),
        }
    }

    /// Reads back the bytes of the most recently persisted snapshot,
    /// from wherever the last persist landed.
    ///
    /// Returns `Ok(None)` if the session exists but has never been
    /// persisted.
    pub async fn fetch_snapshot(&self, session_id: i64) -> SyncResult<Option<Vec<u8>>> {
        let document = self
            .inner
            .consolidator
            .document(session_id)
            .ok_or(SyncError::UnknownSession(session_id))?;
        let Some(object) = document.last_object else {
            return Ok(None);
        };

        match &object.location {
            StoreLocation::Remote { .. } => {
                let data = self
                    .inner
                    .remote
                    .get(&object.key)
                    .await
                    .map_err(|e| SyncError::SnapshotUnavailable {
                        session_id,
                        reason: e.to_string(),
                    })?;
                Ok(Some(data.to_vec()))
            }
            StoreLocation::LocalFallback { path } => {
                let data = self
                    .inner
                    .fallback
                    .read(std::path::Path::new(path))
                    .await
                    .map_err(|e| SyncError::SnapshotUnavailable {
                        session_id,
                        reason: e.to_string(),
                    })?;
                Ok(Some(data))
            }
            StoreLocation::Unavailable { reason } => Err(SyncError::SnapshotUnavailable {
                session_id,
                reason: reason.clone(),
            }),
        }
    }

    /// Number of successful persists for the session, if it exists.
    pub fn session_version(&self, session_id: i64) -> Option<u64> {
        self.inner.consolidator.version(session_id)
    }

    /// Current engine counters.
    pub fn stats(&self) -> SyncStats {
        let counters = &self.inner.counters;
        SyncStats {
            remote_writes: counters.remote_writes.load(Ordering::Relaxed),
            dedup_hits: counters.dedup_hits.load(Ordering::Relaxed),
            short_circuits: counters.short_circuits.load(Ordering::Relaxed),
            fallback_writes: counters.fallback_writes.load(Ordering::Relaxed),
            dedup_entries: self.inner.dedup.len() as u64,
            dedup_evictions: self.inner.dedup.evictions(),
        }
    }
}

impl Inner {
    /// Persists the session's current snapshot, walking the
    /// short-circuit → dedup → remote → fallback ladder.
    async fn persist(&self, session_id: i64, label: &str) -> SyncResult<StorageObject> {
        let (bytes, digest) = self.consolidator.snapshot(session_id)?;

        if let Some(object) = self.consolidator.unchanged_object(session_id, &digest) {
            self.counters.short_circuits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                target: TRACING_TARGET,
                session_id,
                digest = %digest,
                "Snapshot unchanged since last persist"
            );
            return Ok(object);
        }

        let key = self.remote_key(&digest);

        if let Some(url) = self.dedup.lookup(&digest) {
            self.counters.dedup_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                target: TRACING_TARGET,
                session_id,
                digest = %digest,
                url = %url,
                "Identical content already stored; reusing artifact"
            );
            let object = self.storage_object(&key, StoreLocation::Remote { url }, &digest, &bytes);
            self.consolidator
                .mark_persisted(session_id, digest, object.clone());
            return Ok(object);
        }

        match self.put_remote(&key, &bytes).await {
            Ok(url) => {
                self.counters.remote_writes.fetch_add(1, Ordering::Relaxed);
                self.dedup.record(digest.clone(), url.clone());
                tracing::info!(
                    target: TRACING_TARGET,
                    session_id,
                    digest = %digest,
                    url = %url,
                    size = bytes.len(),
                    "Snapshot persisted to remote store"
                );
                let object =
                    self.storage_object(&key, StoreLocation::Remote { url }, &digest, &bytes);
                self.consolidator
                    .mark_persisted(session_id, digest, object.clone());
                Ok(object)
            }
            Err(err) => {
                if err.is_transient() {
                    tracing::warn!(
                        target: TRACING_TARGET,
                        session_id,
                        error = %err,
                        "Remote store unreachable; degrading to local fallback"
                    );
                } else {
                    tracing::error!(
                        target: TRACING_TARGET,
                        session_id,
                        error = %err,
                        "Remote store rejected the write (auth or configuration); degrading to local fallback"
                    );
                }
                self.put_fallback(session_id, label, &key, &digest, &bytes)
                    .await
            }
        }
    }

    /// One remote attempt plus at most one retried attempt after a
    /// transient failure. Each attempt is bounded by the configured
    /// timeout so the session guard is never held across an unbounded
    /// wait.
    async fn put_remote(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        let mut retried = false;
        loop {
            let put = self
                .remote
                .put(key, Bytes::copy_from_slice(bytes), SNAPSHOT_CONTENT_TYPE);
            let result = match tokio::time::timeout(self.config.put_timeout, put).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(self.config.put_timeout)),
            };

            match result {
                Ok(url) => return Ok(url),
                Err(err) if !retried && err.is_transient() => {
                    retried = true;
                    tracing::warn!(
                        target: TRACING_TARGET,
                        key = %key,
                        error = %err,
                        "Transient remote failure; retrying once"
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn put_fallback(
        &self,
        session_id: i64,
        label: &str,
        key: &str,
        digest: &Digest,
        bytes: &[u8],
    ) -> SyncResult<StorageObject> {
        match self.fallback.put(session_id, label, bytes).await {
            Ok(path) => {
                self.counters.fallback_writes.fetch_add(1, Ordering::Relaxed);
                let location = StoreLocation::LocalFallback {
                    path: path.display().to_string(),
                };
                let object = self.storage_object(key, location, digest, bytes);
                // Local paths are not globally resolvable, so they never
                // enter the dedup index.
                self.consolidator
                    .mark_persisted(session_id, digest.clone(), object.clone());
                Ok(object)
            }
            Err(err) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    session_id,
                    error = %err,
                    "Fallback write failed; surfacing hard error"
                );
                Err(SyncError::fallback_write(session_id, err))
            }
        }
    }

    fn remote_key(&self, digest: &Digest) -> String {
        format!("{}/{digest}.json", self.config.remote_prefix)
    }

    fn storage_object(
        &self,
        key: &str,
        location: StoreLocation,
        digest: &Digest,
        bytes: &[u8],
    ) -> StorageObject {
        StorageObject {
            key: key.to_string(),
            location,
            digest: digest.clone(),
            size_bytes: bytes.len() as u64,
            content_type: SNAPSHOT_CONTENT_TYPE.to_string(),
            created_at: jiff::Timestamp::now(),
        }
    }

    fn sentinel(&self, session_id: i64, err: &SyncError) -> StorageObject {
        let digest = self
            .consolidator
            .snapshot(session_id)
            .map(|(_, digest)| digest)
            .unwrap_or_else(|_| fixly_core::digest(&[]));
        StorageObject {
            key: format!("session-{session_id}"),
            location: StoreLocation::Unavailable {
                reason: err.to_string(),
            },
            digest,
            size_bytes: 0,
            content_type: SNAPSHOT_CONTENT_TYPE.to_string(),
            created_at: jiff::Timestamp::now(),
        }
    }
}
