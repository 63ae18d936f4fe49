//! End-to-end tests for the sync engine against a counting mock store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use fixly_core::{StageName, StoreLocation};
use fixly_store::{BlobStore, LocalFallbackStore, StoreError, StoreResult};
use fixly_sync::{SyncConfig, SyncEngine, SyncError};
use serde_json::json;

/// In-memory store that counts put attempts and can inject failures
/// and latency.
#[derive(Default)]
struct MockStore {
    objects: std::sync::Mutex<HashMap<String, Bytes>>,
    puts: AtomicUsize,
    /// All puts fail with a permanent error while set.
    fail_puts: AtomicBool,
    /// The next N puts fail with a transient error.
    fail_next: AtomicUsize,
    /// The next put sleeps this many milliseconds before returning.
    delay_next_ms: AtomicUsize,
}

impl MockStore {
    fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl BlobStore for MockStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StoreResult<String> {
        self.puts.fetch_add(1, Ordering::SeqCst);

        let delay = self.delay_next_ms.swap(0, Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }

        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::PermissionDenied("injected auth failure".into()));
        }
        if self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::write("injected transient failure"));
        }

        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data);
        Ok(format!("https://store.test/{key}"))
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

fn test_config() -> SyncConfig {
    SyncConfig::default()
        .with_put_timeout(Duration::from_secs(2))
        .with_retry_backoff(Duration::from_millis(1))
}

fn engine_with(store: Arc<MockStore>, dir: &std::path::Path) -> SyncEngine {
    SyncEngine::new(store, LocalFallbackStore::new(dir), test_config())
}

#[tokio::test]
async fn idempotent_resync_skips_the_store() {
    let store = Arc::new(MockStore::default());
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store.clone(), dir.path());

    let first = engine
        .sync_stage(139, StageName::Submission, json!({"deviceType": "chair"}))
        .await
        .unwrap();
    let second = engine
        .sync_stage(139, StageName::Submission, json!({"deviceType": "chair"}))
        .await
        .unwrap();

    assert_eq!(first.digest, second.digest);
    assert_eq!(first.location, second.location);
    assert_eq!(store.put_count(), 1);
    assert_eq!(engine.stats().short_circuits, 1);
    assert_eq!(engine.session_version(139), Some(1));
}

#[tokio::test]
async fn identical_content_dedups_across_sessions() {
    let store = Arc::new(MockStore::default());
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store.clone(), dir.path());

    engine
        .sync_stage(1, StageName::Submission, json!({"deviceType": "chair"}))
        .await
        .unwrap();
    let first = engine.finalize_session(1).await.unwrap();

    engine
        .sync_stage(2, StageName::Submission, json!({"deviceType": "chair"}))
        .await
        .unwrap();
    let second = engine.finalize_session(2).await.unwrap();

    assert_eq!(first.digest, second.digest);
    assert_eq!(first.uri(), second.uri());
    // One write for the shared content; session 2 is pure dedup hits.
    assert_eq!(store.put_count(), 1);
    assert!(engine.stats().dedup_hits >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn racing_writers_produce_one_write() {
    let store = Arc::new(MockStore::default());
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store.clone(), dir.path());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .sync_stage(7, StageName::Diagnostics, json!({"cause": "broken leg"}))
                .await
                .unwrap()
        }));
    }

    let mut digests = Vec::new();
    for handle in handles {
        digests.push(handle.await.unwrap().digest);
    }

    assert_eq!(store.put_count(), 1);
    assert!(digests.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn remote_failure_degrades_to_fallback() {
    let store = Arc::new(MockStore::default());
    store.fail_puts.store(true, Ordering::SeqCst);
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store.clone(), dir.path());
    let fallback = LocalFallbackStore::new(dir.path());

    let object = engine
        .sync_stage(42, StageName::Submission, json!({"deviceType": "kettle"}))
        .await
        .unwrap();

    let StoreLocation::LocalFallback { path } = &object.location else {
        panic!("expected fallback location, got {}", object.uri());
    };
    assert!(object.uri().starts_with("file://"));

    // Bytes are recoverable from disk and contain the stage payload.
    let bytes = fallback.read(std::path::Path::new(path)).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["stages"]["submission"]["deviceType"], "kettle");
    assert_eq!(fallback.pending().await.unwrap().len(), 1);
}

#[tokio::test]
async fn fallback_results_never_enter_the_dedup_index() {
    let store = Arc::new(MockStore::default());
    store.fail_puts.store(true, Ordering::SeqCst);
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store.clone(), dir.path());

    engine
        .sync_stage(1, StageName::Submission, json!({"deviceType": "chair"}))
        .await
        .unwrap();
    assert_eq!(engine.stats().fallback_writes, 1);
    assert_eq!(engine.stats().dedup_entries, 0);

    // After the store recovers, identical content from another session
    // must be uploaded rather than resolved to a file:// path.
    store.fail_puts.store(false, Ordering::SeqCst);
    let object = engine
        .sync_stage(2, StageName::Submission, json!({"deviceType": "chair"}))
        .await
        .unwrap();
    assert!(object.location.is_remote());
    assert_eq!(engine.stats().remote_writes, 1);
}

#[tokio::test]
async fn transient_failure_is_retried_once() {
    let store = Arc::new(MockStore::default());
    store.fail_next.store(1, Ordering::SeqCst);
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store.clone(), dir.path());

    let object = engine
        .sync_stage(5, StageName::Submission, json!({"deviceType": "lamp"}))
        .await
        .unwrap();

    assert!(object.location.is_remote());
    // First attempt failed, retried attempt succeeded.
    assert_eq!(store.put_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_session_does_not_block_other_sessions() {
    let store = Arc::new(MockStore::default());
    store.delay_next_ms.store(500, Ordering::SeqCst);
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store.clone(), dir.path());

    let slow_engine = engine.clone();
    let slow = tokio::spawn(async move {
        slow_engine
            .sync_stage(1, StageName::Submission, json!({"deviceType": "chair"}))
            .await
            .unwrap()
    });
    // Give the slow put time to enter the store.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = tokio::time::Instant::now();
    engine
        .sync_stage(2, StageName::Submission, json!({"deviceType": "table"}))
        .await
        .unwrap();
    assert!(
        started.elapsed() < Duration::from_millis(250),
        "session 2 waited on session 1"
    );
    assert!(!slow.is_finished(), "session 1 should still be in flight");

    slow.await.unwrap();
}

#[tokio::test]
async fn example_scenario_is_reproducible() {
    let run = || async {
        let store = Arc::new(MockStore::default());
        let dir = tempfile::tempdir().unwrap();
        let engine = engine_with(store.clone(), dir.path());

        engine
            .sync_stage(139, StageName::Submission, json!({"deviceType": "chair"}))
            .await
            .unwrap();
        engine
            .sync_stage(139, StageName::Diagnostics, json!({"cause": "broken leg"}))
            .await
            .unwrap();
        let object = engine.finalize_session(139).await.unwrap();

        let bytes = engine.fetch_snapshot(139).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["stages"]["submission"]["deviceType"], "chair");
        assert_eq!(value["stages"]["diagnostics"]["cause"], "broken leg");

        object.digest
    };

    let first = run().await;
    let second = run().await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn unserializable_payload_is_rejected_before_io() {
    let store = Arc::new(MockStore::default());
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store.clone(), dir.path());

    // JSON object keys must be strings; tuple keys cannot serialize.
    let payload = HashMap::from([((1, 2), "value")]);
    let err = engine
        .sync_stage(1, StageName::Analytics, payload)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Serialization(_)));
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn exhausted_fallback_surfaces_hard_error_and_sentinel() {
    let store = Arc::new(MockStore::default());
    store.fail_puts.store(true, Ordering::SeqCst);
    // A fallback directory that cannot be created.
    let engine = SyncEngine::new(
        store.clone(),
        LocalFallbackStore::new("/proc/fixly-no-such-dir"),
        test_config(),
    );

    let err = engine
        .sync_stage(9, StageName::Submission, json!({"deviceType": "chair"}))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::FallbackWrite { session_id: 9, .. }));

    let sentinel = engine
        .sync_stage_or_sentinel(9, StageName::Submission, json!({"deviceType": "chair"}))
        .await;
    assert!(sentinel.uri().starts_with("error://"));

    // The failure does not poison the session: once storage recovers
    // the same call succeeds.
    store.fail_puts.store(false, Ordering::SeqCst);
    let object = engine
        .sync_stage(9, StageName::Submission, json!({"deviceType": "chair"}))
        .await
        .unwrap();
    assert!(object.location.is_remote());
}

#[tokio::test]
async fn finalize_of_unknown_session_fails() {
    let store = Arc::new(MockStore::default());
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store, dir.path());

    assert_eq!(
        engine.finalize_session(404).await.unwrap_err(),
        SyncError::UnknownSession(404)
    );
}

#[tokio::test]
async fn version_counts_successful_persists() {
    let store = Arc::new(MockStore::default());
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(store, dir.path());

    assert_eq!(engine.session_version(11), None);

    engine
        .sync_stage(11, StageName::Submission, json!({"deviceType": "chair"}))
        .await
        .unwrap();
    engine
        .sync_stage(11, StageName::Diagnostics, json!({"cause": "broken leg"}))
        .await
        .unwrap();
    assert_eq!(engine.session_version(11), Some(2));

    // Finalizing an unchanged document short-circuits and does not
    // count as a new persist.
    engine.finalize_session(11).await.unwrap();
    assert_eq!(engine.session_version(11), Some(2));
}
