//! The store trait consumed by the sync engine.

use bytes::Bytes;

use crate::error::StoreResult;

/// Uninterpreted key/bytes storage.
///
/// The engine talks to the remote store exclusively through this trait
/// so tests can substitute failure-injecting or invocation-counting
/// implementations. Keys are flat strings; no hierarchy is implied and
/// none may be relied upon.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `data` under `key` and returns the URL under which the
    /// bytes are resolvable.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<String>;

    /// Retrieves the bytes stored under `key`.
    async fn get(&self, key: &str) -> StoreResult<Bytes>;

    /// Whether an object exists under `key`.
    async fn exists(&self, key: &str) -> StoreResult<bool>;

    /// Deletes the object under `key`. Best-effort; not required for
    /// the engine's correctness.
    async fn delete(&self, key: &str) -> StoreResult<()>;

    /// Lists object keys under `prefix`.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>>;
}
