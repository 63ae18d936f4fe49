//! Local fallback store.

use std::path::{Path, PathBuf};

use crate::TRACING_TARGET;
use crate::error::{StoreError, StoreResult};

/// A fallback artifact sitting on local disk, awaiting re-upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingArtifact {
    /// Session the artifact belongs to.
    pub session_id: i64,
    /// Absolute path of the artifact file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size_bytes: u64,
}

/// Writes artifacts to a local directory when the remote store is
/// unavailable.
///
/// Layout is `{base_dir}/{session_id}/{label}_{timestamp}.json`. Write
/// failures here are hard failures for the operation; there is no
/// further degradation path. An external job can drain
/// [`pending`](Self::pending) once the remote store recovers.
#[derive(Debug, Clone)]
pub struct LocalFallbackStore {
    base_dir: PathBuf,
}

impl LocalFallbackStore {
    /// Creates a fallback store rooted at `base_dir`.
    ///
    /// The directory is created lazily on first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the root directory of this store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Writes `data` for `session_id`, returning the absolute path of
    /// the artifact file.
    pub async fn put(&self, session_id: i64, label: &str, data: &[u8]) -> StoreResult<PathBuf> {
        let dir = self.base_dir.join(session_id.to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::write(format!("create {}: {e}", dir.display())))?;

        let timestamp = jiff::Timestamp::now().as_millisecond();
        let path = dir.join(format!("{label}_{timestamp}.json"));
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| StoreError::write(format!("write {}: {e}", path.display())))?;

        tracing::warn!(
            target: TRACING_TARGET,
            session_id,
            path = %path.display(),
            size = data.len(),
            "Artifact written to local fallback"
        );

        Ok(path)
    }

    /// Reads back the bytes of a fallback artifact.
    pub async fn read(&self, path: &Path) -> StoreResult<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::read(format!("read {}: {e}", path.display())))
    }

    /// Lists every artifact currently sitting in the fallback area.
    pub async fn pending(&self) -> StoreResult<Vec<PendingArtifact>> {
        let mut artifacts = Vec::new();

        let mut sessions = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            // Nothing has ever been written; not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(artifacts),
            Err(e) => {
                return Err(StoreError::List(format!(
                    "read {}: {e}",
                    self.base_dir.display()
                )));
            }
        };

        while let Some(entry) = sessions
            .next_entry()
            .await
            .map_err(|e| StoreError::List(e.to_string()))?
        {
            let Some(session_id) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<i64>().ok())
            else {
                continue;
            };

            let mut files = tokio::fs::read_dir(entry.path())
                .await
                .map_err(|e| StoreError::List(e.to_string()))?;
            while let Some(file) = files
                .next_entry()
                .await
                .map_err(|e| StoreError::List(e.to_string()))?
            {
                let metadata = file
                    .metadata()
                    .await
                    .map_err(|e| StoreError::List(e.to_string()))?;
                if metadata.is_file() {
                    artifacts.push(PendingArtifact {
                        session_id,
                        path: file.path(),
                        size_bytes: metadata.len(),
                    });
                }
            }
        }

        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_writes_under_session_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFallbackStore::new(dir.path());

        let path = store.put(139, "submission", b"{\"a\":1}").await.unwrap();
        assert!(path.starts_with(dir.path().join("139")));
        assert_eq!(store.read(&path).await.unwrap(), b"{\"a\":1}");
    }

    #[tokio::test]
    async fn pending_lists_written_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFallbackStore::new(dir.path());
        assert!(store.pending().await.unwrap().is_empty());

        store.put(1, "submission", b"{}").await.unwrap();
        store.put(2, "diagnostics", b"{}").await.unwrap();

        let mut pending = store.pending().await.unwrap();
        pending.sort_by_key(|artifact| artifact.session_id);
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].session_id, 1);
        assert_eq!(pending[1].session_id, 2);
        assert_eq!(pending[0].size_bytes, 2);
    }

    #[tokio::test]
    async fn put_into_unwritable_dir_fails() {
        let store = LocalFallbackStore::new("/proc/fixly-nonexistent");
        let err = store.put(1, "submission", b"{}").await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
    }
}
