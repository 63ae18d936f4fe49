//! Engine error types.

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced to callers of the sync engine.
///
/// Remote store failures are never in this set; they are absorbed by
/// the fallback path. Only two things are hard failures: a payload that
/// cannot be serialized (rejected before any I/O) and a fallback write
/// that failed after the remote store already had (no further
/// degradation path exists).
///
/// The type is `Clone` so a single failure can fan out to every caller
/// waiting on the same in-flight operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The payload could not be serialized to JSON.
    #[error("payload serialization failed: {0}")]
    Serialization(String),

    /// The local fallback write failed; the operation is lost unless
    /// the caller retries.
    #[error("fallback write failed for session {session_id}: {reason}")]
    FallbackWrite {
        /// Session whose artifact could not be written.
        session_id: i64,
        /// Underlying store error, rendered.
        reason: String,
    },

    /// The session has never received a fragment.
    #[error("unknown session: {0}")]
    UnknownSession(i64),

    /// The most recently persisted snapshot could not be read back.
    #[error("snapshot unavailable for session {session_id}: {reason}")]
    SnapshotUnavailable {
        /// Session whose snapshot was requested.
        session_id: i64,
        /// Underlying failure, rendered.
        reason: String,
    },
}

impl SyncError {
    /// Creates a new serialization error.
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Creates a new fallback write error.
    pub fn fallback_write(session_id: i64, err: impl std::fmt::Display) -> Self {
        Self::FallbackWrite {
            session_id,
            reason: err.to_string(),
        }
    }
}
