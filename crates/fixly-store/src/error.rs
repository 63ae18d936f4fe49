//! Store error types.

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while talking to a store backend.
///
/// [`is_transient`](StoreError::is_transient) classifies each error for
/// the engine's retry policy: transient errors (timeouts, throttling,
/// 5xx-style backend failures) are worth one retried attempt before
/// falling back, permanent errors (auth, configuration) go straight to
/// fallback. Either way the engine never surfaces these to its caller
/// as hard failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to initialize the storage backend.
    #[error("store initialization failed: {0}")]
    Init(String),

    /// The operation exceeded its deadline.
    #[error("store operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The backend is rate limiting us.
    #[error("store throttled: {0}")]
    Throttled(String),

    /// Object not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Authentication or authorization failure.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Write operation failed.
    #[error("write failed: {0}")]
    Write(String),

    /// Read operation failed.
    #[error("read failed: {0}")]
    Read(String),

    /// Delete operation failed.
    #[error("delete failed: {0}")]
    Delete(String),

    /// List operation failed.
    #[error("list failed: {0}")]
    List(String),

    /// Invalid key or path.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Backend-specific error.
    #[error("backend error: {0}")]
    Backend(opendal::Error),
}

impl StoreError {
    /// Creates a new initialization error.
    pub fn init(msg: impl Into<String>) -> Self {
        Self::Init(msg.into())
    }

    /// Creates a new write error.
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Creates a new read error.
    pub fn read(msg: impl Into<String>) -> Self {
        Self::Read(msg.into())
    }

    /// Creates a new invalid key error.
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Whether a retry of the same operation could plausibly succeed.
    ///
    /// Permanent failures (auth, misconfiguration, invalid keys) return
    /// `false` so the engine skips the retry and falls back immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Throttled(_) => true,
            Self::Backend(err) => err.is_temporary(),
            Self::Write(_) | Self::Read(_) | Self::Delete(_) | Self::List(_) => true,
            Self::Init(_) | Self::PermissionDenied(_) | Self::InvalidKey(_) | Self::NotFound(_) => {
                false
            }
        }
    }
}

impl From<opendal::Error> for StoreError {
    fn from(err: opendal::Error) -> Self {
        use opendal::ErrorKind;

        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(err.to_string()),
            ErrorKind::PermissionDenied => Self::PermissionDenied(err.to_string()),
            ErrorKind::RateLimited => Self::Throttled(err.to_string()),
            _ => Self::Backend(err),
        }
    }
}
