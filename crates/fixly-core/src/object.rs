//! Storage object records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// Where the bytes of a [`StorageObject`] ended up.
///
/// Rendered as a URI whose scheme tells the caller what it is holding:
/// `https://`/`objstore://` for the remote store, `file://` for the
/// local fallback, `error://` for a persist attempt that exhausted every
/// degradation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreLocation {
    /// Globally resolvable URL in the remote object store.
    Remote {
        /// Public URL returned by the store.
        url: String,
    },
    /// Path in the local fallback area.
    LocalFallback {
        /// Absolute filesystem path of the artifact.
        path: String,
    },
    /// No store accepted the bytes; the reason is carried for logging.
    Unavailable {
        /// Human-readable failure summary.
        reason: String,
    },
}

impl StoreLocation {
    /// Returns the location as a URI string.
    pub fn uri(&self) -> String {
        match self {
            Self::Remote { url } => url.clone(),
            Self::LocalFallback { path } => format!("file://{path}"),
            Self::Unavailable { reason } => format!("error://{reason}"),
        }
    }

    /// Whether this location resolves to remotely fetchable bytes.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Whether this location is a local fallback artifact.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::LocalFallback { .. })
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// Immutable record of one persist operation.
///
/// Created at the moment bytes are successfully written (remote or
/// local) and never updated in place; a changed document produces a new
/// `StorageObject` with a new digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageObject {
    /// Logical, human-readable name chosen by the caller. Not used for
    /// addressing correctness.
    pub key: String,
    /// Where the bytes live.
    pub location: StoreLocation,
    /// Digest of the exact bytes stored.
    pub digest: Digest,
    /// Payload size in bytes.
    pub size_bytes: u64,
    /// MIME type of the payload.
    pub content_type: String,
    /// When the bytes were written.
    pub created_at: jiff::Timestamp,
}

impl StorageObject {
    /// Returns the location URI.
    pub fn uri(&self) -> String {
        self.location.uri()
    }
}
