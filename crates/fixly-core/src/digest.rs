//! Content addressing for persisted artifacts.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// SHA-256 digest of an artifact's exact bytes, rendered as 64 lowercase
/// hex characters.
///
/// Two byte-identical payloads always produce equal digests; this is the
/// load-bearing property behind deduplication and the unchanged-snapshot
/// short-circuit, so the digest is always computed over the full payload
/// rather than any size/timestamp heuristic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Returns the hex form of this digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

/// Computes the content digest of `bytes`.
///
/// Pure and deterministic; no I/O.
pub fn digest(bytes: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Digest(hex::encode(hasher.finalize()))
}
