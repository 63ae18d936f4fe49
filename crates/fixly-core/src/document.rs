//! The consolidated per-session document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::digest::Digest;
use crate::object::StorageObject;
use crate::stage::StageName;

/// Failure to serialize a session snapshot.
#[derive(Debug, thiserror::Error)]
#[error("snapshot serialization failed: {0}")]
pub struct SnapshotError(#[from] serde_json::Error);

/// Consolidated state of one repair journey.
///
/// Stage payloads may arrive in any order and each stage may be written
/// multiple times; [`merge_stage`](Self::merge_stage) is last-write-wins
/// per stage. `version` and the `last_*` fields change only when a
/// snapshot is successfully persisted, never on merge, so an in-flight
/// or failed persist leaves them untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    /// External session identity, owned by the caller's database.
    pub session_id: i64,
    /// Per-stage payloads. A `BTreeMap` keeps snapshot bytes stable
    /// regardless of arrival order.
    pub stages: BTreeMap<StageName, Value>,
    /// Digest of the most recently persisted snapshot.
    pub last_digest: Option<Digest>,
    /// Record of the most recent successful persist.
    pub last_object: Option<StorageObject>,
    /// Incremented on every successful persist.
    pub version: u64,
}

/// The hashed portion of a session document.
///
/// Excludes the session id, `version`, digests, and timestamps so that
/// two sessions with identical stage content produce byte-identical
/// snapshots and dedup to a single remote artifact.
#[derive(Serialize)]
struct Snapshot<'a> {
    stages: &'a BTreeMap<StageName, Value>,
}

impl SessionDocument {
    /// Creates an empty document for `session_id`.
    pub fn new(session_id: i64) -> Self {
        Self {
            session_id,
            stages: BTreeMap::new(),
            last_digest: None,
            last_object: None,
            version: 0,
        }
    }

    /// Replaces the payload for `stage`, returning the previous payload
    /// if the stage had already been supplied.
    pub fn merge_stage(&mut self, stage: StageName, payload: Value) -> Option<Value> {
        self.stages.insert(stage, payload)
    }

    /// Serializes the document into its canonical snapshot bytes.
    ///
    /// Key ordering is stable at every nesting level, so equal stage
    /// content yields equal bytes. This is what makes the digest usable
    /// for change detection and cross-session dedup.
    pub fn snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let snapshot = Snapshot {
            stages: &self.stages,
        };
        Ok(serde_json::to_vec(&snapshot)?)
    }

    /// Records a successful persist of `object` and bumps the version.
    pub fn mark_persisted(&mut self, digest: Digest, object: StorageObject) {
        self.last_digest = Some(digest);
        self.last_object = Some(object);
        self.version += 1;
    }

    /// Whether the given digest matches the most recent persisted
    /// snapshot.
    pub fn is_unchanged(&self, digest: &Digest) -> bool {
        self.last_digest.as_ref() == Some(digest)
    }
}
