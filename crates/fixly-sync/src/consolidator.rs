//! In-memory session consolidation.

use std::collections::HashMap;
use std::sync::RwLock;

use fixly_core::{Digest, SessionDocument, StageName, StorageObject, digest};
use serde_json::Value;

use crate::TRACING_TARGET;
use crate::error::{SyncError, SyncResult};

/// Accumulates partial session fragments into one canonical document
/// per session.
///
/// Documents live for the process lifetime; deletion is an external
/// collaborator concern. Mutation of any single document happens inside
/// that session's guard critical section, so per-session merge order
/// matches caller admission order; the map lock here only protects the
/// registry across unrelated sessions and is never held across an
/// await.
#[derive(Debug, Default)]
pub struct SessionConsolidator {
    sessions: RwLock<HashMap<i64, SessionDocument>>,
}

impl SessionConsolidator {
    /// Creates an empty consolidator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges `payload` into the document for `session_id`, creating
    /// the document on first contact. Last write wins per stage.
    pub fn merge(&self, session_id: i64, stage: StageName, payload: Value) {
        let mut sessions = self.sessions.write().expect("session registry poisoned");
        let document = sessions
            .entry(session_id)
            .or_insert_with(|| SessionDocument::new(session_id));
        let replaced = document.merge_stage(stage, payload).is_some();

        tracing::debug!(
            target: TRACING_TARGET,
            session_id,
            stage = stage.as_str(),
            replaced,
            "Merged stage fragment"
        );
    }

    /// Serializes the current document and computes its content digest.
    pub fn snapshot(&self, session_id: i64) -> SyncResult<(Vec<u8>, Digest)> {
        let sessions = self.sessions.read().expect("session registry poisoned");
        let document = sessions
            .get(&session_id)
            .ok_or(SyncError::UnknownSession(session_id))?;
        let bytes = document.snapshot().map_err(SyncError::serialization)?;
        let digest = digest(&bytes);
        Ok((bytes, digest))
    }

    /// Returns the previously persisted object if `digest` matches the
    /// most recent successful persist for the session.
    pub fn unchanged_object(&self, session_id: i64, digest: &Digest) -> Option<StorageObject> {
        let sessions = self.sessions.read().expect("session registry poisoned");
        let document = sessions.get(&session_id)?;
        if document.is_unchanged(digest) {
            document.last_object.clone()
        } else {
            None
        }
    }

    /// Records a successful persist for the session.
    pub fn mark_persisted(&self, session_id: i64, digest: Digest, object: StorageObject) {
        let mut sessions = self.sessions.write().expect("session registry poisoned");
        if let Some(document) = sessions.get_mut(&session_id) {
            document.mark_persisted(digest, object);
        }
    }

    /// Returns the persist count for the session, if it exists.
    pub fn version(&self, session_id: i64) -> Option<u64> {
        let sessions = self.sessions.read().expect("session registry poisoned");
        sessions.get(&session_id).map(|document| document.version)
    }

    /// Returns a copy of the session document, if it exists.
    pub fn document(&self, session_id: i64) -> Option<SessionDocument> {
        let sessions = self.sessions.read().expect("session registry poisoned");
        sessions.get(&session_id).cloned()
    }
}
