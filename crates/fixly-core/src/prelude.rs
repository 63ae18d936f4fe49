//! Prelude module for convenient imports.

pub use crate::digest::{Digest, digest};
pub use crate::document::{SessionDocument, SnapshotError};
pub use crate::object::{StorageObject, StoreLocation};
pub use crate::stage::StageName;
