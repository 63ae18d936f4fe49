#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod digest;
mod document;
mod object;
mod stage;

#[doc(hidden)]
pub mod prelude;

pub use digest::{Digest, digest};
pub use document::{SessionDocument, SnapshotError};
pub use object::{StorageObject, StoreLocation};
pub use stage::StageName;

/// MIME type of every artifact this engine persists.
pub const SNAPSHOT_CONTENT_TYPE: &str = "application/json";
