#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod error;
mod fallback;
mod remote;
mod store;

#[doc(hidden)]
pub mod prelude;

pub use config::{AzblobConfig, FsConfig, GcsConfig, S3Config, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use fallback::{LocalFallbackStore, PendingArtifact};
pub use remote::RemoteStore;
pub use store::BlobStore;

/// Tracing target for store operations.
pub const TRACING_TARGET: &str = "fixly_store";
