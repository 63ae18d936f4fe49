//! Prelude module for convenient imports.

pub use crate::config::{AzblobConfig, FsConfig, GcsConfig, S3Config, StoreConfig};
pub use crate::error::{StoreError, StoreResult};
pub use crate::fallback::{LocalFallbackStore, PendingArtifact};
pub use crate::remote::RemoteStore;
pub use crate::store::BlobStore;
