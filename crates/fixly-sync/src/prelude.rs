//! Prelude module for convenient imports.

pub use crate::config::SyncConfig;
pub use crate::engine::{SyncEngine, SyncStats};
pub use crate::error::{SyncError, SyncResult};

pub use fixly_core::prelude::*;
pub use fixly_store::prelude::*;
