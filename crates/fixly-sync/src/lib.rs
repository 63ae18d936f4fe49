#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod consolidator;
mod dedup;
mod engine;
mod error;
mod single_flight;

#[doc(hidden)]
pub mod prelude;

pub use config::SyncConfig;
pub use consolidator::SessionConsolidator;
pub use dedup::DeduplicationIndex;
pub use engine::{SyncEngine, SyncStats};
pub use error::{SyncError, SyncResult};
pub use single_flight::SingleFlight;

/// Tracing target for sync engine operations.
pub const TRACING_TARGET: &str = "fixly_sync";
