//! Offline-first synchronization for a versioned static recipe dataset.
//!
//! A [`RecipeSync`] reads the manifest, the browsing index, and individual
//! recipes from a static host, persisting every successful read and falling
//! back to the persisted copy and then to a bundled dataset when the host is
//! unreachable.

pub mod cache;
pub mod config;
pub mod error;
pub mod recipes;
pub mod remote;

#[cfg(test)]
mod testing;

pub use cache::{CacheResult, CacheSource, KvStore};
pub use config::Config;
pub use error::SyncError;
pub use recipes::{BundledDataset, RecipeSync, UpdateStatus};
