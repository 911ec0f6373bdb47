//! Local persistence for the sync layer.
//!
//! This module provides a document-agnostic cache that:
//! - Stores opaque string values under string keys in a pluggable backend
//! - Never surfaces backend failures to callers (reads miss, writes report `false`)
//! - Scopes recipe slots to the dataset version that produced them
//! - Supports prefix eviction that spares user data such as favorites

mod keys;
mod storage;
mod store;
mod traits;

pub use keys::{
  CacheKey, CACHE_PREFIX, FAVORITES_KEY, NO_VERSION, PRESERVED_KEYS, PROFILE_KEY, RECIPE_PREFIX,
};
pub use storage::{KvBackend, MemoryStorage, NoopStorage, SqliteStorage};
pub use store::KvStore;
pub use traits::{CacheResult, CacheSource};
