//! Store key construction for the cache namespace.

use sha2::{Digest, Sha256};

/// Prefix shared by every cache slot.
pub const CACHE_PREFIX: &str = "cache:";

/// Prefix shared by every version-scoped recipe slot.
pub const RECIPE_PREFIX: &str = "cache:recipe:";

/// Version token used when no manifest version is known.
pub const NO_VERSION: &str = "0";

/// User data living next to the cache that eviction must never touch.
pub const FAVORITES_KEY: &str = "favorites";
pub const PROFILE_KEY: &str = "profile";

/// Keys that prefix clears always keep.
pub const PRESERVED_KEYS: &[&str] = &[FAVORITES_KEY, PROFILE_KEY];

/// Logical cache slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheKey {
  /// The single manifest slot
  Manifest,
  /// The single index slot, overwritten on every refresh
  Index,
  /// One slot per (recipe id, dataset version)
  Recipe { id: String, version: String },
}

impl CacheKey {
  /// Build a recipe slot key. A missing version maps to [`NO_VERSION`].
  pub fn recipe(id: &str, version: Option<&str>) -> Self {
    Self::Recipe {
      id: id.to_string(),
      version: version
        .filter(|v| !v.is_empty())
        .unwrap_or(NO_VERSION)
        .to_string(),
    }
  }

  /// The concrete key written to the store.
  pub fn store_key(&self) -> String {
    match self {
      Self::Manifest => format!("{}manifest", CACHE_PREFIX),
      Self::Index => format!("{}index", CACHE_PREFIX),
      Self::Recipe { id, version } => {
        // SHA256 hash so ids containing separators cannot collide
        let mut hasher = Sha256::new();
        hasher.update(version.as_bytes());
        hasher.update([0u8]);
        hasher.update(id.as_bytes());
        format!("{}{}", RECIPE_PREFIX, hex::encode(hasher.finalize()))
      }
    }
  }

  /// Human-readable description for logs.
  pub fn description(&self) -> String {
    match self {
      Self::Manifest => "manifest".to_string(),
      Self::Index => "recipe index".to_string(),
      Self::Recipe { id, version } => format!("recipe {} @ {}", id, version),
    }
  }
}
