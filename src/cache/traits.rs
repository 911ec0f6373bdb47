//! Result types describing where resolved data came from.

/// Result from a resolver, including data and metadata about the source.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Create a new cache result from a cache hit.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
    }
  }

  /// Create a new cache result from the bundled dataset.
  pub fn bundled(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Bundled,
    }
  }

  pub fn into_inner(self) -> T {
    self.data
  }

  /// True when the data was fetched from the origin during this call.
  pub fn is_fresh(&self) -> bool {
    self.source == CacheSource::Network
  }
}

/// Indicates where resolved data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Persisted copy served without touching the network
  Cache,
  /// Offline mode - network failed, serving the persisted copy
  Offline,
  /// Network and cache both unavailable, serving the shipped dataset
  Bundled,
}

impl std::fmt::Display for CacheSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      Self::Network => "network",
      Self::Cache => "cache",
      Self::Offline => "offline cache",
      Self::Bundled => "bundled dataset",
    };
    f.write_str(name)
  }
}
