//! Infallible key-value facade over a storage backend.

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::warn;

use super::storage::KvBackend;

/// Persistent key-value store used by every resolver.
///
/// No operation ever returns an error: reads fall back to the supplied
/// default and writes report success as a `bool`. Failures are logged.
#[derive(Clone)]
pub struct KvStore {
  backend: Arc<dyn KvBackend>,
}

impl KvStore {
  pub fn new(backend: impl KvBackend + 'static) -> Self {
    Self {
      backend: Arc::new(backend),
    }
  }

  pub fn from_arc(backend: Arc<dyn KvBackend>) -> Self {
    Self { backend }
  }

  /// Read `key`, returning `None` when missing or unreadable.
  pub fn get(&self, key: &str) -> Option<String> {
    match self.backend.get(key) {
      Ok(value) => value,
      Err(e) => {
        warn!(key, error = %e, "cache read failed");
        None
      }
    }
  }

  /// Read `key`, returning `default` when missing or unreadable.
  pub fn get_or(&self, key: &str, default: String) -> String {
    self.get(key).unwrap_or(default)
  }

  pub fn set(&self, key: &str, value: &str) -> bool {
    match self.backend.set(key, value) {
      Ok(()) => true,
      Err(e) => {
        warn!(key, error = %e, "cache write failed");
        false
      }
    }
  }

  pub fn remove(&self, key: &str) -> bool {
    match self.backend.remove(key) {
      Ok(()) => true,
      Err(e) => {
        warn!(key, error = %e, "cache remove failed");
        false
      }
    }
  }

  /// Delete every key starting with `prefix`, except those in `keep`.
  ///
  /// Zero matching keys is a successful no-op.
  pub fn clear_by_prefix(&self, prefix: &str, keep: &[&str]) -> bool {
    let keys = match self.backend.keys() {
      Ok(keys) => keys,
      Err(e) => {
        warn!(prefix, error = %e, "cache key enumeration failed");
        return false;
      }
    };

    let doomed: Vec<String> = keys
      .into_iter()
      .filter(|k| k.starts_with(prefix) && !keep.contains(&k.as_str()))
      .collect();

    if doomed.is_empty() {
      return true;
    }

    match self.backend.remove_many(&doomed) {
      Ok(()) => true,
      Err(e) => {
        warn!(prefix, count = doomed.len(), error = %e, "cache prefix clear failed");
        false
      }
    }
  }

  /// Read and decode a JSON value. Undecodable entries count as a miss.
  pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = self.get(key)?;
    match serde_json::from_str(&raw) {
      Ok(value) => Some(value),
      Err(e) => {
        warn!(key, error = %e, "discarding undecodable cache entry");
        None
      }
    }
  }

  pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
      Ok(raw) => self.set(key, &raw),
      Err(e) => {
        warn!(key, error = %e, "failed to serialize cache entry");
        false
      }
    }
  }
}
