//! Error taxonomy for the sync layer.
//!
//! None of these escape a resolver: every variant is turned into fallback
//! progression at the resolver boundary.

/// Failure of a single fetch, decode, or storage step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
  /// Transport failure (DNS, connect, timeout, reset).
  #[error("Network error: {0}")]
  Network(String),
  /// The origin answered with a non-2xx status.
  #[error("HTTP {status} for {url}")]
  HttpStatus { status: u16, url: String },
  /// The body was not valid JSON or lacked required fields.
  #[error("Decode error: {0}")]
  Decode(String),
  /// The persistence backend failed.
  #[error("Storage error: {0}")]
  Storage(String),
}

impl From<serde_json::Error> for SyncError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}

impl From<rusqlite::Error> for SyncError {
  fn from(err: rusqlite::Error) -> Self {
    Self::Storage(err.to_string())
  }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
