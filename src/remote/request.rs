//! Request URL shaping: base + relative path + cache-busting parameters.

use url::Url;

use crate::error::{SyncError, SyncResult};

/// Make `base` usable with [`Url::join`] for relative paths.
///
/// Without a trailing slash, `join` would replace the last path segment.
pub fn directory_url(mut base: Url) -> Url {
  if !base.path().ends_with('/') {
    let path = format!("{}/", base.path());
    base.set_path(&path);
  }
  base
}

/// Resolve a relative resource path against the remote base.
pub fn join_path(base: &Url, path: &str) -> SyncResult<Url> {
  let relative = path.trim_start_matches("./").trim_start_matches('/');
  // "./" keeps a scheme-like first segment (`host:port/..`) relative.
  base
    .join(&format!("./{}", relative))
    .map_err(|e| SyncError::Decode(format!("invalid resource path {:?}: {}", path, e)))
}

/// Builder for a remote document URL.
#[derive(Debug, Clone)]
pub struct RequestUrl {
  url: Url,
}

impl RequestUrl {
  pub fn new(base: &Url, path: &str) -> SyncResult<Self> {
    Ok(Self {
      url: join_path(base, path)?,
    })
  }

  /// Append one path segment, percent-encoding separators inside it.
  pub fn segment(mut self, segment: &str) -> Self {
    if let Ok(mut segments) = self.url.path_segments_mut() {
      segments.pop_if_empty().push(segment);
    }
    self
  }

  /// Add `v=<version>` when a version token is known.
  pub fn version(mut self, version: Option<&str>) -> Self {
    if let Some(v) = version.filter(|v| !v.is_empty()) {
      self.url.query_pairs_mut().append_pair("v", v);
    }
    self
  }

  /// Add `t=<unix millis>` to defeat intermediary caches.
  pub fn cache_bust(mut self, bust: bool) -> Self {
    if bust {
      let now = chrono::Utc::now().timestamp_millis();
      self
        .url
        .query_pairs_mut()
        .append_pair("t", &now.to_string());
    }
    self
  }

  pub fn build(self) -> Url {
    self.url
  }
}
