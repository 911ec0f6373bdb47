//! Test doubles shared by unit tests.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::error::{SyncError, SyncResult};
use crate::remote::Fetcher;

pub const TEST_BASE_URL: &str = "https://cdn.test/data/";

/// Fetcher answering from a per-path script and recording every request.
///
/// Paths are relative to [`TEST_BASE_URL`]; unscripted paths fail with a
/// network error, so a fresh fetcher behaves like an unreachable host.
#[derive(Default)]
pub struct ScriptedFetcher {
  script: Mutex<HashMap<String, SyncResult<Value>>>,
  requests: Mutex<Vec<Url>>,
}

impl ScriptedFetcher {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(&self, path: &str, body: Value) {
    self
      .script
      .lock()
      .unwrap()
      .insert(path.to_string(), Ok(body));
  }

  pub fn fail(&self, path: &str, err: SyncError) {
    self
      .script
      .lock()
      .unwrap()
      .insert(path.to_string(), Err(err));
  }

  pub fn go_offline(&self, path: &str) {
    self.script.lock().unwrap().remove(path);
  }

  pub fn requests(&self) -> Vec<Url> {
    self.requests.lock().unwrap().clone()
  }

  pub fn requests_for(&self, path: &str) -> Vec<Url> {
    self
      .requests()
      .into_iter()
      .filter(|url| relative_path(url) == path)
      .collect()
  }

  pub fn request_count(&self) -> usize {
    self.requests.lock().unwrap().len()
  }
}

fn relative_path(url: &Url) -> String {
  let base = Url::parse(TEST_BASE_URL).unwrap();
  url
    .path()
    .strip_prefix(base.path())
    .unwrap_or(url.path())
    .to_string()
}

impl Fetcher for ScriptedFetcher {
  fn request_json<'a>(
    &'a self,
    url: &'a Url,
    _timeout: Duration,
  ) -> BoxFuture<'a, SyncResult<Value>> {
    async move {
      self.requests.lock().unwrap().push(url.clone());
      let path = relative_path(url);
      self
        .script
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or_else(|| Err(SyncError::Network(format!("{} unreachable", url))))
    }
    .boxed()
  }
}
