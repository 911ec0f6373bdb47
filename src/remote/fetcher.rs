//! Single-shot JSON fetching over HTTP.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::{SyncError, SyncResult};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);

/// Issues one GET and decodes the body as JSON.
///
/// Implementations must not retry: a failure is reported immediately so the
/// resolver can move on to the next fallback tier.
pub trait Fetcher: Send + Sync {
  fn request_json<'a>(
    &'a self,
    url: &'a Url,
    timeout: Duration,
  ) -> BoxFuture<'a, SyncResult<Value>>;
}

/// reqwest-backed fetcher.
#[derive(Clone)]
pub struct HttpFetcher {
  client: reqwest::Client,
}

impl HttpFetcher {
  pub fn new() -> SyncResult<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("bfsync/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| SyncError::Network(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Self { client })
  }
}

fn network_error(url: &Url, timeout: Duration, err: reqwest::Error) -> SyncError {
  if err.is_timeout() {
    SyncError::Network(format!(
      "request to {} timed out after {} ms",
      url,
      timeout.as_millis()
    ))
  } else {
    SyncError::Network(format!("request to {} failed: {}", url, err))
  }
}

impl Fetcher for HttpFetcher {
  fn request_json<'a>(
    &'a self,
    url: &'a Url,
    timeout: Duration,
  ) -> BoxFuture<'a, SyncResult<Value>> {
    async move {
      debug!(%url, "GET");

      let response = self
        .client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| network_error(url, timeout, e))?;

      let status = response.status();
      if !status.is_success() {
        return Err(SyncError::HttpStatus {
          status: status.as_u16(),
          url: url.to_string(),
        });
      }

      let body = response
        .bytes()
        .await
        .map_err(|e| network_error(url, timeout, e))?;

      Ok(serde_json::from_slice(&body)?)
    }
    .boxed()
  }
}
