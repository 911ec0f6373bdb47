//! Offline-first recipe client.
//!
//! Every read applies the same three tiers: remote fetch, then the last
//! persisted copy, then the bundled dataset. Errors never reach the caller;
//! `None` means all three tiers came up empty.

use color_eyre::{eyre::eyre, Result};
use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{
  CacheKey, CacheResult, KvStore, NoopStorage, SqliteStorage, CACHE_PREFIX, PRESERVED_KEYS,
  RECIPE_PREFIX,
};
use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::remote::{directory_url, Fetcher, HttpFetcher, RequestUrl, DEFAULT_TIMEOUT};

use super::bundled::{BundledDataset, INDEX_FILE, MANIFEST_FILE, RECIPES_DIR};
use super::normalize::{Normalize, Normalizer};
use super::types::{Document, IndexDocument, Manifest, RecipeDetail};

/// Outcome of [`RecipeSync::check_for_update`].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatus {
  /// A freshly fetched manifest carries a version different from the persisted one
  pub updated: bool,
  /// Version persisted before the check
  pub previous_version: Option<String>,
  /// The manifest resolved by the check (fresh, cached, or bundled)
  pub manifest: Option<Manifest>,
}

/// Recipe client with transparent caching and offline fallback.
#[derive(Clone)]
pub struct RecipeSync {
  store: KvStore,
  fetcher: Arc<dyn Fetcher>,
  bundled: Arc<BundledDataset>,
  normalizer: Normalizer,
  base_url: Url,
  timeout: Duration,
}

impl RecipeSync {
  pub fn new(
    base_url: Url,
    store: KvStore,
    fetcher: Arc<dyn Fetcher>,
    bundled: BundledDataset,
  ) -> Self {
    let base_url = directory_url(base_url);
    Self {
      store,
      fetcher,
      bundled: Arc::new(bundled),
      normalizer: Normalizer::new(base_url.clone()),
      base_url,
      timeout: DEFAULT_TIMEOUT,
    }
  }

  /// Set the per-request timeout.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Build a client from configuration: SQLite (or no-op) storage, HTTP
  /// fetching, and the embedded or configured bundled dataset.
  pub fn from_config(config: &Config) -> Result<Self> {
    let store = if config.cache.enabled {
      let storage = match &config.cache.path {
        Some(path) => SqliteStorage::open_at(path),
        None => SqliteStorage::open(),
      }
      .map_err(|e| eyre!("{}", e))?;
      KvStore::new(storage)
    } else {
      KvStore::new(NoopStorage)
    };

    let fetcher = HttpFetcher::new().map_err(|e| eyre!("{}", e))?;

    let bundled = match &config.bundled_dir {
      Some(dir) => BundledDataset::from_dir(dir),
      None => BundledDataset::embedded(),
    }
    .map_err(|e| eyre!("Failed to load bundled dataset: {}", e))?;

    Ok(
      Self::new(config.base_url()?, store, Arc::new(fetcher), bundled)
        .with_timeout(config.timeout()),
    )
  }

  pub fn store(&self) -> &KvStore {
    &self.store
  }

  /// Get the dataset manifest.
  ///
  /// A persisted manifest is returned without touching the network unless
  /// `force` is set. Every network request made here is cache-busted.
  pub async fn fetch_manifest(&self, force: bool) -> Option<CacheResult<Manifest>> {
    self
      .resolve(
        &CacheKey::Manifest,
        force,
        move || async move {
          let url = RequestUrl::new(&self.base_url, MANIFEST_FILE)?
            .cache_bust(true)
            .build();
          self.fetch_document::<Manifest>(&url).await
        },
        || self.bundled.manifest.clone(),
      )
      .await
  }

  /// Get the browsing index.
  ///
  /// On a miss the manifest is resolved first so its version can bust
  /// intermediary caches. The index has a single local slot.
  pub async fn fetch_index(&self, force: bool) -> Option<CacheResult<IndexDocument>> {
    self
      .resolve(
        &CacheKey::Index,
        force,
        move || async move {
          let version = self.fetch_manifest(false).await.map(|m| m.data.version);
          let url = RequestUrl::new(&self.base_url, INDEX_FILE)?
            .version(version.as_deref())
            .cache_bust(force)
            .build();
          self.fetch_document::<IndexDocument>(&url).await
        },
        || self.bundled.index.clone(),
      )
      .await
  }

  /// Get a single recipe.
  ///
  /// The cache slot is scoped to `(id, version)`. Without an explicit
  /// version the manifest's version is used, or the "no version" sentinel
  /// when no manifest can be resolved at all.
  pub async fn fetch_recipe(
    &self,
    id: &str,
    force: bool,
    version: Option<&str>,
  ) -> Option<CacheResult<RecipeDetail>> {
    if id.is_empty() {
      return None;
    }

    let version = match version.filter(|v| !v.is_empty()) {
      Some(v) => Some(v.to_string()),
      None => self.fetch_manifest(false).await.map(|m| m.data.version),
    };
    let key = CacheKey::recipe(id, version.as_deref());

    self
      .resolve(
        &key,
        force,
        move || async move {
          let url = RequestUrl::new(&self.base_url, &format!("{}/", RECIPES_DIR))?
            .segment(&format!("{}.json", id))
            .version(version.as_deref())
            .cache_bust(force)
            .build();
          let recipe = self.fetch_document::<RecipeDetail>(&url).await?;
          if recipe.id != id {
            return Err(SyncError::Decode(format!(
              "requested recipe {} but origin served {}",
              id, recipe.id
            )));
          }
          Ok(recipe)
        },
        || self.bundled.recipe(id).cloned(),
      )
      .await
  }

  /// Force-fetch the manifest and report whether its version moved.
  ///
  /// Only the manifest slot is refreshed; index and recipe caches are left
  /// for the caller to refresh.
  pub async fn check_for_update(&self) -> UpdateStatus {
    let previous_version = self.cached_version();
    let result = self.fetch_manifest(true).await;

    let updated = match &result {
      Some(fresh) if fresh.is_fresh() => {
        previous_version.as_deref() != Some(fresh.data.version.as_str())
      }
      _ => false,
    };

    if updated {
      info!(
        previous = previous_version.as_deref().unwrap_or("<none>"),
        current = result.as_ref().map(|r| r.data.version.as_str()).unwrap_or_default(),
        "dataset update available"
      );
    }

    UpdateStatus {
      updated,
      previous_version,
      manifest: result.map(CacheResult::into_inner),
    }
  }

  /// Version of the persisted manifest, if any.
  pub fn cached_version(&self) -> Option<String> {
    self
      .read_cached::<Manifest>(&CacheKey::Manifest)
      .map(|m| m.version)
  }

  /// Evict every recipe slot of every version. User data is kept.
  pub fn clear_recipe_cache(&self) -> bool {
    self.store.clear_by_prefix(RECIPE_PREFIX, PRESERVED_KEYS)
  }

  /// Evict manifest, index, and recipe slots. User data is kept.
  pub fn clear_all_cache(&self) -> bool {
    self.store.clear_by_prefix(CACHE_PREFIX, PRESERVED_KEYS)
  }

  /// Apply the cache / fetch / fallback policy for one slot.
  ///
  /// 1. Unless forced, a valid persisted copy is returned (normalized)
  /// 2. Otherwise `fetch` runs; on success the normalized result is persisted
  /// 3. On failure, the persisted copy, then the bundled document
  async fn resolve<T, F, Fut>(
    &self,
    key: &CacheKey,
    force: bool,
    fetch: F,
    bundled: impl FnOnce() -> Option<T>,
  ) -> Option<CacheResult<T>>
  where
    T: Document + Normalize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
  {
    if !force {
      if let Some(cached) = self.read_cached::<T>(key) {
        debug!(slot = %key.description(), "cache hit");
        return Some(CacheResult::from_cache(self.normalize_cached(key, cached)));
      }
    }

    match fetch().await {
      Ok(doc) => {
        let doc = self.normalize_owned(doc);
        if !self.store.set_json(&key.store_key(), &doc) {
          warn!(slot = %key.description(), "fetched document could not be cached");
        }
        Some(CacheResult::from_network(doc))
      }
      Err(e) => {
        warn!(slot = %key.description(), error = %e, "fetch failed, falling back");

        if let Some(cached) = self.read_cached::<T>(key) {
          return Some(CacheResult::offline(self.normalize_cached(key, cached)));
        }

        match bundled() {
          Some(doc) => {
            info!(slot = %key.description(), "serving bundled {}", T::KIND);
            Some(CacheResult::bundled(doc))
          }
          None => {
            warn!(slot = %key.description(), "{} unavailable", T::KIND);
            None
          }
        }
      }
    }
  }

  async fn fetch_document<T: Document>(&self, url: &Url) -> SyncResult<T> {
    debug!(%url, kind = T::KIND, "fetching");
    let value = self.fetcher.request_json(url, self.timeout).await?;
    T::from_value(value)
  }

  /// Read and validate a persisted document. Invalid entries are a miss.
  fn read_cached<T: Document>(&self, key: &CacheKey) -> Option<T> {
    let value: serde_json::Value = self.store.get_json(&key.store_key())?;
    match T::from_value(value) {
      Ok(doc) => Some(doc),
      Err(e) => {
        warn!(slot = %key.description(), error = %e, "ignoring invalid cached {}", T::KIND);
        None
      }
    }
  }

  fn normalize_owned<T: Normalize>(&self, doc: T) -> T {
    self.changed(&doc).unwrap_or(doc)
  }

  /// The normalized form of `doc`, or `None` if it is already canonical.
  fn changed<T: Normalize>(&self, doc: &T) -> Option<T> {
    match doc.normalize(&self.normalizer) {
      Cow::Owned(normalized) => Some(normalized),
      Cow::Borrowed(_) => None,
    }
  }

  /// Normalize a persisted copy, re-persisting it if normalization changed it.
  fn normalize_cached<T: Document + Normalize>(&self, key: &CacheKey, doc: T) -> T {
    let Some(normalized) = self.changed(&doc) else {
      return doc;
    };

    debug!(slot = %key.description(), "re-persisting normalized copy");
    if !self.store.set_json(&key.store_key(), &normalized) {
      warn!(slot = %key.description(), "normalized copy could not be cached");
    }
    normalized
  }
}
