use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::remote::DEFAULT_TIMEOUT;

/// Environment variable overriding `remote.base_url`.
pub const BASE_URL_ENV: &str = "BFSYNC_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub remote: RemoteConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Directory overriding the embedded seed dataset
  pub bundled_dir: Option<PathBuf>,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Static host serving manifest.json, recipes_index.json and recipes/
  pub base_url: String,
  /// Per-request timeout in milliseconds
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
  DEFAULT_TIMEOUT.as_millis() as u64
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// When false, nothing is persisted and every read goes to the network
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Database path (defaults to $XDG_DATA_HOME/bfsync/cache.db)
  pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      path: None,
    }
  }
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Directory for daily-rolling log files; stderr only when unset
  pub file: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./bfsync.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/bfsync/config.yaml
  ///
  /// With no file found, `BFSYNC_BASE_URL` alone is enough to run on defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let env_base_url = std::env::var(BASE_URL_ENV).ok();

    let config = match (path, env_base_url.as_deref()) {
      (Some(p), _) => Self::load_from_path(&p)?,
      (None, Some(url)) => Self::with_base_url(url),
      (None, None) => {
        return Err(eyre!(
          "No configuration file found. Create one at ~/.config/bfsync/config.yaml\n\
                 or set {} to the dataset base URL.",
          BASE_URL_ENV
        ))
      }
    };

    let config = match env_base_url {
      Some(url) => config.override_base_url(url),
      None => config,
    };

    config.validate()?;
    Ok(config)
  }

  /// Defaults with the given base URL.
  pub fn with_base_url(base_url: &str) -> Self {
    Self {
      remote: RemoteConfig {
        base_url: base_url.to_string(),
        timeout_ms: default_timeout_ms(),
      },
      cache: CacheConfig::default(),
      bundled_dir: None,
      log: LogConfig::default(),
    }
  }

  fn override_base_url(mut self, base_url: String) -> Self {
    self.remote.base_url = base_url;
    self
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("bfsync.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("bfsync").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  fn validate(&self) -> Result<()> {
    self.base_url()?;
    if self.remote.timeout_ms == 0 {
      return Err(eyre!("remote.timeout_ms must be greater than zero"));
    }
    Ok(())
  }

  /// The parsed remote base URL.
  pub fn base_url(&self) -> Result<Url> {
    Url::parse(&self.remote.base_url)
      .map_err(|e| eyre!("Invalid remote.base_url {:?}: {}", self.remote.base_url, e))
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.remote.timeout_ms)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_yaml_uses_defaults() {
    let config = Config::from_yaml("remote:\n  base_url: https://cdn.example.com/data/\n").unwrap();

    assert_eq!(config.timeout(), Duration::from_millis(8000));
    assert!(config.cache.enabled);
    assert!(config.cache.path.is_none());
    assert!(config.bundled_dir.is_none());
    assert!(config.log.file.is_none());
    assert_eq!(
      config.base_url().unwrap().as_str(),
      "https://cdn.example.com/data/"
    );
  }

  #[test]
  fn test_full_yaml() {
    let yaml = r#"
remote:
  base_url: https://cdn.example.com/data
  timeout_ms: 2500
cache:
  enabled: false
  path: /tmp/bf.db
bundled_dir: /opt/bfsync/seed
log:
  file: /var/log/bfsync
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.timeout(), Duration::from_millis(2500));
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.path.as_deref(), Some(Path::new("/tmp/bf.db")));
    assert_eq!(
      config.bundled_dir.as_deref(),
      Some(Path::new("/opt/bfsync/seed"))
    );
  }

  #[test]
  fn test_validation_rejects_bad_values() {
    let config = Config::with_base_url("not a url");
    assert!(config.validate().is_err());

    let mut config = Config::with_base_url("https://cdn.example.com/");
    config.remote.timeout_ms = 0;
    assert!(config.validate().is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
  }
}
