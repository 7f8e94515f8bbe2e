use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::DEFAULT_TTL_SECS;
use crate::remote::RetryPolicy;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub remote: RemoteConfig,
  #[serde(default)]
  pub local: LocalConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub retry: RetryConfig,
  #[serde(default)]
  pub images: ImagesConfig,
  #[serde(default)]
  pub admin: AdminConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteConfig {
  /// Service URL; the environment takes precedence. The access key is only
  /// ever read from the environment.
  pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalConfig {
  /// SQLite file (defaults to $XDG_DATA_HOME/storefront/store.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_secs: default_ttl_secs(),
    }
  }
}

fn default_ttl_secs() -> i64 {
  DEFAULT_TTL_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
  #[serde(default = "default_attempts")]
  pub attempts: u32,
  #[serde(default = "default_backoff_ms")]
  pub backoff_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      attempts: default_attempts(),
      backoff_ms: default_backoff_ms(),
    }
  }
}

fn default_attempts() -> u32 {
  3
}

fn default_backoff_ms() -> u64 {
  300
}

impl RetryConfig {
  pub fn policy(&self) -> RetryPolicy {
    RetryPolicy {
      attempts: self.attempts,
      backoff: Duration::from_millis(self.backoff_ms),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImagesConfig {
  /// Endpoint that deletes locally hosted product images
  pub delete_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
  pub password: Option<String>,
}

/// Connection details for the remote backend. Both parts are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
  pub url: String,
  pub key: String,
}

impl RemoteSettings {
  /// Settings only when both values are present and non-blank.
  pub fn from_parts(url: Option<String>, key: Option<String>) -> Option<Self> {
    let url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty())?;
    let key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty())?;
    Some(Self { url, key })
  }
}

/// First non-blank value among the named environment variables.
fn env_var(names: &[&str]) -> Option<String> {
  names
    .iter()
    .filter_map(|name| std::env::var(name).ok())
    .find(|v| !v.trim().is_empty())
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./storefront.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storefront/config.yaml
  ///
  /// With no file found the defaults apply; everything essential can come
  /// from the environment.
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

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("storefront.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storefront").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    // An empty file is valid YAML for "no settings"
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  /// Remote backend settings, if the backend is configured.
  ///
  /// URL: STOREFRONT_SUPABASE_URL, NEXT_PUBLIC_SUPABASE_URL, then `remote.url`.
  /// Key: STOREFRONT_SUPABASE_KEY, then NEXT_PUBLIC_SUPABASE_ANON_KEY.
  pub fn remote_settings(&self) -> Option<RemoteSettings> {
    let url = env_var(&["STOREFRONT_SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"])
      .or_else(|| self.remote.url.clone());
    let key = env_var(&["STOREFRONT_SUPABASE_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"]);
    RemoteSettings::from_parts(url, key)
  }

  /// Admin secret: STOREFRONT_ADMIN_PASSWORD, then `admin.password`.
  pub fn admin_password(&self) -> Option<String> {
    env_var(&["STOREFRONT_ADMIN_PASSWORD"])
      .or_else(|| self.admin.password.clone())
      .filter(|p| !p.is_empty())
  }

  pub fn local_path(&self) -> Result<PathBuf> {
    match &self.local.path {
      Some(path) => Ok(path.clone()),
      None => crate::local::SqliteStore::default_path(),
    }
  }

  pub fn cache_ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.cache.ttl_secs.max(0))
  }
}
