use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `api_base_url`.
pub const BASE_URL_ENV: &str = "API_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Root every resource path is appended to (e.g. `https://api.example.com`)
  #[serde(default)]
  pub api_base_url: String,
  /// Per-request timeout. Unset means the HTTP client's own default.
  pub request_timeout_secs: Option<u64>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub session: SessionConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// Age after which a cached read is refetched even without invalidation
  pub stale_time_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
  /// SQLite file backing the session store (defaults to the data directory)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Write logs to this file instead of stderr
  pub file: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file, then apply environment overrides.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fieldlink.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fieldlink/config.yaml
  ///
  /// With no file found, `API_BASE_URL` alone is enough to build a config.
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

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::from_base_url(String::new()),
    };

    config.with_env_overrides(std::env::var(BASE_URL_ENV).ok())
  }

  /// Config with defaults for everything except the base URL.
  pub fn from_base_url(api_base_url: impl Into<String>) -> Self {
    Self {
      api_base_url: api_base_url.into(),
      request_timeout_secs: None,
      cache: CacheConfig::default(),
      session: SessionConfig::default(),
      log: LogConfig::default(),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("fieldlink.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fieldlink").join("config.yaml");
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
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Apply the base URL override and normalize. A base URL that is present
  /// must parse; an absent one only fails once a network command asks for it.
  fn with_env_overrides(mut self, base_url: Option<String>) -> Result<Self> {
    if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
      self.api_base_url = url;
    }

    self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
    if !self.api_base_url.is_empty() {
      url::Url::parse(&self.api_base_url)
        .map_err(|e| eyre!("Invalid API base URL '{}': {}", self.api_base_url, e))?;
    }

    Ok(self)
  }

  /// The base URL, required by everything that talks to the backend.
  pub fn base_url(&self) -> Result<&str> {
    if self.api_base_url.is_empty() {
      return Err(eyre!(
        "No API base URL configured. Set api_base_url in ~/.config/fieldlink/config.yaml \
         or the {} environment variable.",
        BASE_URL_ENV
      ));
    }
    Ok(&self.api_base_url)
  }

  pub fn request_timeout(&self) -> Option<Duration> {
    self.request_timeout_secs.map(Duration::from_secs)
  }

  pub fn stale_time(&self) -> Option<Duration> {
    self.cache.stale_time_secs.map(Duration::from_secs)
  }

  /// Location of the session database.
  pub fn session_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.session.path {
      return Ok(path.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("fieldlink").join("session.db"))
  }
}
