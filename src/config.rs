use chrono::Duration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub table: TableConfig,
  pub blob: Option<BlobConfig>,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Phone numbers allowed to modify records
  #[serde(default)]
  pub users: Vec<AuthorizedUser>,
  /// Year tags whose records are frozen (no edit, no delete)
  #[serde(default = "default_locked_years")]
  pub locked_years: Vec<String>,
}

fn default_locked_years() -> Vec<String> {
  vec!["1445".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableConfig {
  /// Datasheet base URL, e.g. https://aitable.ai/fusion/v1/datasheets/dst...
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
  pub account: String,
  pub container: String,
}

impl BlobConfig {
  pub fn base_url(&self) -> String {
    format!(
      "https://{}.blob.core.windows.net/{}",
      self.account, self.container
    )
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  #[serde(default = "default_ttl_hours")]
  pub ttl_hours: i64,
}

fn default_ttl_hours() -> i64 {
  24
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      ttl_hours: default_ttl_hours(),
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> Duration {
    Duration::hours(self.ttl_hours)
  }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AuthorizedUser {
  pub name: String,
  pub phone: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./eidx.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/eidx/config.yaml
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
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/eidx/config.yaml"
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("eidx.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("eidx").join("config.yaml");
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

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.cache.ttl_hours <= 0 {
      return Err(eyre!("cache.ttl_hours must be positive"));
    }
    Ok(config)
  }

  /// Get the datasheet API token from environment variables.
  ///
  /// Checks EIDX_API_TOKEN first, then AITABLE_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("EIDX_API_TOKEN")
      .or_else(|_| std::env::var("AITABLE_API_TOKEN"))
      .map_err(|_| {
        eyre!("API token not found. Set EIDX_API_TOKEN or AITABLE_API_TOKEN environment variable.")
      })
  }

  /// Get the blob shared-access signature (query string) from EIDX_BLOB_SAS.
  pub fn get_blob_sas() -> Result<String> {
    let sas = std::env::var("EIDX_BLOB_SAS")
      .map_err(|_| eyre!("Blob signature not found. Set EIDX_BLOB_SAS environment variable."))?;
    if sas.starts_with('?') {
      Ok(sas)
    } else {
      Ok(format!("?{}", sas))
    }
  }
}
