use crate::core::error::{ConfigError, ReleaseResult, ResultExt};
use crate::utils;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SPACE: &str = "Spaces-1";

/// Connection settings for the deployment server
/// Searched in order: octo.toml, .octo.toml, .config/octo.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
  /// Server base URL (e.g. https://deploy.example.com)
  #[serde(default)]
  pub server: Option<String>,

  /// API key sent with every request
  #[serde(default)]
  pub api_key: Option<String>,

  /// Space the project lives in
  #[serde(default = "default_space")]
  pub space: String,

  /// Request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_space() -> String {
  DEFAULT_SPACE.to_string()
}

fn default_timeout_secs() -> u64 {
  30
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      server: None,
      api_key: None,
      space: default_space(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

/// Values supplied on the command line; they win over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
  pub server: Option<String>,
  pub api_key: Option<String>,
  pub space: Option<String>,
}

/// Fully resolved connection settings
#[derive(Debug, Clone)]
pub struct ServerSettings {
  pub server: String,
  pub api_key: Option<String>,
  pub space: String,
  pub timeout_secs: u64,
}

impl ClientConfig {
  /// Find config file in search order: octo.toml, .octo.toml, .config/octo.toml
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("octo.toml"),
      path.join(".octo.toml"),
      path.join(".config").join("octo.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load config from the first file found, or defaults when there is none
  pub fn load(path: &Path) -> ReleaseResult<Self> {
    let Some(config_path) = Self::find_config_path(path) else {
      tracing::debug!("no octo.toml found under {}", path.display());
      return Ok(Self::default());
    };

    let content = fs::read_to_string(&config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    let config: ClientConfig = toml_edit::de::from_str(&content).map_err(|e| ConfigError::Invalid {
      path: config_path.clone(),
      reason: e.to_string(),
    })?;

    tracing::debug!("loaded config from {}", config_path.display());
    Ok(config)
  }

  /// Layer environment variables over the file values
  pub fn apply_env(mut self) -> Self {
    self.apply_env_from(|key| std::env::var(key).ok());
    self
  }

  fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(server) = lookup("OCTOPUS_URL").filter(|s| !s.trim().is_empty()) {
      self.server = Some(server);
    }
    if let Some(api_key) = lookup("OCTOPUS_API_KEY").filter(|s| !s.trim().is_empty()) {
      self.api_key = Some(api_key);
    }
    if let Some(space) = lookup("OCTOPUS_SPACE").filter(|s| !s.trim().is_empty()) {
      self.space = space;
    }
  }

  /// Apply command-line overrides and validate the server URL
  pub fn resolve(self, overrides: &ConfigOverrides, searched: &Path) -> ReleaseResult<ServerSettings> {
    let server = overrides
      .server
      .clone()
      .or(self.server)
      .ok_or_else(|| ConfigError::MissingServer {
        searched: searched.to_path_buf(),
      })?;

    if !utils::is_http_url(&server) {
      return Err(ConfigError::InvalidServer { server }.into());
    }

    Ok(ServerSettings {
      server: utils::trim_server_url(&server),
      api_key: overrides.api_key.clone().or(self.api_key),
      space: overrides.space.clone().unwrap_or(self.space),
      timeout_secs: self.timeout_secs,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::error::ReleaseError;
  use tempfile::TempDir;

  #[test]
  fn test_load_without_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = ClientConfig::load(dir.path()).unwrap();
    assert!(config.server.is_none());
    assert_eq!(config.space, DEFAULT_SPACE);
    assert_eq!(config.timeout_secs, 30);
  }

  #[test]
  fn test_load_prefers_root_file() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".config")).unwrap();
    std::fs::write(
      dir.path().join(".config").join("octo.toml"),
      "server = \"https://nested.example.com\"\n",
    )
    .unwrap();
    std::fs::write(
      dir.path().join("octo.toml"),
      "server = \"https://root.example.com\"\nspace = \"Spaces-2\"\n",
    )
    .unwrap();

    let config = ClientConfig::load(dir.path()).unwrap();
    assert_eq!(config.server.as_deref(), Some("https://root.example.com"));
    assert_eq!(config.space, "Spaces-2");
  }

  #[test]
  fn test_invalid_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("octo.toml"), "timeout_secs = \"soon\"\n").unwrap();

    let err = ClientConfig::load(dir.path()).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(ConfigError::Invalid { .. })));
  }

  #[test]
  fn test_env_then_overrides() {
    let mut config = ClientConfig {
      server: Some("https://file.example.com".to_string()),
      ..Default::default()
    };
    config.apply_env_from(|key| match key {
      "OCTOPUS_URL" => Some("https://env.example.com/".to_string()),
      "OCTOPUS_API_KEY" => Some("API-ENV".to_string()),
      _ => None,
    });

    let overrides = ConfigOverrides {
      space: Some("Spaces-9".to_string()),
      ..Default::default()
    };
    let settings = config.resolve(&overrides, Path::new(".")).unwrap();
    assert_eq!(settings.server, "https://env.example.com");
    assert_eq!(settings.api_key.as_deref(), Some("API-ENV"));
    assert_eq!(settings.space, "Spaces-9");
  }

  #[test]
  fn test_resolve_requires_http_server() {
    let config = ClientConfig {
      server: Some("deploy.example.com".to_string()),
      ..Default::default()
    };
    let err = config.resolve(&ConfigOverrides::default(), Path::new(".")).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(ConfigError::InvalidServer { .. })));

    let err = ClientConfig::default()
      .resolve(&ConfigOverrides::default(), Path::new("."))
      .unwrap_err();
    assert!(matches!(err, ReleaseError::Config(ConfigError::MissingServer { .. })));
  }
}
