use anyhow::{Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::constants;

/// User preferences persisted in `config.toml`.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub api_key: Option<String>,
  pub region_code: Option<String>,
  pub theme_name: Option<String>,
  pub request_timeout_secs: Option<u64>,
}

fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "ytb")
}

impl Config {
  pub fn path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
  }

  pub fn load() -> Self {
    if let Some(config_file) = Self::path()
      && let Ok(content) = std::fs::read_to_string(config_file)
      && let Ok(config) = toml::from_str(&content)
    {
      return config;
    }
    Self::default()
  }

  pub fn save(&self) {
    if let Some(proj_dirs) = project_dirs() {
      let config_dir = proj_dirs.config_dir();
      if std::fs::create_dir_all(config_dir).is_ok() {
        let config_file = config_dir.join("config.toml");
        if let Ok(content) = toml::to_string(self) {
          let _ = std::fs::write(config_file, content);
        }
      }
    }
  }
}

/// Effective settings after merging the command line, environment and config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
  pub api_key: String,
  pub region_code: String,
  pub request_timeout: Option<Duration>,
}

fn non_blank(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl Settings {
  /// `cli_api_key` already covers `YOUTUBE_API_KEY` (clap reads the env var).
  /// There is no built-in key: without one, startup fails.
  pub fn resolve(cli_api_key: Option<&str>, cli_region: Option<&str>, config: &Config) -> Result<Self> {
    let api_key = non_blank(cli_api_key).or_else(|| non_blank(config.api_key.as_deref())).ok_or_else(|| {
      let location = Config::path().map(|p| p.display().to_string()).unwrap_or_else(|| "config.toml".to_string());
      anyhow!("No YouTube API key configured. Pass --api-key, set YOUTUBE_API_KEY, or add api_key to {}", location)
    })?;
    let region_code = non_blank(cli_region)
      .or_else(|| non_blank(config.region_code.as_deref()))
      .unwrap_or_else(|| constants().default_region_code.clone())
      .to_uppercase();
    let request_timeout = config.request_timeout_secs.filter(|&s| s > 0).map(Duration::from_secs);
    Ok(Self { api_key, region_code, request_timeout })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cli_key_wins_over_config() {
    let config = Config { api_key: Some("from-file".into()), ..Config::default() };
    let settings = Settings::resolve(Some("from-cli"), None, &config).unwrap();
    assert_eq!(settings.api_key, "from-cli");
  }

  #[test]
  fn config_key_used_when_cli_blank() {
    let config = Config { api_key: Some("from-file".into()), ..Config::default() };
    let settings = Settings::resolve(Some("   "), None, &config).unwrap();
    assert_eq!(settings.api_key, "from-file");
  }

  #[test]
  fn missing_key_is_an_error() {
    let err = Settings::resolve(None, None, &Config::default()).unwrap_err();
    assert!(err.to_string().contains("No YouTube API key configured"));

    let blank = Config { api_key: Some(String::new()), ..Config::default() };
    assert!(Settings::resolve(None, None, &blank).is_err());
  }

  #[test]
  fn region_defaults_and_precedence() {
    let config = Config { api_key: Some("k".into()), region_code: Some("gb".into()), ..Config::default() };
    assert_eq!(Settings::resolve(None, None, &config).unwrap().region_code, "GB");
    assert_eq!(Settings::resolve(None, Some("de"), &config).unwrap().region_code, "DE");

    let bare = Config { api_key: Some("k".into()), ..Config::default() };
    assert_eq!(Settings::resolve(None, None, &bare).unwrap().region_code, "US");
  }

  #[test]
  fn timeout_only_when_positive() {
    let mut config = Config { api_key: Some("k".into()), ..Config::default() };
    assert_eq!(Settings::resolve(None, None, &config).unwrap().request_timeout, None);
    config.request_timeout_secs = Some(0);
    assert_eq!(Settings::resolve(None, None, &config).unwrap().request_timeout, None);
    config.request_timeout_secs = Some(15);
    assert_eq!(Settings::resolve(None, None, &config).unwrap().request_timeout, Some(Duration::from_secs(15)));
  }

  #[test]
  fn config_round_trips_through_toml() {
    let config = Config {
      api_key: Some("k".into()),
      region_code: None,
      theme_name: Some("Paper".into()),
      request_timeout_secs: Some(10),
    };
    let text = toml::to_string(&config).unwrap();
    assert_eq!(toml::from_str::<Config>(&text).unwrap(), config);
  }
}
