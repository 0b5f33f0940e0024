use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{
    cache::DEFAULT_CACHE_TTL_MS,
    http::DEFAULT_USER_AGENT,
    lang::Language,
    location::Coordinate,
    provider::ApiVersion,
    retry::RetryConfig,
};

/// Environment variable that overrides the stored API key.
pub const API_KEY_ENV: &str = "OWM_API_KEY";

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Settings for the HTTP client itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host of the API, without `/data/...`.
    pub base_url: String,
    /// Explicit `lang` code; taken from the process locale when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
    /// How long a cached response is served, in milliseconds.
    pub cache_ttl_ms: i64,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            language: None,
            user_agent: None,
            timeout_secs: 30,
            cache_ttl_ms: DEFAULT_CACHE_TTL_MS,
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    /// The configured language, or the one the current locale maps to.
    pub fn language(&self) -> Language {
        self.language.clone().unwrap_or_else(Language::from_env)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(|| DEFAULT_USER_AGENT.to_string())
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// api_version = "onecall-3.0"
///
/// [default_location]
/// latitude = 33.749
/// longitude = -84.388
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,

    /// Detected by `owm configure`; never set by hand in normal use.
    pub api_version: Option<ApiVersion>,

    pub default_location: Option<Coordinate>,

    #[serde(default)]
    pub client: ClientConfig,
}

impl Config {
    /// The API key, preferring `OWM_API_KEY` over the stored one.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_with_override(env::var(API_KEY_ENV).ok())
    }

    pub fn api_key_with_override(&self, env_key: Option<String>) -> Result<String> {
        env_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
            .ok_or_else(|| {
                anyhow!(
                    "No API key configured.\n\
                     Hint: run `owm configure` or set {API_KEY_ENV}."
                )
            })
    }

    pub fn api_version(&self) -> Result<ApiVersion> {
        self.api_version.ok_or_else(|| {
            anyhow!(
                "No API version configured.\n\
                 Hint: run `owm configure` to detect the versions your API key can use."
            )
        })
    }

    /// Store a key together with the version detected for it.
    pub fn set_api_key(&mut self, api_key: String, version: ApiVersion) {
        self.api_key = Some(api_key);
        self.api_version = Some(version);
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.api_version.is_some()
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "owm", "owm-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
