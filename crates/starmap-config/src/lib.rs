// starmap-config - Layered configuration for the starmap service
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from STARMAP_CONFIG env var
// 3. Config file contents from STARMAP_CONFIG_CONTENT env var
// 4. Default config file locations (./config.toml, ./.starmap.toml)
// 5. Built-in defaults (lowest priority)
//
// CLI flags are applied on top by the binary.

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};

/// Main runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(
        default = "BackendConfig::primary",
        deserialize_with = "BackendSection::primary"
    )]
    pub primary: BackendConfig,

    #[serde(
        default = "BackendConfig::fallback",
        deserialize_with = "BackendSection::fallback"
    )]
    pub fallback: BackendConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            primary: BackendConfig::primary(),
            fallback: BackendConfig::fallback(),
            cache: CacheConfig::default(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

/// Starred-repository source (GitHub REST API)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub api_base: String,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_wave_width")]
    pub wave_width: usize,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_size() -> u32 {
    100
}

fn default_wave_width() -> usize {
    3
}

fn default_max_pages() -> u32 {
    50
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            token: None,
            page_size: default_page_size(),
            wave_width: default_wave_width(),
            max_pages: default_max_pages(),
            timeout_secs: default_upstream_timeout_secs(),
        }
    }
}

/// One named text-generation backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub api_base: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl BackendConfig {
    /// Default primary backend: fast model, 60s deadline
    pub fn primary() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            timeout_secs: 60,
        }
    }

    /// Default fallback backend: more capable model, 90s deadline
    pub fn fallback() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o".to_string(),
            temperature: 0.2,
            max_tokens: 8192,
            timeout_secs: 90,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A `[primary]` / `[fallback]` table as written. Missing keys keep the
/// role's built-in value.
#[derive(Debug, Default, Deserialize)]
struct BackendSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

impl BackendSection {
    fn primary<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BackendConfig, D::Error> {
        Ok(Self::deserialize(deserializer)?.overlay(BackendConfig::primary()))
    }

    fn fallback<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BackendConfig, D::Error> {
        Ok(Self::deserialize(deserializer)?.overlay(BackendConfig::fallback()))
    }

    fn overlay(self, base: BackendConfig) -> BackendConfig {
        BackendConfig {
            api_base: self.api_base.unwrap_or(base.api_base),
            api_key: self.api_key.or(base.api_key),
            model: self.model.unwrap_or(base.model),
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
            timeout_secs: self.timeout_secs.unwrap_or(base.timeout_secs),
        }
    }
}

/// Cache and coalescing lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub stars_ttl_secs: u64,
    pub categories_ttl_secs: u64,
    pub coalesce_grace_secs: u64,
}

impl CacheConfig {
    pub fn stars_ttl(&self) -> Duration {
        Duration::from_secs(self.stars_ttl_secs)
    }

    pub fn categories_ttl(&self) -> Duration {
        Duration::from_secs(self.categories_ttl_secs)
    }

    pub fn coalesce_grace(&self) -> Duration {
        Duration::from_secs(self.coalesce_grace_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stars_ttl_secs: 3600,
            categories_ttl_secs: 3600,
            coalesce_grace_secs: 60,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load from an explicit file path (CLI `--config`), then apply env overrides
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Parse TOML content without consulting the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}
