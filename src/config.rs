//! Configuration management for City Map Fetcher
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! environment variables, then command-line flags (applied by the CLI).
//! Durations in the file use humantime syntax such as `"30s"` or `"5m"`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{CacheConfig, ClientConfig, FetcherConfig};
use crate::constants::{endpoints, env, fetcher, http, limits, themes};
use crate::errors::{AppError, ConfigError, Result};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Cache settings
    pub cache: CacheConfigToml,
    /// HTTP adapter settings
    pub client: ClientConfigToml,
    /// Fetch timeouts
    pub fetcher: FetcherConfigToml,
    /// Theme settings
    pub themes: ThemesConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfigToml {
    /// Cache directory path (OS cache directory if unset)
    pub cache_root: Option<PathBuf>,
    /// Serialize concurrent fetches of the same city and radius
    pub reserve_keys: bool,
    /// Minimum age before a leftover staging file is cleaned up
    #[serde(with = "humantime_serde")]
    pub orphan_min_age: Duration,
}

impl Default for CacheConfigToml {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            cache_root: defaults.cache_root,
            reserve_keys: defaults.reserve_keys,
            orphan_min_age: defaults.orphan_min_age,
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Nominatim-compatible search endpoint
    pub nominatim_url: String,
    /// Overpass interpreter endpoint
    pub overpass_url: String,
    /// TCP keep-alive (None = disabled)
    #[serde(with = "humantime_serde")]
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout (None = no timeout)
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            nominatim_url: endpoints::NOMINATIM_URL.to_string(),
            overpass_url: endpoints::OVERPASS_URL.to_string(),
            tcp_keepalive: Some(Duration::from_secs(30)),
            tcp_nodelay: true,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// TOML-friendly fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfigToml {
    #[serde(with = "humantime_serde")]
    pub geocode_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub network_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub feature_timeout: Duration,
}

impl Default for FetcherConfigToml {
    fn default() -> Self {
        Self {
            geocode_timeout: fetcher::GEOCODE_TIMEOUT,
            network_timeout: fetcher::NETWORK_TIMEOUT,
            feature_timeout: fetcher::FEATURE_TIMEOUT,
        }
    }
}

/// Theme settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemesConfigToml {
    /// Directory holding `<name>.json` theme files
    pub directory: PathBuf,
    /// Theme used when none is given on the command line
    pub default_theme: String,
}

impl Default for ThemesConfigToml {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(themes::DEFAULT_THEMES_DIR),
            default_theme: themes::DEFAULT_THEME.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Convert TOML-friendly configuration to runtime configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a fetcher timeout is zero
    pub fn to_runtime_config(&self) -> Result<(CacheConfig, ClientConfig, FetcherConfig)> {
        let fetcher_config = self.fetcher.to_runtime_config();
        fetcher_config.validate()?;
        Ok((
            self.cache.to_runtime_config(),
            self.client.to_runtime_config(),
            fetcher_config,
        ))
    }

    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, or the first one found)
    /// 3. Environment variables
    pub async fn load(config_file_override: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let config_path = match config_file_override {
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        if let Some(path) = config_path {
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                config = Self::load_from_file(&path).await?;
            } else if config_file_override.is_some() {
                return Err(ConfigError::NotFound { path }.into());
            }
        }

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply `CITYMAP_*` overrides using the given variable lookup
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = value(env::CACHE_DIR) {
            debug!("{} overrides cache root", env::CACHE_DIR);
            self.cache.cache_root = Some(PathBuf::from(dir));
        }
        if let Some(dir) = value(env::THEMES_DIR) {
            debug!("{} overrides themes directory", env::THEMES_DIR);
            self.themes.directory = PathBuf::from(dir);
        }
        if let Some(url) = value(env::NOMINATIM_URL) {
            self.client.nominatim_url = url;
        }
        if let Some(url) = value(env::OVERPASS_URL) {
            self.client.overpass_url = url;
        }
    }

    /// Write a commented default config file if none exists yet
    pub async fn initialize_default_file(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::generic(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(|e| {
                AppError::generic(format!(
                    "Failed to write config file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        info!("Created default configuration file: {}", path.display());
        Ok(true)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from("./citymap-fetcher.toml")];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// The per-user config file path, if the platform has a config directory
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("citymap-fetcher").join("config.toml"))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::generic(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::InvalidFormat)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Generate default configuration content with helpful comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# City Map Fetcher Configuration
# Every setting is optional; missing values fall back to the defaults below.

[cache]
# Cache directory (leave unset to use the system cache directory)
# cache_root = "/path/to/custom/cache"

# Serialize concurrent fetches of the same city and radius
reserve_keys = true

# Leftover staging files younger than this are never cleaned up
orphan_min_age = "1h"

[client]
nominatim_url = "{}"
overpass_url = "{}"
tcp_keepalive = "30s"
tcp_nodelay = true
pool_idle_timeout = "90s"
pool_max_per_host = {}
request_timeout = "{}s"
connect_timeout = "{}s"
# Nominatim's usage policy allows one request per second
rate_limit_rps = {}

[fetcher]
geocode_timeout = "{}s"
network_timeout = "{}s"
feature_timeout = "{}s"

[themes]
directory = "{}"
default_theme = "{}"

[logging]
level = "info"  # error, warn, info, debug, trace
"#,
            endpoints::NOMINATIM_URL,
            endpoints::OVERPASS_URL,
            http::POOL_MAX_PER_HOST,
            http::DEFAULT_TIMEOUT.as_secs(),
            http::CONNECT_TIMEOUT.as_secs(),
            limits::DEFAULT_RATE_LIMIT_RPS,
            fetcher::GEOCODE_TIMEOUT.as_secs(),
            fetcher::NETWORK_TIMEOUT.as_secs(),
            fetcher::FEATURE_TIMEOUT.as_secs(),
            themes::DEFAULT_THEMES_DIR,
            themes::DEFAULT_THEME,
        )
    }
}

impl CacheConfigToml {
    /// Convert to runtime CacheConfig
    pub fn to_runtime_config(&self) -> CacheConfig {
        CacheConfig {
            cache_root: self.cache_root.clone(),
            reserve_keys: self.reserve_keys,
            orphan_min_age: self.orphan_min_age,
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            nominatim_url: self.nominatim_url.clone(),
            overpass_url: self.overpass_url.clone(),
            tcp_keepalive: self.tcp_keepalive,
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout,
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            rate_limit_rps: self.rate_limit_rps,
        }
    }
}

impl FetcherConfigToml {
    /// Convert to runtime FetcherConfig
    pub fn to_runtime_config(&self) -> FetcherConfig {
        FetcherConfig::default()
            .with_geocode_timeout(self.geocode_timeout)
            .with_network_timeout(self.network_timeout)
            .with_feature_timeout(self.feature_timeout)
    }
}
