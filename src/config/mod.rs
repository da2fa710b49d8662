//! Configuration management
//!
//! Loads and saves configuration from XDG-compliant paths.
//! Config location: ~/.config/coin-atlas/config.toml

pub mod defaults;

use crate::constants::db::{CLEAN_DATABASE_FILE, RAW_DATABASE_FILE};
use crate::constants::forum::EXCLUDED_CATEGORIES;
use crate::error::{Error, Result};
use chrono::Duration;
use defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Forum crawl settings
    #[serde(default)]
    pub forum: ForumConfig,

    /// HTTP client and rate limiting
    #[serde(default)]
    pub network: NetworkConfig,

    /// Geocoding service
    #[serde(default)]
    pub geocoder: GeocoderConfig,

    /// Where the databases live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Query defaults
    #[serde(default)]
    pub search: SearchConfig,

    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// URL generation settings
    #[serde(default)]
    pub url: UrlConfig,
}

/// Forum crawl settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumConfig {
    /// Index page listing the area sub-forums
    #[serde(default = "default_index_url")]
    pub index_url: String,

    /// Base URL relative links resolve against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Title prefix of sub-forums holding location categories
    #[serde(default = "default_area_prefix")]
    pub area_prefix: String,

    /// Category names that are never crawled
    #[serde(default = "default_excluded_categories")]
    pub excluded_categories: Vec<String>,

    /// Category whose entries are only temporarily available
    #[serde(default = "default_limited_category")]
    pub limited_category: String,

    /// Minutes before a visited category is crawled again
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,

    /// Save the raw database after this many new entries
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,

    /// Topics per listing page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// User-Agent header
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Minimum milliseconds between two requests to one service
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after a throttled response
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Geocoding service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    /// Nominatim-compatible base URL
    #[serde(default = "default_geocoder_url")]
    pub url: String,
}

/// Storage settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Data directory; empty means the XDG data dir
    #[serde(default)]
    pub data_dir: String,
}

/// Query defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results for nearest-N queries
    #[serde(default = "default_count")]
    pub default_count: usize,

    /// Radius for within-radius queries, in km
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,

    /// Hits listed in text summaries
    #[serde(default = "default_summary_limit")]
    pub summary_limit: usize,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: String,
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// URL generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlConfig {
    /// Default URL provider
    #[serde(default = "default_url_provider")]
    pub default: String,

    /// URL provider templates
    #[serde(default = "default_url_providers")]
    pub providers: HashMap<String, String>,
}

// Default value functions for serde
fn default_index_url() -> String {
    DEFAULT_INDEX_URL.to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_area_prefix() -> String {
    DEFAULT_AREA_PREFIX.to_string()
}
fn default_excluded_categories() -> Vec<String> {
    EXCLUDED_CATEGORIES.iter().map(|s| s.to_string()).collect()
}
fn default_limited_category() -> String {
    DEFAULT_LIMITED_CATEGORY.to_string()
}
fn default_cooldown_minutes() -> i64 {
    DEFAULT_COOLDOWN_MINUTES
}
fn default_checkpoint_every() -> usize {
    DEFAULT_CHECKPOINT_EVERY
}
fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_min_interval_ms() -> u64 {
    DEFAULT_MIN_INTERVAL_MS
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_geocoder_url() -> String {
    DEFAULT_GEOCODER_URL.to_string()
}
fn default_count() -> usize {
    DEFAULT_COUNT
}
fn default_radius_km() -> f64 {
    DEFAULT_RADIUS_KM
}
fn default_summary_limit() -> usize {
    DEFAULT_SUMMARY_LIMIT
}
fn default_format() -> String {
    DEFAULT_FORMAT.to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_url_provider() -> String {
    DEFAULT_URL_PROVIDER.to_string()
}
fn default_url_providers() -> HashMap<String, String> {
    let mut providers = HashMap::new();
    providers.insert(
        "google".to_string(),
        "https://maps.google.com/?q={lat},{lng}".to_string(),
    );
    providers.insert(
        "openstreetmap".to_string(),
        "https://www.openstreetmap.org/?mlat={lat}&mlon={lng}#map=18/{lat}/{lng}".to_string(),
    );
    providers.insert(
        "apple".to_string(),
        "https://maps.apple.com/?ll={lat},{lng}".to_string(),
    );
    providers
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            index_url: default_index_url(),
            base_url: default_base_url(),
            area_prefix: default_area_prefix(),
            excluded_categories: default_excluded_categories(),
            limited_category: default_limited_category(),
            cooldown_minutes: default_cooldown_minutes(),
            checkpoint_every: default_checkpoint_every(),
            page_size: default_page_size(),
        }
    }
}

impl ForumConfig {
    /// Cool-down window as a duration
    ///
    /// Fails for minute counts too large to represent.
    pub fn cooldown(&self) -> Result<Duration> {
        Duration::try_minutes(self.cooldown_minutes).ok_or_else(|| {
            Error::Config(format!("Cool-down out of range: {} minutes", self.cooldown_minutes))
        })
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            min_interval_ms: default_min_interval_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: default_geocoder_url(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_count: default_count(),
            default_radius_km: default_radius_km(),
            summary_limit: default_summary_limit(),
            format: default_format(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            default: default_url_provider(),
            providers: default_url_providers(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default path
    ///
    /// Creates default config if file doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read config file: {}", e))
            })?;

            toml::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse config file: {}", e))
            })
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| {
            Error::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content).map_err(|e| {
            Error::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Directory holding the raw and clean databases
    pub fn data_dir(&self) -> Result<PathBuf> {
        if !self.storage.data_dir.is_empty() {
            return Ok(PathBuf::from(&self.storage.data_dir));
        }
        dirs::data_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))
    }

    /// Path of the raw crawl database
    pub fn raw_database_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(RAW_DATABASE_FILE))
    }

    /// Path of the clean query database
    pub fn clean_database_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join(CLEAN_DATABASE_FILE))
    }

    /// Get a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns the value as a string, or None if not found
    pub fn get(&self, key: &str) -> Option<String> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["forum", "index_url"] => Some(self.forum.index_url.clone()),
            ["forum", "base_url"] => Some(self.forum.base_url.clone()),
            ["forum", "area_prefix"] => Some(self.forum.area_prefix.clone()),
            ["forum", "excluded_categories"] => Some(self.forum.excluded_categories.join(", ")),
            ["forum", "limited_category"] => Some(self.forum.limited_category.clone()),
            ["forum", "cooldown_minutes"] => Some(self.forum.cooldown_minutes.to_string()),
            ["forum", "checkpoint_every"] => Some(self.forum.checkpoint_every.to_string()),
            ["forum", "page_size"] => Some(self.forum.page_size.to_string()),

            ["network", "user_agent"] => Some(self.network.user_agent.clone()),
            ["network", "min_interval_ms"] => Some(self.network.min_interval_ms.to_string()),
            ["network", "timeout_secs"] => Some(self.network.timeout_secs.to_string()),
            ["network", "max_retries"] => Some(self.network.max_retries.to_string()),

            ["geocoder", "url"] => Some(self.geocoder.url.clone()),

            ["storage", "data_dir"] => Some(self.storage.data_dir.clone()),

            ["search", "default_count"] => Some(self.search.default_count.to_string()),
            ["search", "default_radius_km"] => Some(self.search.default_radius_km.to_string()),
            ["search", "summary_limit"] => Some(self.search.summary_limit.to_string()),
            ["search", "format"] => Some(self.search.format.clone()),

            ["server", "host"] => Some(self.server.host.clone()),
            ["server", "port"] => Some(self.server.port.to_string()),

            ["url", "default"] => Some(self.url.default.clone()),

            _ => None,
        }
    }

    /// Set a configuration value by key path
    ///
    /// Key format: "section.key"
    /// Returns error if key is invalid or value type is wrong
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["forum", "index_url"] => self.forum.index_url = value.to_string(),
            ["forum", "base_url"] => self.forum.base_url = value.to_string(),
            ["forum", "area_prefix"] => self.forum.area_prefix = value.to_string(),
            ["forum", "excluded_categories"] => {
                self.forum.excluded_categories = value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            ["forum", "limited_category"] => self.forum.limited_category = value.to_string(),
            ["forum", "cooldown_minutes"] => {
                let minutes: i64 = parse_value(value, "cooldown")?;
                if Duration::try_minutes(minutes).is_none() {
                    return Err(Error::Config(format!("Cool-down out of range: {} minutes", minutes)));
                }
                self.forum.cooldown_minutes = minutes;
            }
            ["forum", "checkpoint_every"] => {
                let every: usize = parse_value(value, "checkpoint")?;
                if every == 0 {
                    return Err(Error::Config("Checkpoint interval must be positive".to_string()));
                }
                self.forum.checkpoint_every = every;
            }
            ["forum", "page_size"] => self.forum.page_size = parse_value(value, "page size")?,

            ["network", "user_agent"] => self.network.user_agent = value.to_string(),
            ["network", "min_interval_ms"] => {
                self.network.min_interval_ms = parse_value(value, "interval")?;
            }
            ["network", "timeout_secs"] => {
                self.network.timeout_secs = parse_value(value, "timeout")?;
            }
            ["network", "max_retries"] => {
                self.network.max_retries = parse_value(value, "retries")?;
            }

            ["geocoder", "url"] => self.geocoder.url = value.to_string(),

            ["storage", "data_dir"] => self.storage.data_dir = value.to_string(),

            ["search", "default_count"] => {
                self.search.default_count = parse_value(value, "count")?;
            }
            ["search", "default_radius_km"] => {
                self.search.default_radius_km = parse_value(value, "radius")?;
            }
            ["search", "summary_limit"] => {
                self.search.summary_limit = parse_value(value, "summary limit")?;
            }
            ["search", "format"] => self.search.format = value.to_string(),

            ["server", "host"] => self.server.host = value.to_string(),
            ["server", "port"] => self.server.port = parse_value(value, "port")?,

            ["url", "default"] => self.url.default = value.to_string(),

            _ => {
                return Err(Error::Config(format!("Unknown config key: {}", key)));
            }
        }

        Ok(())
    }

    /// List all available config keys
    pub fn available_keys() -> Vec<&'static str> {
        vec![
            "forum.index_url",
            "forum.base_url",
            "forum.area_prefix",
            "forum.excluded_categories",
            "forum.limited_category",
            "forum.cooldown_minutes",
            "forum.checkpoint_every",
            "forum.page_size",
            "network.user_agent",
            "network.min_interval_ms",
            "network.timeout_secs",
            "network.max_retries",
            "geocoder.url",
            "storage.data_dir",
            "search.default_count",
            "search.default_radius_km",
            "search.summary_limit",
            "search.format",
            "server.host",
            "server.port",
            "url.default",
        ]
    }

    /// Format a URL using the specified provider
    ///
    /// Replaces {lat} and {lng} placeholders with actual values
    pub fn format_url(&self, provider: Option<&str>, lat: f64, lng: f64) -> Result<String> {
        let provider_name = provider.unwrap_or(&self.url.default);

        let template = self.url.providers.get(provider_name).ok_or_else(|| {
            Error::Config(format!("Unknown URL provider: {}", provider_name))
        })?;

        Ok(template
            .replace("{lat}", &lat.to_string())
            .replace("{lng}", &lng.to_string()))
    }

    /// Get server address as "host:port"
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_value<T: std::str::FromStr>(value: &str, what: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid {} value: {}", what, value)))
}
