use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub stations: StationsConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Output volume applied at startup, 0..=100.
    #[serde(default = "default_volume")]
    pub default_volume: u8,
}

/// Where the station list lives on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    /// Path to the stations JSON file.
    /// Defaults to `$XDG_CONFIG_HOME/tuner/stations.json`.
    #[serde(default = "default_stations_file")]
    pub file: PathBuf,
}

/// Remote station-directory endpoint (radio-browser API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_base_url")]
    pub base_url: String,
    /// Result cap per search request.
    #[serde(default = "default_directory_limit")]
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Budget for resolving a candidate URL into a stream URL.
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,
    /// Budget per directory search request.
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,
}

impl NetworkConfig {
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
        }
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            file: default_stations_file(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_directory_base_url(),
            limit: default_directory_limit(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: default_resolve_timeout_secs(),
            search_timeout_secs: default_search_timeout_secs(),
        }
    }
}

fn default_http_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_volume() -> u8 {
    80
}

fn default_stations_file() -> PathBuf {
    platform::config_dir().join("stations.json")
}

fn default_directory_base_url() -> String {
    "https://all.api.radio-browser.info".to_string()
}

fn default_directory_limit() -> usize {
    50
}

fn default_resolve_timeout_secs() -> u64 {
    5
}

fn default_search_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
