use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::FetcherConfig;
use crate::gate::{DEFAULT_THERMAL_THRESHOLD, DEFAULT_THERMAL_ZONE};
use crate::job::{Priority, RequesterId};
use crate::worker::WorkerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub stores: StoresConfig,
}

/// Bot API connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Base URL of the (usually local) Bot API server
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_api_url() -> String {
    "http://localhost:8089".to_string()
}

impl TelegramConfig {
    /// `api_url` without a trailing slash, with `http://` added if no scheme was given.
    pub fn api_base(&self) -> String {
        let trimmed = self.api_url.trim().trim_end_matches('/');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Requesters whose jobs go to the high-priority lane
    #[serde(default)]
    pub priority_requesters: Vec<RequesterId>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            priority_requesters: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Lane priority for a requester's jobs.
    pub fn priority_for(&self, requester: RequesterId) -> Priority {
        if self.priority_requesters.contains(&requester) {
            Priority::High
        } else {
            Priority::Low
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("grabber.db")
}

/// Admission limits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourcesConfig {
    #[serde(default = "default_min_free_memory_mb")]
    pub min_free_memory_mb: u64,
    #[serde(default)]
    pub thermal: ThermalConfig,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            min_free_memory_mb: default_min_free_memory_mb(),
            thermal: ThermalConfig::default(),
        }
    }
}

impl ResourcesConfig {
    pub fn min_free_memory_bytes(&self) -> u64 {
        self.min_free_memory_mb.saturating_mul(1024 * 1024)
    }
}

fn default_min_free_memory_mb() -> u64 {
    256
}

/// Thermal monitoring (single-board hosts)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ThermalConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_zone_path")]
    pub zone_path: PathBuf,
    #[serde(default = "default_threshold")]
    pub threshold_millidegrees: i64,
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            zone_path: default_zone_path(),
            threshold_millidegrees: default_threshold(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

impl ThermalConfig {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

fn default_zone_path() -> PathBuf {
    PathBuf::from(DEFAULT_THERMAL_ZONE)
}

fn default_threshold() -> i64 {
    DEFAULT_THERMAL_THRESHOLD
}

fn default_sample_interval_ms() -> u64 {
    5000
}

/// TTL stores
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoresConfig {
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
    #[serde(default = "default_preference_ttl_days")]
    pub preference_ttl_days: u64,
    /// How often expired entries are purged
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: default_pending_ttl_secs(),
            preference_ttl_days: default_preference_ttl_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl StoresConfig {
    pub fn pending_ttl(&self) -> Duration {
        Duration::from_secs(self.pending_ttl_secs)
    }

    pub fn preference_ttl(&self) -> Duration {
        Duration::from_secs(self.preference_ttl_days.saturating_mul(24 * 60 * 60))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_pending_ttl_secs() -> u64 {
    600
}

fn default_preference_ttl_days() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub telegram: SanitizedTelegramConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub workers: WorkerConfig,
    pub resources: ResourcesConfig,
    pub fetcher: FetcherConfig,
    pub stores: StoresConfig,
}

/// Telegram config with the token hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub api_url: String,
    pub bot_token_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            telegram: SanitizedTelegramConfig {
                api_url: config.telegram.api_url.clone(),
                bot_token_configured: !config.telegram.bot_token.is_empty(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            workers: config.workers.clone(),
            resources: config.resources.clone(),
            fetcher: config.fetcher.clone(),
            stores: config.stores.clone(),
        }
    }
}
