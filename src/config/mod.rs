use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::leaderboard::normalize_wallet;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Stats API base URL; `/models` is appended per request.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
    /// Skip TLS verification for the stats API.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Webhook endpoint - loaded from env WEBHOOK_URL
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    /// Route webhook delivery through `url`.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_proxy_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_task_ids")]
    pub task_ids: Vec<u64>,
    /// Watched wallet addresses - loaded from env WALLET_ADDRESSES (comma separated)
    #[serde(default)]
    pub wallets: Vec<String>,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Pause after a failed iteration. Must be shorter than `interval_secs`.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_secs: u64,
    /// Ranks above this get the warning marker.
    #[serde(default = "default_rank_alert_threshold")]
    pub rank_alert_threshold: i64,
    /// Notify whenever watched wallets are on the board, not only on changes.
    #[serde(default = "default_true")]
    pub always_notify: bool,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_base_url() -> String {
    "https://fed-ledger-prod.flock.io/api/v1/stats".to_string()
}
fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    50
}
fn default_api_timeout() -> u64 {
    30
}
fn default_webhook_timeout() -> u64 {
    15
}
fn default_proxy_url() -> String {
    "http://localhost:7890".to_string()
}
fn default_app_name() -> String {
    "Flock Monitor".to_string()
}
fn default_task_ids() -> Vec<u64> {
    vec![17]
}
fn default_interval() -> u64 {
    1800
}
fn default_retry_backoff() -> u64 {
    5
}
fn default_rank_alert_threshold() -> i64 {
    20
}
fn default_true() -> bool {
    true
}
fn default_snapshot_path() -> PathBuf {
    PathBuf::from("rank_cache.json")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page: default_page(),
            page_size: default_page_size(),
            timeout_secs: default_api_timeout(),
            accept_invalid_certs: false,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: default_webhook_timeout(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_proxy_url(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            task_ids: default_task_ids(),
            wallets: Vec::new(),
            interval_secs: default_interval(),
            retry_backoff_secs: default_retry_backoff(),
            rank_alert_threshold: default_rank_alert_threshold(),
            always_notify: true,
            snapshot_path: default_snapshot_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl MonitorConfig {
    /// Normalized watch set.
    pub fn watch_set(&self) -> HashSet<String> {
        self.wallets
            .iter()
            .map(|w| normalize_wallet(w))
            .filter(|w| !w.is_empty())
            .collect()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults plus environment variables (no file needed).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(url) = std::env::var("WEBHOOK_URL") {
            self.webhook.url = url;
        }
        if let Ok(wallets) = std::env::var("WALLET_ADDRESSES") {
            self.monitor.wallets = split_list(&wallets);
        }
        if let Ok(url) = std::env::var("API_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(ids) = std::env::var("TASK_IDS") {
            self.monitor.task_ids = split_list(&ids)
                .iter()
                .map(|id| {
                    id.parse::<u64>()
                        .map_err(|_| ConfigError::Invalid(format!("TASK_IDS: bad task id {:?}", id)))
                })
                .collect::<Result<_, _>>()?;
        }
        if let Ok(secs) = std::env::var("INTERVAL_SECS") {
            self.monitor.interval_secs = secs
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("INTERVAL_SECS: {:?}", secs)))?;
        }
        if let Ok(flag) = std::env::var("USE_PROXY") {
            self.proxy.enabled = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(url) = std::env::var("PROXY_URL") {
            self.proxy.url = url;
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Reject configs the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "webhook.url is empty (set WEBHOOK_URL)".to_string(),
            ));
        }
        if self.monitor.watch_set().is_empty() {
            return Err(ConfigError::Invalid(
                "no wallets to watch (set WALLET_ADDRESSES)".to_string(),
            ));
        }
        if self.monitor.task_ids.is_empty() {
            return Err(ConfigError::Invalid("monitor.task_ids is empty".to_string()));
        }
        if self.monitor.interval_secs == 0 {
            return Err(ConfigError::Invalid("monitor.interval_secs must be > 0".to_string()));
        }
        if self.monitor.retry_backoff_secs >= self.monitor.interval_secs {
            return Err(ConfigError::Invalid(format!(
                "monitor.retry_backoff_secs ({}) must be shorter than interval_secs ({})",
                self.monitor.retry_backoff_secs, self.monitor.interval_secs
            )));
        }
        if self.api.page_size == 0 {
            return Err(ConfigError::Invalid("api.page_size must be > 0".to_string()));
        }
        if self.proxy.enabled && self.proxy.url.trim().is_empty() {
            return Err(ConfigError::Invalid("proxy.enabled without proxy.url".to_string()));
        }
        Ok(())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
