//! Service configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Recommender service configuration
///
/// Read from an optional `recommender.{toml,yaml,json}` file, then from
/// `RECOMMENDER_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Address the recommender API listens on
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Base URL of the cloud info service
    #[serde(default = "default_cloud_info_address")]
    pub cloud_info_address: String,

    /// Disables authentication
    #[serde(default)]
    pub dev_mode: bool,

    /// Bearer token required on recommender routes
    #[serde(default)]
    pub api_token: Option<String>,

    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,

    #[serde(default = "default_metrics_address")]
    pub metrics_address: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `json` or `text`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Prefix for every API route
    #[serde(default)]
    pub base_path: String,

    #[serde(default = "default_catalog_cache_ttl")]
    pub catalog_cache_ttl_secs: u64,

    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_secs: u64,
}

fn default_listen_address() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_cloud_info_address() -> String {
    "http://localhost:9090/api/v1".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_address() -> String {
    "0.0.0.0:9900".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_catalog_cache_ttl() -> u64 {
    300
}

fn default_catalog_timeout() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            cloud_info_address: default_cloud_info_address(),
            dev_mode: false,
            api_token: None,
            metrics_enabled: default_metrics_enabled(),
            metrics_address: default_metrics_address(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            base_path: String::new(),
            catalog_cache_ttl_secs: default_catalog_cache_ttl(),
            catalog_timeout_secs: default_catalog_timeout(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the optional config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("recommender").required(false))
            .add_source(config::Environment::with_prefix("RECOMMENDER"))
            .build()
            .context("Failed to read configuration")?;

        let mut app: AppConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        app.base_path = normalize_base_path(&app.base_path);
        Ok(app)
    }

    /// Token the API expects, none in dev mode
    pub fn required_token(&self) -> Option<String> {
        if self.dev_mode {
            return None;
        }
        self.api_token.clone().filter(|t| !t.is_empty())
    }

    pub fn catalog_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_cache_ttl_secs)
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_secs)
    }
}

/// `/api/` and `api` both become `/api`; empty or `/` means no prefix
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
