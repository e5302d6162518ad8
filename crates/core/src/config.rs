use serde::Deserialize;
use tracing::warn;

use crate::error::{DashResult, DashboardError};

/// Longest window the dashboard will ever query, in days.
pub const MAX_LOOKBACK_DAYS: i64 = 366;

/// Root application configuration. Loaded from environment variables
/// with the prefix `FUNNEL_DASH__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub warehouse: WarehouseConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared dashboard passphrase, compared verbatim.
    #[serde(default = "default_passphrase")]
    pub passphrase: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseBackend {
    Clickhouse,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WarehouseConfig {
    #[serde(default = "default_backend")]
    pub backend: WarehouseBackend,
    #[serde(default = "default_clickhouse_url")]
    pub url: String,
    #[serde(default = "default_clickhouse_db")]
    pub database: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_fixture_path")]
    pub fixture_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
    #[serde(default = "default_window_days")]
    pub default_window_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_passphrase() -> String {
    "change-me".to_string()
}
fn default_backend() -> WarehouseBackend {
    WarehouseBackend::Clickhouse
}
fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}
fn default_clickhouse_db() -> String {
    "marketing".to_string()
}
fn default_table() -> String {
    "full_funnel".to_string()
}
fn default_fixture_path() -> String {
    "data/funnel.json".to_string()
}
fn default_lookback_days() -> i64 {
    365
}
fn default_window_days() -> i64 {
    30
}
fn default_session_ttl_secs() -> u64 {
    8 * 3600
}
fn default_max_sessions() -> usize {
    1024
}
fn default_maintenance_interval_secs() -> u64 {
    60
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            passphrase: default_passphrase(),
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_clickhouse_url(),
            database: default_clickhouse_db(),
            table: default_table(),
            user: None,
            password: None,
            fixture_path: default_fixture_path(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            default_window_days: default_window_days(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            max_sessions: default_max_sessions(),
            maintenance_interval_secs: default_maintenance_interval_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            auth: AuthConfig::default(),
            warehouse: WarehouseConfig::default(),
            dashboard: DashboardConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file, then environment
    /// variables (which win).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("FUNNEL_DASH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Like [`AppConfig::load`], but a missing `path` may fall back to
    /// defaults. A file the operator named must load or the error stands.
    pub fn resolve(path: Option<&str>) -> Result<Self, config::ConfigError> {
        match (path, Self::load(path)) {
            (_, Ok(config)) => Ok(config),
            (Some(path), Err(e)) => Err(config::ConfigError::Message(format!(
                "config file {path}: {e}"
            ))),
            (None, Err(e)) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Ok(AppConfig::default())
            }
        }
    }

    /// Reject values the rest of the system cannot work with.
    pub fn validate(&self) -> DashResult<()> {
        if self.dashboard.lookback_days < 1 || self.dashboard.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(DashboardError::Config(format!(
                "dashboard.lookback_days must be within 1..={MAX_LOOKBACK_DAYS}, got {}",
                self.dashboard.lookback_days
            )));
        }
        if self.dashboard.default_window_days < 0
            || self.dashboard.default_window_days > MAX_LOOKBACK_DAYS
        {
            return Err(DashboardError::Config(format!(
                "dashboard.default_window_days must be within 0..={MAX_LOOKBACK_DAYS}, got {}",
                self.dashboard.default_window_days
            )));
        }
        if self.auth.passphrase.is_empty() {
            return Err(DashboardError::Config(
                "auth.passphrase must not be empty".to_string(),
            ));
        }
        if self.session.max_sessions == 0 {
            return Err(DashboardError::Config(
                "session.max_sessions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_config(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("funnel-dash-{name}-{}.toml", std::process::id()))
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dashboard.lookback_days, 365);
        assert_eq!(config.dashboard.default_window_days, 30);
        assert_eq!(config.warehouse.backend, WarehouseBackend::Clickhouse);
    }

    #[test]
    fn test_lookback_longer_than_a_year_is_rejected() {
        let mut config = AppConfig::default();
        config.dashboard.lookback_days = 400;
        assert!(matches!(config.validate(), Err(DashboardError::Config(_))));
    }

    #[test]
    fn test_oversized_default_window_is_rejected() {
        let mut config = AppConfig::default();
        config.dashboard.default_window_days = 1_000_000_000;
        assert!(matches!(config.validate(), Err(DashboardError::Config(_))));
        config.dashboard.default_window_days = MAX_LOOKBACK_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_named_config_file_must_exist() {
        let path = temp_config("missing");
        let result = AppConfig::resolve(path.to_str());
        assert!(result.is_err());
    }

    #[test]
    fn test_malformed_config_file_is_an_error() {
        let path = temp_config("bad");
        std::fs::write(&path, "[auth\npassphrase = ").unwrap();
        let result = AppConfig::resolve(path.to_str());
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn test_named_config_file_is_used() {
        let path = temp_config("good");
        std::fs::write(&path, "[auth]\npassphrase = \"from-file\"\n").unwrap();
        let result = AppConfig::resolve(path.to_str());
        std::fs::remove_file(&path).ok();
        assert_eq!(result.unwrap().auth.passphrase, "from-file");
    }

    #[test]
    fn test_empty_passphrase_is_rejected() {
        let mut config = AppConfig::default();
        config.auth.passphrase.clear();
        assert!(config.validate().is_err());
    }
}
