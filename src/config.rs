//! Configuration management for reqmeter
//!
//! Parses TOML configuration files and provides typed access to settings.

use crate::error::{AppError, AppResult};
use crate::metrics::registry::validate_namespace;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Metrics configuration
///
/// One facade is created per namespace. The first namespace instruments the
/// HTTP routes; the rest are available for application code.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "default_namespaces")]
    namespaces: Vec<String>,
    /// How often the server logs a stats line, in seconds
    #[serde(default = "default_stats_log_interval")]
    stats_log_interval_seconds: u64,
}

impl MetricsConfig {
    pub fn namespaces(&self) -> &[String] {
        &self.namespaces
    }

    pub fn stats_log_interval_seconds(&self) -> u64 {
        self.stats_log_interval_seconds
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            namespaces: default_namespaces(),
            stats_log_interval_seconds: default_stats_log_interval(),
        }
    }
}

fn default_namespaces() -> Vec<String> {
    vec!["default".to_string()]
}

fn default_stats_log_interval() -> u64 {
    5
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate configuration after parsing
    ///
    /// Called by `from_file()`; call it explicitly when building a Config by
    /// other means (e.g. `toml::from_str` in tests).
    pub fn validate(&self) -> AppResult<()> {
        if self.server.host.parse::<IpAddr>().is_err() {
            return Err(AppError::Config(format!(
                "server.host '{}' is not a valid IP address",
                self.server.host
            )));
        }

        if self.metrics.namespaces.is_empty() {
            return Err(AppError::Config(
                "metrics.namespaces must list at least one namespace".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for namespace in &self.metrics.namespaces {
            validate_namespace(namespace).map_err(|e| AppError::Config(e.to_string()))?;

            if !seen.insert(namespace.as_str()) {
                return Err(AppError::Config(format!(
                    "metrics.namespaces lists '{}' more than once. \
                    Each namespace can only be registered once per process.",
                    namespace
                )));
            }
        }

        if self.metrics.stats_log_interval_seconds == 0 {
            return Err(AppError::Config(
                "metrics.stats_log_interval_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
