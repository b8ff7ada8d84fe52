//! Configuration system for the DataMaq dashboard
//! Endpoints, element ids, timings and series constants

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub mod parser;
pub mod validation;

pub use parser::{ConfigFormat, ConfigParser, ConfigSerializer, TemplateExpander};
pub use validation::ConfigValidator;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level dashboard configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api: ApiConfig,
    pub chart: ChartSettings,
    pub defaults: DefaultsConfig,
}

impl DashboardConfig {
    /// Load, expand `${VAR}` references and validate a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = ConfigParser::parse_file(path)?;
        ConfigValidator::validate(&config)?;
        log::info!("DashboardConfig - loaded {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config = ConfigParser::parse_string(content, format)?;
        ConfigValidator::validate(&config)?;
        Ok(config)
    }
}

/// Backend endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the PHP API; replaced at runtime by discovery when the
    /// configuration endpoint answers.
    pub base_url: String,
    pub dashboard_path: String,
    /// Base URL discovery endpoint, relative to `base_url` unless absolute
    pub config_path: String,
    pub request_timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost/DataMaq/backend/api".to_string(),
            dashboard_path: "dashboard.php".to_string(),
            config_path: "api-config.php".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Absolute URL of the discovery endpoint.
    pub fn config_url(&self) -> String {
        if self.config_path.contains("://") {
            self.config_path.clone()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                self.config_path.trim_start_matches('/')
            )
        }
    }
}

/// Chart mount point, lifecycle timings and series constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub container_id: String,
    pub container_class: String,
    pub parent_id: String,
    pub max_failed_attempts: u32,
    pub retry_delay_ms: u64,
    pub container_wait_ms: u64,
    pub container_poll_ms: u64,
    pub periodic_check_interval_ms: u64,
    pub periodic_check_max_attempts: u32,
    /// Every n-th periodic check also forces a reload while data is missing
    pub periodic_reload_every: u32,
    pub click_delay_ms: u64,
    pub data_event_delay_ms: u64,
    pub value_divisor: f64,
    pub marcha_value: f64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            container_id: "container".to_string(),
            container_class: "graf".to_string(),
            parent_id: "info-display-container".to_string(),
            max_failed_attempts: 5,
            retry_delay_ms: 1000,
            container_wait_ms: 5000,
            container_poll_ms: 200,
            periodic_check_interval_ms: 1000,
            periodic_check_max_attempts: 15,
            periodic_reload_every: 3,
            click_delay_ms: 300,
            data_event_delay_ms: 100,
            value_divisor: 5.0,
            marcha_value: 20.0,
        }
    }
}

impl ChartSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn container_wait(&self) -> Duration {
        Duration::from_millis(self.container_wait_ms)
    }

    pub fn container_poll(&self) -> Duration {
        Duration::from_millis(self.container_poll_ms)
    }

    pub fn periodic_check_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_check_interval_ms)
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }

    pub fn data_event_delay(&self) -> Duration {
        Duration::from_millis(self.data_event_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub periodo: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            periodo: "semana".to_string(),
        }
    }
}
