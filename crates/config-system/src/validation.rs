//! Configuration validation utilities

use crate::{ApiConfig, ChartSettings, ConfigError, DashboardConfig, DefaultsConfig, Result};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a complete configuration
    pub fn validate(config: &DashboardConfig) -> Result<()> {
        Self::validate_api(&config.api)?;
        Self::validate_chart(&config.chart)?;
        Self::validate_defaults(&config.defaults)?;
        Ok(())
    }

    fn validate_api(api: &ApiConfig) -> Result<()> {
        if api.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("api.base_url cannot be empty".to_string()));
        }
        if api.dashboard_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "api.dashboard_path cannot be empty".to_string(),
            ));
        }
        if api.request_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "api.request_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_chart(chart: &ChartSettings) -> Result<()> {
        for (name, id) in [
            ("container_id", &chart.container_id),
            ("parent_id", &chart.parent_id),
        ] {
            if id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "chart.{name} cannot be empty"
                )));
            }
        }

        if chart.max_failed_attempts == 0 {
            return Err(ConfigError::Validation(
                "chart.max_failed_attempts must be at least 1".to_string(),
            ));
        }

        for (name, value) in [
            ("retry_delay_ms", chart.retry_delay_ms),
            ("container_wait_ms", chart.container_wait_ms),
            ("container_poll_ms", chart.container_poll_ms),
            ("periodic_check_interval_ms", chart.periodic_check_interval_ms),
            ("click_delay_ms", chart.click_delay_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "chart.{name} must be greater than 0"
                )));
            }
        }

        if chart.container_poll_ms > chart.container_wait_ms {
            return Err(ConfigError::Validation(format!(
                "chart.container_poll_ms ({}) exceeds chart.container_wait_ms ({})",
                chart.container_poll_ms, chart.container_wait_ms
            )));
        }

        if chart.periodic_reload_every == 0 {
            return Err(ConfigError::Validation(
                "chart.periodic_reload_every must be at least 1".to_string(),
            ));
        }

        if !(chart.value_divisor.is_finite() && chart.value_divisor > 0.0) {
            return Err(ConfigError::Validation(format!(
                "Invalid chart.value_divisor: {}. Must be positive",
                chart.value_divisor
            )));
        }
        if !chart.marcha_value.is_finite() {
            return Err(ConfigError::Validation(
                "chart.marcha_value must be finite".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_defaults(defaults: &DefaultsConfig) -> Result<()> {
        if defaults.periodo.trim().is_empty() {
            return Err(ConfigError::Validation(
                "defaults.periodo cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
