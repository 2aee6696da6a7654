//! Configuration for connection-state tracking.
//!
//! Metric names default to the `http.server.connstate.*` family and the
//! reporting interval to 5 seconds; a `[connstate]` section in the host's
//! TOML config overrides any subset of them.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// File-level configuration root.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Connection-state metric names and reporting interval.
    #[serde(default)]
    pub connstate: ConnStateConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.connstate.validate()?;
        Ok(config)
    }
}

/// Metric names and reporting interval for the tracker.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnStateConfig {
    /// Name of the counter metric tracking new clients.
    #[serde(default = "default_new_counter")]
    pub new_counter: String,
    /// Name of the gauge metric tracking new clients.
    #[serde(default = "default_new_gauge")]
    pub new_gauge: String,
    /// Name of the counter metric tracking active clients.
    #[serde(default = "default_active_counter")]
    pub active_counter: String,
    /// Name of the gauge metric tracking active clients.
    #[serde(default = "default_active_gauge")]
    pub active_gauge: String,
    /// Name of the counter metric tracking idle clients.
    #[serde(default = "default_idle_counter")]
    pub idle_counter: String,
    /// Name of the gauge metric tracking idle clients.
    #[serde(default = "default_idle_gauge")]
    pub idle_gauge: String,
    /// Name of the counter metric tracking closed clients.
    #[serde(default = "default_closed_counter")]
    pub closed_counter: String,
    /// Name of the counter metric tracking hijacked clients.
    #[serde(default = "default_hijacked_counter")]
    pub hijacked_counter: String,
    /// Interval on which gauges are reported, in milliseconds (default: 5000).
    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

impl ConnStateConfig {
    /// Reporting interval as a [`Duration`].
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }

    /// Reject configurations the reporter cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "connstate.report_interval_ms must be non-zero".to_string(),
            ));
        }
        let names = [
            ("new_counter", &self.new_counter),
            ("new_gauge", &self.new_gauge),
            ("active_counter", &self.active_counter),
            ("active_gauge", &self.active_gauge),
            ("idle_counter", &self.idle_counter),
            ("idle_gauge", &self.idle_gauge),
            ("closed_counter", &self.closed_counter),
            ("hijacked_counter", &self.hijacked_counter),
        ];
        for (field, name) in names {
            if name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "connstate.{field} must not be empty"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ConnStateConfig {
    fn default() -> Self {
        Self {
            new_counter: default_new_counter(),
            new_gauge: default_new_gauge(),
            active_counter: default_active_counter(),
            active_gauge: default_active_gauge(),
            idle_counter: default_idle_counter(),
            idle_gauge: default_idle_gauge(),
            closed_counter: default_closed_counter(),
            hijacked_counter: default_hijacked_counter(),
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

fn default_new_counter() -> String {
    "http.server.connstate.new".to_string()
}

fn default_new_gauge() -> String {
    "http.server.connstate.new.gauge".to_string()
}

fn default_active_counter() -> String {
    "http.server.connstate.active".to_string()
}

fn default_active_gauge() -> String {
    "http.server.connstate.active.gauge".to_string()
}

fn default_idle_counter() -> String {
    "http.server.connstate.idle".to_string()
}

fn default_idle_gauge() -> String {
    "http.server.connstate.idle.gauge".to_string()
}

fn default_closed_counter() -> String {
    "http.server.connstate.closed".to_string()
}

fn default_hijacked_counter() -> String {
    "http.server.connstate.hijacked".to_string()
}

fn default_report_interval_ms() -> u64 {
    5000
}
