use std::{io::ErrorKind, path::Path, time::Duration};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{connection::DEFAULT_RECONNECT_DELAY_MS, staleness::DEFAULT_CEILING_SECS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceConfig {
    pub host: String,
    pub ws_port: u16,
    pub http_port: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: "192.168.4.1".to_string(),
            ws_port: 81,
            http_port: 80,
        }
    }
}

impl DeviceConfig {
    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/", self.host, self.ws_port)
    }

    pub fn http_base(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DashboardConfig {
    pub device: DeviceConfig,
    pub reconnect_delay_ms: u64,
    pub frame_interval_ms: u64,
    pub staleness_ceiling_secs: f64,
    pub custom_fallback_min_f: f64,
    pub custom_fallback_max_f: f64,
    pub toast_ms: u64,
    pub timezone: String,
    pub operator_port: u16,
    pub request_timeout_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            frame_interval_ms: 16,
            staleness_ceiling_secs: DEFAULT_CEILING_SECS,
            custom_fallback_min_f: 98.0,
            custom_fallback_max_f: 100.5,
            toast_ms: 1_000,
            timezone: "America/Los_Angeles".to_string(),
            operator_port: 8090,
            request_timeout_ms: 5_000,
        }
    }
}

impl DashboardConfig {
    pub fn from_slice(raw: &[u8]) -> Result<Self, ConfigError> {
        Ok(serde_json::from_slice(raw)?)
    }

    /// A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read(path) {
            Ok(raw) => Self::from_slice(&raw),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("DEVICE_HOST").filter(|h| !h.trim().is_empty()) {
            self.device.host = host;
        }
        if let Some(port) = lookup("DEVICE_WS_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.device.ws_port = port;
        }
        if let Some(port) = lookup("DEVICE_HTTP_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.device.http_port = port;
        }
        if let Some(port) = lookup("DASHBOARD_HTTP_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.operator_port = port;
        }
    }

    pub fn sanitize(&mut self) {
        let defaults = Self::default();

        if self.device.host.trim().is_empty() {
            self.device.host = defaults.device.host.clone();
        }
        if self.device.ws_port == 0 {
            self.device.ws_port = defaults.device.ws_port;
        }
        if self.device.http_port == 0 {
            self.device.http_port = defaults.device.http_port;
        }
        if self.operator_port == 0 {
            self.operator_port = defaults.operator_port;
        }

        self.reconnect_delay_ms = self.reconnect_delay_ms.clamp(100, 60_000);
        self.frame_interval_ms = self.frame_interval_ms.clamp(4, 1_000);
        self.toast_ms = self.toast_ms.clamp(100, 10_000);
        self.request_timeout_ms = self.request_timeout_ms.clamp(500, 60_000);

        if !self.staleness_ceiling_secs.is_finite() || self.staleness_ceiling_secs <= 0.0 {
            self.staleness_ceiling_secs = defaults.staleness_ceiling_secs;
        }
        self.staleness_ceiling_secs = self.staleness_ceiling_secs.min(60.0);

        let fallback_valid = self.custom_fallback_min_f.is_finite()
            && self.custom_fallback_max_f.is_finite()
            && self.custom_fallback_min_f < self.custom_fallback_max_f;
        if !fallback_valid {
            self.custom_fallback_min_f = defaults.custom_fallback_min_f;
            self.custom_fallback_max_f = defaults.custom_fallback_max_f;
        }

        if self.timezone.parse::<Tz>().is_err() {
            self.timezone = defaults.timezone;
        }
    }

    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::America__Los_Angeles)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.toast_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let config =
            DashboardConfig::from_slice(br#"{"device":{"host":"10.0.0.7"}}"#)
                .unwrap();
        assert_eq!(config.device.host, "10.0.0.7");
        assert_eq!(config.reconnect_delay_ms, 2_000);
        assert_eq!(config.staleness_ceiling_secs, 2.0);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = DashboardConfig::load(Path::new("./does-not-exist/config.json")).unwrap();
        assert_eq!(config, DashboardConfig::default());
    }

    #[test]
    fn invalid_file_is_parse_error() {
        assert!(matches!(
            DashboardConfig::from_slice(b"{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = [
            ("DEVICE_HOST", "incubator.local"),
            ("DEVICE_WS_PORT", "8081"),
            ("DEVICE_HTTP_PORT", "not-a-port"),
            ("DASHBOARD_HTTP_PORT", "9000"),
        ]
        .into_iter()
        .collect();

        let mut config = DashboardConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.device.host, "incubator.local");
        assert_eq!(config.device.ws_port, 8081);
        assert_eq!(config.device.http_port, 80);
        assert_eq!(config.operator_port, 9000);
        assert_eq!(config.device.ws_url(), "ws://incubator.local:8081/");
    }

    #[test]
    fn sanitize_repairs_unusable_values() {
        let mut config = DashboardConfig {
            reconnect_delay_ms: 0,
            frame_interval_ms: 0,
            staleness_ceiling_secs: f64::NAN,
            custom_fallback_min_f: 101.0,
            custom_fallback_max_f: 99.0,
            timezone: "Mars/Olympus_Mons".to_string(),
            ..DashboardConfig::default()
        };
        config.sanitize();

        assert_eq!(config.reconnect_delay_ms, 100);
        assert_eq!(config.frame_interval_ms, 4);
        assert_eq!(config.staleness_ceiling_secs, 2.0);
        assert_eq!(config.custom_fallback_min_f, 98.0);
        assert_eq!(config.custom_fallback_max_f, 100.5);
        assert_eq!(config.timezone, "America/Los_Angeles");
    }
}
