//! `AMM_*` environment switches.

use std::env;

/// Where log lines go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, one line per event.
    #[default]
    Pretty,
    /// One JSON object per event, span fields included.
    Json,
    /// Filter installed, nothing written.
    Off,
}

impl LogFormat {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            "off" | "none" => Some(Self::Off),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Reported once when logging comes up.
    pub service_name: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
    pub log_format: LogFormat,
    /// Register the pool collectors with the Prometheus registry.
    pub enable_metrics: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "streaming-amm".into(),
            log_level: "info".into(),
            log_format: LogFormat::Pretty,
            enable_metrics: true,
        }
    }
}

impl TelemetryConfig {
    /// Defaults overridden by `AMM_SERVICE_NAME`, `AMM_LOG_LEVEL`,
    /// `AMM_LOG_FORMAT` (`pretty`, `json`, `off`) and `AMM_METRICS`.
    /// Unrecognised values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: env::var("AMM_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: env::var("AMM_LOG_LEVEL").unwrap_or(defaults.log_level),
            log_format: env::var("AMM_LOG_FORMAT")
                .ok()
                .and_then(|raw| LogFormat::parse(&raw))
                .unwrap_or(defaults.log_format),
            enable_metrics: env::var("AMM_METRICS")
                .ok()
                .and_then(|raw| switch(&raw))
                .unwrap_or(defaults.enable_metrics),
        }
    }

    pub fn with_log_level(mut self, level: &str) -> Self {
        self.log_level = level.into();
        self
    }
}

fn switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
