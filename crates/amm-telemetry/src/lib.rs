//! # AMM Telemetry
//!
//! Logging and Prometheus collectors shared by the pool library and the
//! simulator binary.
//!
//! ```rust,ignore
//! let telemetry = amm_telemetry::init_telemetry(TelemetryConfig::from_env())?;
//! // ... run the pool ...
//! if let Some(text) = telemetry.render_metrics()? {
//!     println!("{text}");
//! }
//! ```
//!
//! | Variable | Default | Effect |
//! |----------|---------|--------|
//! | `AMM_SERVICE_NAME` | `streaming-amm` | Name in the startup line |
//! | `AMM_LOG_LEVEL` | `info` | Filter when `RUST_LOG` is unset |
//! | `AMM_LOG_FORMAT` | `pretty` | `pretty`, `json` or `off` |
//! | `AMM_METRICS` | `true` | Register the collectors |

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::{LogFormat, TelemetryConfig};
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, ACTIVE_STREAMS, FLOW_EVENTS,
    LIQUIDITY_EVENTS, REJECTED_CALLS, SETTLEMENTS, SWAPS,
};
pub use tracing_setup::{init_test_tracing, init_tracing};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("a global subscriber is already installed: {0}")]
    SubscriberInstalled(String),

    #[error("prometheus: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("metrics text is not UTF-8: {0}")]
    Encoding(String),
}

/// What `init_telemetry` brought up.
#[derive(Debug)]
pub struct Telemetry {
    metrics: Option<MetricsHandle>,
}

impl Telemetry {
    pub fn metrics_enabled(&self) -> bool {
        self.metrics.is_some()
    }

    /// Exposition text, or `None` when metrics were not registered.
    pub fn render_metrics(&self) -> Result<Option<String>, TelemetryError> {
        self.metrics.as_ref().map(|_| encode_metrics()).transpose()
    }
}

/// Registers the collectors if enabled, then installs the subscriber.
pub fn init_telemetry(config: TelemetryConfig) -> Result<Telemetry, TelemetryError> {
    let metrics = config
        .enable_metrics
        .then(register_metrics)
        .transpose()?;
    init_tracing(&config)?;
    Ok(Telemetry { metrics })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_metrics_render_nothing() {
        let telemetry = Telemetry { metrics: None };
        assert!(!telemetry.metrics_enabled());
        assert!(telemetry.render_metrics().unwrap().is_none());
    }

    #[test]
    fn test_enabled_metrics_render_text() {
        let telemetry = Telemetry {
            metrics: Some(register_metrics().unwrap()),
        };
        SETTLEMENTS.inc();
        let text = telemetry.render_metrics().unwrap().unwrap();
        assert!(text.contains("amm_settlements_total"));
    }

    #[test]
    fn test_second_subscriber_rejected() {
        init_test_tracing();
        let err = init_tracing(&TelemetryConfig::default()).unwrap_err();
        assert!(matches!(err, TelemetryError::SubscriberInstalled(_)));
    }
}
