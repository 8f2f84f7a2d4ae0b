//! Global `tracing` subscriber.
//!
//! `RUST_LOG` wins over the configured level when set.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{LogFormat, TelemetryConfig, TelemetryError};

/// Installs the subscriber. A second call fails with
/// `TelemetryError::SubscriberInstalled`.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::Filter(e.to_string()))?;

    let output = match config.log_format {
        LogFormat::Pretty => Some(fmt::layer().compact().with_target(true).boxed()),
        LogFormat::Json => Some(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .boxed(),
        ),
        LogFormat::Off => None,
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInstalled(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        filter = %config.log_level,
        format = ?config.log_format,
        "logging ready"
    );
    Ok(())
}

/// Debug-level output captured by the test harness. Safe to call from every
/// test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("streaming_amm=debug"))
        .with_test_writer()
        .try_init();
}
