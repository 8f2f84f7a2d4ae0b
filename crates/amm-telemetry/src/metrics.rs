//! Pool collectors in a dedicated Prometheus registry.
//!
//! The registry prefixes every name with `amm_`, so `swaps_total` is
//! exported as `amm_swaps_total`.

use lazy_static::lazy_static;
use prometheus::core::Collector;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    pub static ref REGISTRY: Registry =
        Registry::new_custom(Some("amm".into()), None).expect("metric creation failed");

    /// Settlements that moved `last_settled` forward.
    pub static ref SETTLEMENTS: Counter = Counter::new(
        "settlements_total",
        "Settlements that advanced the pool timestamp"
    ).expect("metric creation failed");

    pub static ref SWAPS: Counter = Counter::new(
        "swaps_total",
        "Discrete swaps paid out"
    ).expect("metric creation failed");

    /// Labelled `mint` or `burn`.
    pub static ref LIQUIDITY_EVENTS: CounterVec = CounterVec::new(
        Opts::new("liquidity_events_total", "Mints and burns paid out"),
        &["kind"]
    ).expect("metric creation failed");

    /// Labelled `created`, `updated` or `deleted`.
    pub static ref FLOW_EVENTS: CounterVec = CounterVec::new(
        Opts::new("flow_events_total", "Flow notifications settled"),
        &["kind"]
    ).expect("metric creation failed");

    /// Labelled with `PoolError::reason()`.
    pub static ref REJECTED_CALLS: CounterVec = CounterVec::new(
        Opts::new("rejected_calls_total", "Calls that returned an error"),
        &["reason"]
    ).expect("metric creation failed");

    pub static ref ACTIVE_STREAMS: Gauge = Gauge::new(
        "active_streams",
        "Stream records with a nonzero rate"
    ).expect("metric creation failed");
}

/// Proof that the collectors are registered.
#[derive(Debug)]
pub struct MetricsHandle(());

fn collectors() -> [Box<dyn Collector>; 6] {
    [
        Box::new(SETTLEMENTS.clone()),
        Box::new(SWAPS.clone()),
        Box::new(LIQUIDITY_EVENTS.clone()),
        Box::new(FLOW_EVENTS.clone()),
        Box::new(REJECTED_CALLS.clone()),
        Box::new(ACTIVE_STREAMS.clone()),
    ]
}

/// Registers every collector. Collectors already present are left alone, so
/// calling this twice is fine.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    for collector in collectors() {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(MetricsHandle(()))
}

/// Text exposition of the registry.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::Encoding(e.to_string()))
}
