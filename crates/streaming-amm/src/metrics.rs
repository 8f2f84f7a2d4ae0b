//! Metric recording for the pool service.
//!
//! Backed by the `amm-telemetry` collectors when the `metrics` feature is
//! enabled; every function compiles to nothing otherwise.

#[cfg(feature = "metrics")]
mod imp {
    use amm_telemetry::{
        ACTIVE_STREAMS, FLOW_EVENTS, LIQUIDITY_EVENTS, REJECTED_CALLS, SETTLEMENTS, SWAPS,
    };

    pub fn record_settlement() {
        SETTLEMENTS.inc();
    }

    pub fn record_swap() {
        SWAPS.inc();
    }

    pub fn record_liquidity(kind: &str) {
        LIQUIDITY_EVENTS.with_label_values(&[kind]).inc();
    }

    pub fn record_flow(kind: &str) {
        FLOW_EVENTS.with_label_values(&[kind]).inc();
    }

    pub fn record_rejection(reason: &str) {
        REJECTED_CALLS.with_label_values(&[reason]).inc();
    }

    pub fn set_active_streams(count: usize) {
        ACTIVE_STREAMS.set(count as f64);
    }
}

#[cfg(not(feature = "metrics"))]
mod imp {
    pub fn record_settlement() {}
    pub fn record_swap() {}
    pub fn record_liquidity(_kind: &str) {}
    pub fn record_flow(_kind: &str) {}
    pub fn record_rejection(_reason: &str) {}
    pub fn set_active_streams(_count: usize) {}
}

pub use imp::*;
