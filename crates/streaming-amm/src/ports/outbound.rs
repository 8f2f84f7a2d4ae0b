//! Outbound (Driven) ports for the streaming pool.
//!
//! These traits define the collaborators the pool depends on: the asset
//! ledger, the streaming protocol, the clock and the event sink.

use crate::domain::{Address, Asset, FlowRate, PoolError, Timestamp, U256};
use crate::events::PoolEvent;

/// Fungible balances and transfers for both pooled assets.
///
/// Calls are synchronous and atomic: a transfer either moves the full
/// amount or fails without effect.
pub trait AssetLedger: Send + Sync {
    /// Real-time balance of `account`, including streamed amounts.
    fn balance_of(&self, asset: Asset, account: &Address) -> Result<U256, PoolError>;

    /// Moves `amount` of `asset` from `from` to `to`.
    fn transfer(
        &self,
        asset: Asset,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), PoolError>;
}

/// Read access to the streaming protocol's flow registry.
pub trait FlowProvider: Send + Sync {
    /// Net flow rate from `sender` to `receiver` in `asset`. Zero when no
    /// flow exists.
    fn get_flow_rate(
        &self,
        asset: Asset,
        sender: &Address,
        receiver: &Address,
    ) -> Result<FlowRate, PoolError>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in seconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }
}

/// Sink for committed pool events.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: PoolEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_is_after_epoch() {
        assert!(SystemTimeSource.now() > 1_600_000_000);
    }
}
