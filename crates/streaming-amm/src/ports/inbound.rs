//! # Inbound Ports
//!
//! Driving ports exposed by the pool.
//!
//! | Trait | Caller |
//! |-------|--------|
//! | `StreamingPoolApi` | traders, liquidity providers, read-only clients |
//! | `FlowLifecycleHandler` | the streaming protocol, on flow changes |
//!
//! Mutating calls run under the pool's reentrancy guard and fail with
//! `PoolError::Locked` if another mutation is in flight. Queries read the
//! last committed state and never fail with `Locked`.

use crate::domain::{
    Address, Asset, BurnReceipt, FlowRate, FlowReceipt, MintReceipt, PoolError,
    ReconciliationReport, Reserves, StreamRecord, SwapReceipt, SwappedFunds, Timestamp,
    UserBalances, U256,
};

/// Primary API of the streaming pool.
///
/// # Example
///
/// ```rust,ignore
/// use streaming_amm::ports::StreamingPoolApi;
///
/// fn quote(pool: &impl StreamingPoolApi) {
///     let now = pool.get_real_time_reserves()?;
///     let later = pool.get_reserves_at_time(now.timestamp + 60)?;
/// }
/// ```
pub trait StreamingPoolApi: Send + Sync {
    /// Swaps against inputs already transferred to the pool.
    ///
    /// # Errors
    /// - `InsufficientOutputAmount`: both outputs are zero
    /// - `InsufficientLiquidity`: an output reaches its reserve
    /// - `InvalidRecipient`: `to` is the pool
    /// - `InsufficientInputAmount`: nothing was paid in
    /// - `InvariantViolation`: fee-adjusted product check failed ("K")
    fn swap(
        &self,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        data: Vec<u8>,
    ) -> Result<SwapReceipt, PoolError>;

    /// Mints LP tokens for assets transferred to the pool since the last
    /// settlement.
    fn mint(&self, to: Address) -> Result<MintReceipt, PoolError>;

    /// Burns the LP tokens held by the pool address.
    fn burn(&self, to: Address) -> Result<BurnReceipt, PoolError>;

    /// Settles and matches reserves to the pool's effective balances.
    fn sync(&self) -> Result<Reserves, PoolError>;

    /// Sends any effective balance above the reserves to `to`.
    fn skim(&self, to: Address) -> Result<(U256, U256), PoolError>;

    /// Moves LP tokens between holders.
    fn transfer_liquidity(&self, from: Address, to: Address, amount: U256)
        -> Result<(), PoolError>;

    /// Reserves as of the last settlement.
    fn get_reserves(&self) -> Result<Reserves, PoolError>;

    fn get_real_time_reserves(&self) -> Result<Reserves, PoolError>;

    /// # Errors
    /// - `InvalidTimestamp`: `time` precedes the last settlement
    fn get_reserves_at_time(&self, time: Timestamp) -> Result<Reserves, PoolError>;

    fn get_real_time_user_balances(&self, user: Address) -> Result<UserBalances, PoolError>;

    fn get_user_balances_at_time(
        &self,
        user: Address,
        time: Timestamp,
    ) -> Result<UserBalances, PoolError>;

    fn get_real_time_total_swapped_funds(&self) -> Result<SwappedFunds, PoolError>;

    /// `(price0_cumulative, price1_cumulative)` as of the last settlement.
    fn price_cumulative_last(&self) -> Result<(U256, U256), PoolError>;

    fn k_last(&self) -> Result<U256, PoolError>;

    /// `(total_flow0, total_flow1)`
    fn total_flows(&self) -> Result<(U256, U256), PoolError>;

    fn stream(&self, user: Address) -> Result<Option<StreamRecord>, PoolError>;

    fn liquidity_balance_of(&self, holder: Address) -> Result<U256, PoolError>;

    fn total_supply(&self) -> Result<U256, PoolError>;

    /// Ledger balance versus reserve plus streamer entitlements. Walks every
    /// stream; diagnostics only.
    fn reconcile(&self, asset: Asset) -> Result<ReconciliationReport, PoolError>;
}

/// Notifications from the streaming protocol.
///
/// The handler verifies each notified rate against the `FlowProvider`
/// before settling.
pub trait FlowLifecycleHandler: Send + Sync {
    /// # Errors
    /// - `InvalidFlowRate`: rate is not positive
    /// - `FlowRateMismatch`: provider reports a different rate
    /// - `StreamAlreadyExists`: the user already streams `asset`
    /// - `InsufficientLiquidity`: the pool has no reserves yet
    fn on_flow_created(
        &self,
        user: Address,
        asset: Asset,
        rate: FlowRate,
    ) -> Result<FlowReceipt, PoolError>;

    fn on_flow_updated(
        &self,
        user: Address,
        asset: Asset,
        rate: FlowRate,
    ) -> Result<FlowReceipt, PoolError>;

    /// Pays out the user's entitlement in both assets.
    fn on_flow_deleted(&self, user: Address, asset: Asset) -> Result<FlowReceipt, PoolError>;
}
