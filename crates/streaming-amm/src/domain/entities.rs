//! # Domain Entities for the Streaming Pool
//!
//! ## Type Decisions
//!
//! - Amounts are `U256`. Reserve products reach 2^224 and the per-flow
//!   indices are Q112 fixed point, so `u128` is not wide enough.
//! - `FlowRate` is signed at the interface (streaming protocols report
//!   net flow) and stored unsigned once validated.
//! - `Timestamp` is seconds from the host clock.

use serde::{Deserialize, Serialize};

pub use primitive_types::{U256, U512};

pub type Address = [u8; 20];
pub type Timestamp = u64;
pub type FlowRate = i128;

/// Burn address. Holds the locked minimum liquidity.
pub const ZERO_ADDRESS: Address = [0u8; 20];

/// One of the two pooled assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    Token0,
    Token1,
}

/// Settled pool state.
///
/// Replaced as a whole by settlement; a failed operation never writes a
/// partially updated copy back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    /// Tradable token0 as of `last_settled`.
    pub reserve0: U256,
    /// Tradable token1 as of `last_settled`.
    pub reserve1: U256,
    /// Timestamp of the last settlement.
    pub last_settled: Timestamp,
    /// Σ UQ112x112(reserve1 / reserve0) · dt
    pub price0_cumulative: U256,
    /// Σ UQ112x112(reserve0 / reserve1) · dt
    pub price1_cumulative: U256,
    /// token0 converted from streamed token1 and still owed to streamers.
    pub total_swapped_funds0: U256,
    /// token1 converted from streamed token0 and still owed to streamers.
    pub total_swapped_funds1: U256,
    /// Sum of active inbound token0 flow rates.
    pub total_flow0: U256,
    /// Sum of active inbound token1 flow rates.
    pub total_flow1: U256,
    /// Q112 cumulative token0 released per unit of token1 flow rate.
    pub swapped_index0: U256,
    /// Q112 cumulative token1 released per unit of token0 flow rate.
    pub swapped_index1: U256,
    /// reserve0 · reserve1 after the last liquidity event (protocol fee on).
    pub k_last: U256,
}

impl PoolState {
    pub fn reserve(&self, asset: Asset) -> U256 {
        match asset {
            Asset::Token0 => self.reserve0,
            Asset::Token1 => self.reserve1,
        }
    }

    pub fn total_flow(&self, asset: Asset) -> U256 {
        match asset {
            Asset::Token0 => self.total_flow0,
            Asset::Token1 => self.total_flow1,
        }
    }

    pub fn total_flow_mut(&mut self, asset: Asset) -> &mut U256 {
        match asset {
            Asset::Token0 => &mut self.total_flow0,
            Asset::Token1 => &mut self.total_flow1,
        }
    }
}

/// Per-user streaming position.
///
/// Entitlements are derived lazily from the pool's per-flow indices, so a
/// record only needs touching when its owner is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// token0 streamed in per second.
    pub flow_rate0: U256,
    /// token1 streamed in per second.
    pub flow_rate1: U256,
    /// Last time the entitlement was brought current.
    pub last_settled: Timestamp,
    /// token0 owed to this user.
    pub balance0: U256,
    /// token1 owed to this user.
    pub balance1: U256,
    /// `PoolState::swapped_index0` at `last_settled`.
    pub index0_snapshot: U256,
    /// `PoolState::swapped_index1` at `last_settled`.
    pub index1_snapshot: U256,
}

impl StreamRecord {
    /// Empty record anchored at the given settled pool state.
    pub fn anchored(state: &PoolState) -> Self {
        Self {
            last_settled: state.last_settled,
            index0_snapshot: state.swapped_index0,
            index1_snapshot: state.swapped_index1,
            ..Default::default()
        }
    }

    pub fn flow_rate(&self, asset: Asset) -> U256 {
        match asset {
            Asset::Token0 => self.flow_rate0,
            Asset::Token1 => self.flow_rate1,
        }
    }

    pub fn set_flow_rate(&mut self, asset: Asset, rate: U256) {
        match asset {
            Asset::Token0 => self.flow_rate0 = rate,
            Asset::Token1 => self.flow_rate1 = rate,
        }
    }

    /// True while the user streams either asset.
    pub fn is_active(&self) -> bool {
        !self.flow_rate0.is_zero() || !self.flow_rate1.is_zero()
    }

    pub fn balances(&self) -> UserBalances {
        UserBalances {
            balance0: self.balance0,
            balance1: self.balance1,
            timestamp: self.last_settled,
        }
    }
}

/// Reserves at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub reserve0: U256,
    pub reserve1: U256,
    pub timestamp: Timestamp,
}

/// Swapped-out entitlement of one user at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalances {
    pub balance0: U256,
    pub balance1: U256,
    pub timestamp: Timestamp,
}

/// Aggregate unwithdrawn entitlements at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwappedFunds {
    pub total_swapped_funds0: U256,
    pub total_swapped_funds1: U256,
    pub timestamp: Timestamp,
}

/// Amounts moved by a discrete swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    pub amount0_in: U256,
    pub amount1_in: U256,
    pub amount0_out: U256,
    pub amount1_out: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    pub amount0: U256,
    pub amount1: U256,
    /// LP tokens credited to the recipient.
    pub liquidity: U256,
    /// LP tokens minted to the fee recipient before this mint.
    pub protocol_fee: U256,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnReceipt {
    pub amount0: U256,
    pub amount1: U256,
    /// LP tokens destroyed.
    pub liquidity: U256,
    pub protocol_fee: U256,
}

/// Kind of flow lifecycle notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowChange {
    Created,
    Updated,
    Deleted,
}

/// Outcome of a flow lifecycle notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowReceipt {
    pub user: Address,
    pub asset: Asset,
    pub change: FlowChange,
    /// Rate in effect after the change (zero on deletion).
    pub flow_rate: U256,
    /// token0 paid out to the user.
    pub paid0: U256,
    /// token1 paid out to the user.
    pub paid1: U256,
    pub timestamp: Timestamp,
}

/// Ledger balances of the pool address, as read by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolBalances {
    pub balance0: U256,
    pub balance1: U256,
}

impl PoolBalances {
    pub fn new(balance0: U256, balance1: U256) -> Self {
        Self { balance0, balance1 }
    }
}

/// Outbound transfer from the pool, executed after state is committed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub asset: Asset,
    pub to: Address,
    pub amount: U256,
}

/// Ledger balance versus what the pool accounts for, for one asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub asset: Asset,
    pub ledger_balance: U256,
    pub reserve: U256,
    pub owed_to_streamers: U256,
    pub timestamp: Timestamp,
}

impl ReconciliationReport {
    /// `ledger − (reserve + owed)`, or `None` when the pool is short.
    pub fn surplus(&self) -> Option<U256> {
        self.reserve
            .checked_add(self.owed_to_streamers)
            .and_then(|accounted| self.ledger_balance.checked_sub(accounted))
    }

    /// Never short, and the surplus stays within `tolerance`.
    pub fn is_within(&self, tolerance: U256) -> bool {
        matches!(self.surplus(), Some(dust) if dust <= tolerance)
    }
}

/// Pool configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Swap fee charged on the input side, in basis points.
    pub swap_fee_bps: u32,
    /// Liquidity permanently locked by the first mint.
    pub minimum_liquidity: U256,
    /// Recipient of the protocol's share of fees. `None` turns it off.
    pub fee_to: Option<Address>,
    /// Allowed rounding surplus when reconciling against the ledger.
    pub dust_tolerance: U256,
}

/// Basis-point denominator.
pub const BPS: u32 = 10_000;

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            swap_fee_bps: 30,
            minimum_liquidity: U256::from(1_000u64),
            fee_to: None,
            dust_tolerance: U256::from(100u64),
        }
    }
}

impl PoolConfig {
    /// Builder method to enable the protocol fee.
    pub fn with_fee_to(mut self, fee_to: Address) -> Self {
        self.fee_to = Some(fee_to);
        self
    }

    pub fn validate(&self) -> Result<(), super::PoolError> {
        if self.swap_fee_bps >= BPS {
            return Err(super::PoolError::InvalidConfig(format!(
                "swap fee {} bps must be below {}",
                self.swap_fee_bps, BPS
            )));
        }
        if self.minimum_liquidity.is_zero() {
            return Err(super::PoolError::InvalidConfig(
                "minimum liquidity must be non-zero".to_string(),
            ));
        }
        if self.fee_to == Some(ZERO_ADDRESS) {
            return Err(super::PoolError::InvalidConfig(
                "fee recipient cannot be the zero address".to_string(),
            ));
        }
        Ok(())
    }
}
