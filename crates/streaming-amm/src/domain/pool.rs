//! # Streaming Pool
//!
//! Constant-product pool whose deposits may arrive as continuous flows.
//!
//! ## Operation shape
//!
//! Every mutating operation follows the same steps:
//!
//! 1. Settle a copy of the pool state to `now`.
//! 2. Validate and compute against the settled copy.
//! 3. Commit the copy (and any registry/LP changes) in one assignment.
//! 4. Return the outbound transfers for the caller to execute.
//!
//! A failure in step 1 or 2 leaves `self` untouched. Transfers are never
//! executed here; the pool has no handle on the asset ledger.
//!
//! ## Effective balance
//!
//! `ledger_balance − total_swapped_funds`: what the pool holds for traders,
//! excluding output already owed to streamers.

use super::entities::{
    Address, Asset, BurnReceipt, FlowChange, FlowRate, FlowReceipt, MintReceipt, PoolBalances,
    PoolConfig, PoolState, ReconciliationReport, Reserves, StreamRecord, SwapReceipt,
    SwappedFunds, Timestamp, Transfer, UserBalances, BPS, U256, U512, ZERO_ADDRESS,
};
use super::errors::{ArithmeticError, PoolError};
use super::liquidity::{protocol_fee_liquidity, LiquidityLedger};
use super::math;
use super::registry::StreamRegistry;
use super::settlement::{settle_pool, settle_stream};

/// Pre-operation copy of whatever a mutation may touch, for undoing a
/// commit whose payout then fails.
///
/// Holds the pool state always, the LP ledger and one stream record only
/// when asked, so taking one stays O(1) in the number of streams.
#[derive(Clone, Debug)]
pub struct Checkpoint {
    state: PoolState,
    liquidity: Option<LiquidityLedger>,
    stream: Option<(Address, Option<StreamRecord>)>,
}

/// Receipt of a committed operation plus the transfers it owes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Applied<T> {
    pub receipt: T,
    pub transfers: Vec<Transfer>,
}

impl<T> Applied<T> {
    pub fn without_transfers(receipt: T) -> Self {
        Self {
            receipt,
            transfers: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct StreamingPool {
    address: Address,
    config: PoolConfig,
    state: PoolState,
    streams: StreamRegistry,
    liquidity: LiquidityLedger,
}

impl StreamingPool {
    /// Creates an empty pool at `address`, first settled at `created_at`.
    pub fn new(
        address: Address,
        config: PoolConfig,
        created_at: Timestamp,
    ) -> Result<Self, PoolError> {
        config.validate()?;
        if address == ZERO_ADDRESS {
            return Err(PoolError::InvalidConfig(
                "pool address cannot be the zero address".to_string(),
            ));
        }
        Ok(Self {
            address,
            config,
            state: PoolState {
                last_settled: created_at,
                ..Default::default()
            },
            streams: StreamRegistry::new(),
            liquidity: LiquidityLedger::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Last settled state.
    pub fn state(&self) -> &PoolState {
        &self.state
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Reserves as of the last settlement.
    pub fn reserves(&self) -> Reserves {
        Reserves {
            reserve0: self.state.reserve0,
            reserve1: self.state.reserve1,
            timestamp: self.state.last_settled,
        }
    }

    /// Reserves the pool would settle to at `at`.
    pub fn reserves_at(&self, at: Timestamp) -> Result<Reserves, PoolError> {
        let settled = settle_pool(&self.state, at)?.state;
        Ok(Reserves {
            reserve0: settled.reserve0,
            reserve1: settled.reserve1,
            timestamp: at,
        })
    }

    /// Entitlement `user` would hold after a settlement at `at`.
    pub fn user_balances_at(&self, user: &Address, at: Timestamp) -> Result<UserBalances, PoolError> {
        let settled = settle_pool(&self.state, at)?.state;
        match self.streams.get(user) {
            Some(record) => Ok(settle_stream(record, &settled)?.balances()),
            None => Ok(UserBalances {
                timestamp: at,
                ..Default::default()
            }),
        }
    }

    pub fn total_swapped_funds_at(&self, at: Timestamp) -> Result<SwappedFunds, PoolError> {
        let settled = settle_pool(&self.state, at)?.state;
        Ok(SwappedFunds {
            total_swapped_funds0: settled.total_swapped_funds0,
            total_swapped_funds1: settled.total_swapped_funds1,
            timestamp: at,
        })
    }

    /// `(price0_cumulative, price1_cumulative)` as of the last settlement.
    pub fn price_cumulative_last(&self) -> (U256, U256) {
        (self.state.price0_cumulative, self.state.price1_cumulative)
    }

    pub fn k_last(&self) -> U256 {
        self.state.k_last
    }

    /// `(total_flow0, total_flow1)`
    pub fn total_flows(&self) -> (U256, U256) {
        (self.state.total_flow0, self.state.total_flow1)
    }

    pub fn stream(&self, user: &Address) -> Option<StreamRecord> {
        self.streams.get(user).copied()
    }

    pub fn active_streams(&self) -> usize {
        self.streams.active_count()
    }

    pub fn liquidity_balance_of(&self, holder: &Address) -> U256 {
        self.liquidity.balance_of(holder)
    }

    pub fn total_supply(&self) -> U256 {
        self.liquidity.total_supply()
    }

    /// Compares a ledger balance with reserves plus every streamer's
    /// entitlement at `at`. Walks the whole registry.
    pub fn reconcile(
        &self,
        asset: Asset,
        ledger_balance: U256,
        at: Timestamp,
    ) -> Result<ReconciliationReport, PoolError> {
        let settled = settle_pool(&self.state, at)?.state;
        let mut owed = U256::zero();
        for (_, record) in self.streams.iter() {
            let current = settle_stream(record, &settled)?;
            let balance = match asset {
                Asset::Token0 => current.balance0,
                Asset::Token1 => current.balance1,
            };
            owed = math::add(owed, balance)?;
        }
        Ok(ReconciliationReport {
            asset,
            ledger_balance,
            reserve: settled.reserve(asset),
            owed_to_streamers: owed,
            timestamp: at,
        })
    }

    // =========================================================================
    // DISCRETE OPERATIONS
    // =========================================================================

    /// Swaps against inputs already transferred to the pool.
    ///
    /// # Errors
    /// - `InsufficientOutputAmount` if both outputs are zero
    /// - `InsufficientLiquidity` if an output reaches its reserve
    /// - `InvalidRecipient` if `to` is the pool itself
    /// - `InsufficientInputAmount` if nothing was paid in
    /// - `InvariantViolation` if the fee-adjusted product shrinks
    pub fn swap(
        &mut self,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        balances: PoolBalances,
        now: Timestamp,
    ) -> Result<Applied<SwapReceipt>, PoolError> {
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(PoolError::InsufficientOutputAmount);
        }
        let mut next = settle_pool(&self.state, now)?.state;
        if amount0_out >= next.reserve0 || amount1_out >= next.reserve1 {
            return Err(PoolError::InsufficientLiquidity);
        }
        if to == self.address {
            return Err(PoolError::InvalidRecipient(to));
        }

        let (balance0, balance1) = effective_balances(&next, balances)?;
        let balance0 = math::sub(balance0, amount0_out)?;
        let balance1 = math::sub(balance1, amount1_out)?;

        let amount0_in = paid_in(balance0, next.reserve0 - amount0_out);
        let amount1_in = paid_in(balance1, next.reserve1 - amount1_out);
        if amount0_in.is_zero() && amount1_in.is_zero() {
            return Err(PoolError::InsufficientInputAmount);
        }

        let bps = U256::from(BPS);
        let fee = U256::from(self.config.swap_fee_bps);
        let adjusted0 = math::sub(math::mul(balance0, bps)?, math::mul(amount0_in, fee)?)?;
        let adjusted1 = math::sub(math::mul(balance1, bps)?, math::mul(amount1_in, fee)?)?;
        let required = next
            .reserve0
            .full_mul(next.reserve1)
            .checked_mul(U512::from(BPS) * U512::from(BPS))
            .ok_or(ArithmeticError::Overflow)?;
        if adjusted0.full_mul(adjusted1) < required {
            return Err(PoolError::InvariantViolation);
        }

        next.reserve0 = balance0;
        next.reserve1 = balance1;
        self.state = next;

        let transfers = [(Asset::Token0, amount0_out), (Asset::Token1, amount1_out)]
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(asset, amount)| Transfer { asset, to, amount })
            .collect();

        Ok(Applied {
            receipt: SwapReceipt {
                amount0_in,
                amount1_in,
                amount0_out,
                amount1_out,
            },
            transfers,
        })
    }

    /// Mints LP tokens to `to` for the excess of balances over reserves.
    pub fn mint(
        &mut self,
        to: Address,
        balances: PoolBalances,
        now: Timestamp,
    ) -> Result<Applied<MintReceipt>, PoolError> {
        let mut next = settle_pool(&self.state, now)?.state;
        let (balance0, balance1) = effective_balances(&next, balances)?;
        let amount0 = math::sub(balance0, next.reserve0)?;
        let amount1 = math::sub(balance1, next.reserve1)?;

        let mut lp = self.liquidity.clone();
        let protocol_fee = self.accrue_protocol_fee(&mut lp, &mut next)?;
        let supply = lp.total_supply();

        let liquidity = if supply.is_zero() {
            let root = math::isqrt(math::mul(amount0, amount1)?);
            let liquidity = root
                .checked_sub(self.config.minimum_liquidity)
                .ok_or(PoolError::InsufficientLiquidityMinted)?;
            lp.mint(ZERO_ADDRESS, self.config.minimum_liquidity)?;
            liquidity
        } else {
            math::mul_div(amount0, supply, next.reserve0)?
                .min(math::mul_div(amount1, supply, next.reserve1)?)
        };
        if liquidity.is_zero() {
            return Err(PoolError::InsufficientLiquidityMinted);
        }
        lp.mint(to, liquidity)?;

        next.reserve0 = balance0;
        next.reserve1 = balance1;
        if self.config.fee_to.is_some() {
            next.k_last = math::mul(balance0, balance1)?;
        }
        self.state = next;
        self.liquidity = lp;

        Ok(Applied::without_transfers(MintReceipt {
            amount0,
            amount1,
            liquidity,
            protocol_fee,
        }))
    }

    /// Burns the LP tokens held by the pool address and pays `to` its share.
    pub fn burn(
        &mut self,
        to: Address,
        balances: PoolBalances,
        now: Timestamp,
    ) -> Result<Applied<BurnReceipt>, PoolError> {
        let mut next = settle_pool(&self.state, now)?.state;
        let (balance0, balance1) = effective_balances(&next, balances)?;

        let mut lp = self.liquidity.clone();
        let protocol_fee = self.accrue_protocol_fee(&mut lp, &mut next)?;
        let liquidity = lp.balance_of(&self.address);
        let supply = lp.total_supply();
        if supply.is_zero() {
            return Err(PoolError::InsufficientLiquidityBurned);
        }

        let amount0 = math::mul_div(liquidity, balance0, supply)?;
        let amount1 = math::mul_div(liquidity, balance1, supply)?;
        if amount0.is_zero() || amount1.is_zero() {
            return Err(PoolError::InsufficientLiquidityBurned);
        }
        lp.burn(self.address, liquidity)?;

        next.reserve0 = balance0 - amount0;
        next.reserve1 = balance1 - amount1;
        if self.config.fee_to.is_some() {
            next.k_last = math::mul(next.reserve0, next.reserve1)?;
        }
        self.state = next;
        self.liquidity = lp;

        Ok(Applied {
            receipt: BurnReceipt {
                amount0,
                amount1,
                liquidity,
                protocol_fee,
            },
            transfers: vec![
                Transfer {
                    asset: Asset::Token0,
                    to,
                    amount: amount0,
                },
                Transfer {
                    asset: Asset::Token1,
                    to,
                    amount: amount1,
                },
            ],
        })
    }

    /// Settles and sets reserves to the effective balances.
    pub fn sync(&mut self, balances: PoolBalances, now: Timestamp) -> Result<Reserves, PoolError> {
        let mut next = settle_pool(&self.state, now)?.state;
        let (balance0, balance1) = effective_balances(&next, balances)?;
        next.reserve0 = balance0;
        next.reserve1 = balance1;
        self.state = next;
        Ok(self.reserves())
    }

    /// Settles and sends any effective balance above the reserves to `to`.
    pub fn skim(
        &mut self,
        to: Address,
        balances: PoolBalances,
        now: Timestamp,
    ) -> Result<Applied<(U256, U256)>, PoolError> {
        let next = settle_pool(&self.state, now)?.state;
        let (balance0, balance1) = effective_balances(&next, balances)?;
        let excess0 = math::sub(balance0, next.reserve0)?;
        let excess1 = math::sub(balance1, next.reserve1)?;
        self.state = next;

        let transfers = [(Asset::Token0, excess0), (Asset::Token1, excess1)]
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(asset, amount)| Transfer { asset, to, amount })
            .collect();
        Ok(Applied {
            receipt: (excess0, excess1),
            transfers,
        })
    }

    pub fn transfer_liquidity(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), PoolError> {
        self.liquidity.transfer(from, to, amount)
    }

    // =========================================================================
    // ROLLBACK
    // =========================================================================

    /// Checkpoint of the pool state only.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            state: self.state,
            liquidity: None,
            stream: None,
        }
    }

    /// Checkpoint that also covers the LP ledger.
    pub fn checkpoint_with_liquidity(&self) -> Checkpoint {
        Checkpoint {
            liquidity: Some(self.liquidity.clone()),
            ..self.checkpoint()
        }
    }

    /// Checkpoint that also covers the stream record of `user`.
    pub fn checkpoint_with_stream(&self, user: Address) -> Checkpoint {
        Checkpoint {
            stream: Some((user, self.streams.get(&user).copied())),
            ..self.checkpoint()
        }
    }

    /// Puts back everything `checkpoint` captured.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        self.state = checkpoint.state;
        if let Some(liquidity) = checkpoint.liquidity {
            self.liquidity = liquidity;
        }
        if let Some((user, record)) = checkpoint.stream {
            self.streams.replace(user, record);
        }
    }

    /// Mints the protocol's share of fee growth, or clears `k_last` when the
    /// fee is off.
    fn accrue_protocol_fee(
        &self,
        lp: &mut LiquidityLedger,
        state: &mut PoolState,
    ) -> Result<U256, PoolError> {
        match self.config.fee_to {
            Some(fee_to) => {
                let fee = protocol_fee_liquidity(
                    lp.total_supply(),
                    state.reserve0,
                    state.reserve1,
                    state.k_last,
                )?;
                if !fee.is_zero() {
                    lp.mint(fee_to, fee)?;
                }
                Ok(fee)
            }
            None => {
                state.k_last = U256::zero();
                Ok(U256::zero())
            }
        }
    }

    // =========================================================================
    // FLOW LIFECYCLE
    // =========================================================================

    /// Registers a new inbound flow of `asset` from `user`.
    ///
    /// # Errors
    /// - `InvalidFlowRate` unless `rate > 0`
    /// - `StreamAlreadyExists` if `user` already streams `asset`
    /// - `InsufficientLiquidity` if either reserve is empty
    pub fn on_flow_created(
        &mut self,
        user: Address,
        asset: Asset,
        rate: FlowRate,
        now: Timestamp,
    ) -> Result<Applied<FlowReceipt>, PoolError> {
        let rate = positive_rate(rate)?;
        if !self.streams.flow_rate(&user, asset).is_zero() {
            return Err(PoolError::StreamAlreadyExists { user, asset });
        }

        let mut next = settle_pool(&self.state, now)?.state;
        if next.reserve0.is_zero() || next.reserve1.is_zero() {
            return Err(PoolError::InsufficientLiquidity);
        }
        let mut record = match self.streams.get(&user) {
            Some(existing) => settle_stream(existing, &next)?,
            None => StreamRecord::anchored(&next),
        };
        record.set_flow_rate(asset, rate);
        let total = math::add(next.total_flow(asset), rate)?;
        *next.total_flow_mut(asset) = total;

        self.state = next;
        self.streams.put(user, record);
        Ok(Applied::without_transfers(FlowReceipt {
            user,
            asset,
            change: FlowChange::Created,
            flow_rate: rate,
            paid0: U256::zero(),
            paid1: U256::zero(),
            timestamp: now,
        }))
    }

    /// Replaces the rate of an existing flow.
    pub fn on_flow_updated(
        &mut self,
        user: Address,
        asset: Asset,
        rate: FlowRate,
        now: Timestamp,
    ) -> Result<Applied<FlowReceipt>, PoolError> {
        let rate = positive_rate(rate)?;
        let (mut next, mut record, previous) = self.settle_existing(user, asset, now)?;

        record.set_flow_rate(asset, rate);
        let total = math::add(math::sub(next.total_flow(asset), previous)?, rate)?;
        *next.total_flow_mut(asset) = total;

        self.state = next;
        self.streams.put(user, record);
        Ok(Applied::without_transfers(FlowReceipt {
            user,
            asset,
            change: FlowChange::Updated,
            flow_rate: rate,
            paid0: U256::zero(),
            paid1: U256::zero(),
            timestamp: now,
        }))
    }

    /// Stops a flow and pays out everything the user is owed in both assets.
    pub fn on_flow_deleted(
        &mut self,
        user: Address,
        asset: Asset,
        now: Timestamp,
    ) -> Result<Applied<FlowReceipt>, PoolError> {
        let (mut next, mut record, previous) = self.settle_existing(user, asset, now)?;

        record.set_flow_rate(asset, U256::zero());
        let total = math::sub(next.total_flow(asset), previous)?;
        *next.total_flow_mut(asset) = total;

        let paid0 = record.balance0;
        let paid1 = record.balance1;
        next.total_swapped_funds0 = math::sub(next.total_swapped_funds0, paid0)?;
        next.total_swapped_funds1 = math::sub(next.total_swapped_funds1, paid1)?;
        record.balance0 = U256::zero();
        record.balance1 = U256::zero();

        self.state = next;
        self.streams.put(user, record);

        let transfers = [(Asset::Token0, paid0), (Asset::Token1, paid1)]
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(asset, amount)| Transfer {
                asset,
                to: user,
                amount,
            })
            .collect();
        Ok(Applied {
            receipt: FlowReceipt {
                user,
                asset,
                change: FlowChange::Deleted,
                flow_rate: U256::zero(),
                paid0,
                paid1,
                timestamp: now,
            },
            transfers,
        })
    }

    /// Settles the pool and the existing `asset` stream of `user`.
    fn settle_existing(
        &self,
        user: Address,
        asset: Asset,
        now: Timestamp,
    ) -> Result<(PoolState, StreamRecord, U256), PoolError> {
        let existing = self
            .streams
            .get(&user)
            .filter(|record| !record.flow_rate(asset).is_zero())
            .ok_or(PoolError::StreamNotFound { user, asset })?;
        let previous = existing.flow_rate(asset);
        let next = settle_pool(&self.state, now)?.state;
        let record = settle_stream(existing, &next)?;
        Ok((next, record, previous))
    }
}

fn effective_balances(
    settled: &PoolState,
    balances: PoolBalances,
) -> Result<(U256, U256), ArithmeticError> {
    Ok((
        math::sub(balances.balance0, settled.total_swapped_funds0)?,
        math::sub(balances.balance1, settled.total_swapped_funds1)?,
    ))
}

fn paid_in(balance: U256, expected: U256) -> U256 {
    if balance > expected {
        balance - expected
    } else {
        U256::zero()
    }
}

fn positive_rate(rate: FlowRate) -> Result<U256, PoolError> {
    if rate <= 0 {
        return Err(PoolError::InvalidFlowRate(rate));
    }
    Ok(U256::from(rate as u128))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: Address = [0xAA; 20];
    const ALICE: Address = [0x01; 20];
    const BOB: Address = [0x02; 20];
    const E18: u128 = 1_000_000_000_000_000_000;

    fn e18(n: u128) -> U256 {
        U256::from(n) * U256::from(E18)
    }

    fn seeded(amount0: U256, amount1: U256) -> StreamingPool {
        let mut pool = StreamingPool::new(POOL, PoolConfig::default(), 0).unwrap();
        pool.mint(ALICE, PoolBalances::new(amount0, amount1), 0)
            .unwrap();
        pool
    }

    #[test]
    fn test_new_rejects_zero_address() {
        let result = StreamingPool::new(ZERO_ADDRESS, PoolConfig::default(), 0);
        assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
    }

    #[test]
    fn test_first_mint_locks_minimum_liquidity() {
        let pool = seeded(e18(1), e18(4));
        let minimum = U256::from(1_000u64);

        assert_eq!(pool.total_supply(), e18(2));
        assert_eq!(pool.liquidity_balance_of(&ZERO_ADDRESS), minimum);
        assert_eq!(pool.liquidity_balance_of(&ALICE), e18(2) - minimum);
        assert_eq!(pool.reserves().reserve0, e18(1));
        assert_eq!(pool.reserves().reserve1, e18(4));
    }

    #[test]
    fn test_mint_without_deposit_fails() {
        let mut pool = seeded(e18(1), e18(4));
        let err = pool
            .mint(ALICE, PoolBalances::new(e18(1), e18(4)), 1)
            .unwrap_err();
        assert_eq!(err, PoolError::InsufficientLiquidityMinted);
        assert_eq!(pool.state().last_settled, 0);
    }

    #[test]
    fn test_tiny_first_mint_fails() {
        let mut pool = StreamingPool::new(POOL, PoolConfig::default(), 0).unwrap();
        let err = pool
            .mint(ALICE, PoolBalances::new(U256::from(1_000u64), U256::from(1_000u64)), 0)
            .unwrap_err();
        assert_eq!(err, PoolError::InsufficientLiquidityMinted);
        assert!(pool.total_supply().is_zero());
    }

    #[test]
    fn test_swap_requires_output() {
        let mut pool = seeded(e18(5), e18(10));
        let err = pool
            .swap(U256::zero(), U256::zero(), BOB, PoolBalances::new(e18(6), e18(10)), 1)
            .unwrap_err();
        assert_eq!(err, PoolError::InsufficientOutputAmount);
    }

    #[test]
    fn test_swap_output_must_stay_below_reserve() {
        let mut pool = seeded(e18(5), e18(10));
        let err = pool
            .swap(U256::zero(), e18(10), BOB, PoolBalances::new(e18(6), e18(10)), 1)
            .unwrap_err();
        assert_eq!(err, PoolError::InsufficientLiquidity);
    }

    #[test]
    fn test_swap_rejects_pool_as_recipient() {
        let mut pool = seeded(e18(5), e18(10));
        let err = pool
            .swap(U256::zero(), U256::one(), POOL, PoolBalances::new(e18(6), e18(10)), 1)
            .unwrap_err();
        assert_eq!(err, PoolError::InvalidRecipient(POOL));
    }

    #[test]
    fn test_swap_requires_input() {
        let mut pool = seeded(e18(5), e18(10));
        let err = pool
            .swap(U256::zero(), U256::one(), BOB, PoolBalances::new(e18(5), e18(10)), 1)
            .unwrap_err();
        assert_eq!(err, PoolError::InsufficientInputAmount);
    }

    #[test]
    fn test_swap_input_price_vector() {
        let expected = U256::from_dec_str("1662497915624478906").unwrap();
        let balances = PoolBalances::new(e18(6), e18(10));

        let mut pool = seeded(e18(5), e18(10));
        let err = pool
            .swap(U256::zero(), expected + 1, BOB, balances, 1)
            .unwrap_err();
        assert_eq!(err, PoolError::InvariantViolation);
        assert_eq!(pool.reserves().reserve1, e18(10));

        let applied = pool.swap(U256::zero(), expected, BOB, balances, 1).unwrap();
        assert_eq!(applied.receipt.amount0_in, e18(1));
        assert_eq!(
            applied.transfers,
            vec![Transfer {
                asset: Asset::Token1,
                to: BOB,
                amount: expected
            }]
        );
        assert_eq!(pool.reserves().reserve0, e18(6));
        assert_eq!(pool.reserves().reserve1, e18(10) - expected);
    }

    #[test]
    fn test_burn_returns_everything_but_minimum() {
        let mut pool = seeded(e18(3), e18(3));
        let liquidity = pool.liquidity_balance_of(&ALICE);
        pool.transfer_liquidity(ALICE, POOL, liquidity).unwrap();

        let applied = pool.burn(ALICE, PoolBalances::new(e18(3), e18(3)), 1).unwrap();
        let minimum = U256::from(1_000u64);
        assert_eq!(applied.receipt.amount0, e18(3) - minimum);
        assert_eq!(applied.receipt.amount1, e18(3) - minimum);
        assert_eq!(pool.reserves().reserve0, minimum);
        assert_eq!(pool.reserves().reserve1, minimum);
        assert_eq!(pool.total_supply(), minimum);
    }

    #[test]
    fn test_burn_without_liquidity_fails() {
        let mut pool = seeded(e18(3), e18(3));
        let err = pool
            .burn(ALICE, PoolBalances::new(e18(3), e18(3)), 1)
            .unwrap_err();
        assert_eq!(err, PoolError::InsufficientLiquidityBurned);
    }

    #[test]
    fn test_skim_sends_donations() {
        let mut pool = seeded(e18(3), e18(3));
        let applied = pool
            .skim(BOB, PoolBalances::new(e18(3) + U256::from(7u64), e18(3)), 5)
            .unwrap();
        assert_eq!(applied.receipt, (U256::from(7u64), U256::zero()));
        assert_eq!(applied.transfers.len(), 1);
        assert_eq!(pool.state().last_settled, 5);
    }

    #[test]
    fn test_flow_requires_liquidity() {
        let mut pool = StreamingPool::new(POOL, PoolConfig::default(), 0).unwrap();
        let err = pool
            .on_flow_created(ALICE, Asset::Token0, 1_000, 1)
            .unwrap_err();
        assert_eq!(err, PoolError::InsufficientLiquidity);
    }

    #[test]
    fn test_flow_rate_must_be_positive() {
        let mut pool = seeded(e18(10), e18(10));
        assert_eq!(
            pool.on_flow_created(ALICE, Asset::Token0, 0, 1).unwrap_err(),
            PoolError::InvalidFlowRate(0)
        );
        assert_eq!(
            pool.on_flow_created(ALICE, Asset::Token0, -5, 1).unwrap_err(),
            PoolError::InvalidFlowRate(-5)
        );
    }

    #[test]
    fn test_duplicate_flow_rejected() {
        let mut pool = seeded(e18(10), e18(10));
        pool.on_flow_created(ALICE, Asset::Token0, 1_000, 1).unwrap();
        let err = pool
            .on_flow_created(ALICE, Asset::Token0, 1_000, 2)
            .unwrap_err();
        assert_eq!(
            err,
            PoolError::StreamAlreadyExists {
                user: ALICE,
                asset: Asset::Token0
            }
        );
        // a flow of the other asset is fine
        pool.on_flow_created(ALICE, Asset::Token1, 500, 2).unwrap();
        assert_eq!(pool.total_flows(), (U256::from(1_000u64), U256::from(500u64)));
    }

    #[test]
    fn test_update_and_delete_unknown_stream() {
        let mut pool = seeded(e18(10), e18(10));
        let missing = PoolError::StreamNotFound {
            user: BOB,
            asset: Asset::Token1,
        };
        assert_eq!(
            pool.on_flow_updated(BOB, Asset::Token1, 10, 1).unwrap_err(),
            missing
        );
        assert_eq!(pool.on_flow_deleted(BOB, Asset::Token1, 1).unwrap_err(), missing);
    }

    #[test]
    fn test_update_replaces_rate_in_total() {
        let mut pool = seeded(e18(10), e18(10));
        pool.on_flow_created(ALICE, Asset::Token0, 1_000, 1).unwrap();
        pool.on_flow_created(BOB, Asset::Token0, 3_000, 1).unwrap();
        pool.on_flow_updated(ALICE, Asset::Token0, 250, 5).unwrap();
        assert_eq!(pool.total_flows().0, U256::from(3_250u64));
        assert_eq!(pool.stream(&ALICE).unwrap().flow_rate0, U256::from(250u64));
    }

    #[test]
    fn test_delete_pays_queried_balance() {
        let mut pool = seeded(e18(10), e18(10));
        pool.on_flow_created(ALICE, Asset::Token0, 1_000_000_000, 10)
            .unwrap();

        let expected = pool.user_balances_at(&ALICE, 620).unwrap();
        assert!(!expected.balance1.is_zero());

        let applied = pool.on_flow_deleted(ALICE, Asset::Token0, 620).unwrap();
        assert_eq!(applied.receipt.paid1, expected.balance1);
        assert_eq!(
            applied.transfers,
            vec![Transfer {
                asset: Asset::Token1,
                to: ALICE,
                amount: expected.balance1
            }]
        );
        assert!(pool.stream(&ALICE).is_none());
        assert!(pool.total_flows().0.is_zero());

        let dust = pool.total_swapped_funds_at(620).unwrap();
        assert!(dust.total_swapped_funds1 <= U256::from(100u64));
    }

    #[test]
    fn test_query_matches_mutation_bit_for_bit() {
        let mut pool = seeded(e18(10), e18(10));
        pool.on_flow_created(ALICE, Asset::Token0, 1_000_000_000, 0)
            .unwrap();
        pool.on_flow_created(BOB, Asset::Token1, 500_000_000, 30)
            .unwrap();

        let queried = pool.reserves_at(90).unwrap();
        let balances = PoolBalances::new(
            e18(10) + U256::from(90u64 * 1_000_000_000),
            e18(10) + U256::from(60u64 * 500_000_000),
        );
        let synced = pool.sync(balances, 90).unwrap();
        assert_eq!(synced, queried);
    }

    #[test]
    fn test_queries_reject_past_timestamps() {
        let mut pool = seeded(e18(10), e18(10));
        pool.sync(PoolBalances::new(e18(10), e18(10)), 50).unwrap();
        assert!(matches!(
            pool.reserves_at(49),
            Err(PoolError::InvalidTimestamp { .. })
        ));
        assert!(matches!(
            pool.user_balances_at(&ALICE, 10),
            Err(PoolError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_failed_operation_leaves_state_untouched() {
        let mut pool = seeded(e18(10), e18(10));
        pool.on_flow_created(ALICE, Asset::Token0, 1_000_000_000, 0)
            .unwrap();
        let before = *pool.state();

        let err = pool.swap(
            U256::zero(),
            e18(1),
            BOB,
            PoolBalances::new(e18(10), e18(10)),
            100,
        );
        assert!(err.is_err());
        assert_eq!(*pool.state(), before);
    }

    #[test]
    fn test_reconcile_counts_every_streamer() {
        let mut pool = seeded(e18(10), e18(10));
        pool.on_flow_created(ALICE, Asset::Token0, 1_000_000_000, 0)
            .unwrap();
        pool.on_flow_created(BOB, Asset::Token0, 3_000_000_000, 0)
            .unwrap();

        let report = pool.reconcile(Asset::Token1, e18(10), 500).unwrap();
        assert!(report.is_within(U256::from(100u64)));
        assert!(!report.owed_to_streamers.is_zero());
    }

    #[test]
    fn test_restore_undoes_burn() {
        let mut pool = seeded(e18(3), e18(3));
        let liquidity = pool.liquidity_balance_of(&ALICE);
        pool.transfer_liquidity(ALICE, POOL, liquidity).unwrap();
        let before = *pool.state();

        let checkpoint = pool.checkpoint_with_liquidity();
        pool.burn(ALICE, PoolBalances::new(e18(3), e18(3)), 1).unwrap();
        pool.restore(checkpoint);

        assert_eq!(*pool.state(), before);
        assert_eq!(pool.total_supply(), e18(3));
        assert_eq!(pool.liquidity_balance_of(&POOL), liquidity);
    }

    #[test]
    fn test_restore_brings_back_deleted_stream() {
        let mut pool = seeded(e18(10), e18(10));
        pool.on_flow_created(ALICE, Asset::Token0, 1_000_000_000, 0)
            .unwrap();
        let state = *pool.state();
        let record = pool.stream(&ALICE);

        let checkpoint = pool.checkpoint_with_stream(ALICE);
        pool.on_flow_deleted(ALICE, Asset::Token0, 100).unwrap();
        assert!(pool.stream(&ALICE).is_none());
        assert_eq!(pool.active_streams(), 0);

        pool.restore(checkpoint);
        assert_eq!(*pool.state(), state);
        assert_eq!(pool.stream(&ALICE), record);
        assert_eq!(pool.active_streams(), 1);
    }
}
