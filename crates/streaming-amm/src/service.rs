//! # Pool Service
//!
//! Thread-safe front of the streaming pool. Wires the domain pool to the
//! outbound ports and implements both inbound ports.
//!
//! ## Call sequence
//!
//! ```text
//! enter guard ─→ read clock + ledger ─→ write lock: checkpoint, domain op
//!             ─→ payouts (undo on failure) ─→ publish events ─→ leave guard
//! ```
//!
//! ## Reentrancy
//!
//! Mutations are serialized by a busy flag taken with a compare-exchange. A
//! mutation that arrives while another is in flight, including one made from
//! a transfer hook during the first call's payout, fails with
//! `PoolError::Locked`. The flag is cleared on every exit path.
//!
//! Queries never take the flag. They read the last committed pool under a
//! read lock, which is only held exclusively while a domain op commits, so a
//! hook running during a payout sees the new state.
//!
//! ## Payout failure
//!
//! The pool commits before paying out. If a transfer fails, the transfers
//! already made by the call are sent back and the pool is restored from the
//! checkpoint taken before the domain op; no event is published.

use crate::domain::{
    Address, Applied, Asset, BurnReceipt, Checkpoint, FlowChange, FlowRate, FlowReceipt,
    MintReceipt, PoolBalances, PoolError, PoolState, ReconciliationReport, Reserves,
    StreamRecord, StreamingPool, SwapReceipt, SwappedFunds, Timestamp, Transfer, UserBalances,
    U256,
};
use crate::events::PoolEvent;
use crate::metrics;
use crate::ports::inbound::{FlowLifecycleHandler, StreamingPoolApi};
use crate::ports::outbound::{AssetLedger, EventPublisher, FlowProvider, TimeSource};

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub struct PoolService<L, F, E, C>
where
    L: AssetLedger,
    F: FlowProvider,
    E: EventPublisher,
    C: TimeSource,
{
    address: Address,
    pool: RwLock<StreamingPool>,
    busy: AtomicBool,
    ledger: Arc<L>,
    flows: Arc<F>,
    events: Arc<E>,
    clock: Arc<C>,
}

/// Marks a mutating call in flight. Clears the busy flag on drop.
struct CallGuard<'a>(&'a AtomicBool);

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A committed domain op, waiting for its payouts.
struct Commit<T> {
    applied: Applied<T>,
    checkpoint: Checkpoint,
    settled_before: Timestamp,
    state: PoolState,
    active_streams: usize,
}

impl<L, F, E, C> PoolService<L, F, E, C>
where
    L: AssetLedger,
    F: FlowProvider,
    E: EventPublisher,
    C: TimeSource,
{
    pub fn new(
        pool: StreamingPool,
        ledger: Arc<L>,
        flows: Arc<F>,
        events: Arc<E>,
        clock: Arc<C>,
    ) -> Self {
        info!(pool = ?pool.address(), config = ?pool.config(), "streaming pool ready");
        Self {
            address: pool.address(),
            pool: RwLock::new(pool),
            busy: AtomicBool::new(false),
            ledger,
            flows,
            events,
            clock,
        }
    }

    /// Address holding the pool's assets.
    pub fn address(&self) -> Address {
        self.address
    }

    fn enter(&self) -> Result<CallGuard<'_>, PoolError> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| CallGuard(&self.busy))
            .map_err(|_| PoolError::Locked)
    }

    fn balances(&self) -> Result<PoolBalances, PoolError> {
        Ok(PoolBalances::new(
            self.ledger.balance_of(Asset::Token0, &self.address)?,
            self.ledger.balance_of(Asset::Token1, &self.address)?,
        ))
    }

    /// Runs `op` under the write lock after taking `checkpoint` of the pool.
    fn commit<T>(
        &self,
        checkpoint: impl FnOnce(&StreamingPool) -> Checkpoint,
        op: impl FnOnce(&mut StreamingPool) -> Result<Applied<T>, PoolError>,
    ) -> Result<Commit<T>, PoolError> {
        let mut pool = self.pool.write();
        let checkpoint = checkpoint(&*pool);
        let settled_before = pool.state().last_settled;
        let applied = op(&mut *pool)?;
        Ok(Commit {
            applied,
            checkpoint,
            settled_before,
            state: *pool.state(),
            active_streams: pool.active_streams(),
        })
    }

    /// Executes committed payouts, undoing the call if one fails.
    fn pay(&self, transfers: &[Transfer], checkpoint: Checkpoint) -> Result<(), PoolError> {
        for (done, transfer) in transfers.iter().enumerate() {
            debug!(asset = ?transfer.asset, to = ?transfer.to, amount = %transfer.amount, "payout");
            if let Err(err) =
                self.ledger
                    .transfer(transfer.asset, &self.address, &transfer.to, transfer.amount)
            {
                warn!(asset = ?transfer.asset, error = %err, "payout failed, rolling back");
                self.refund(&transfers[..done]);
                self.pool.write().restore(checkpoint);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Pulls back payouts already made by a call that is being undone.
    fn refund(&self, made: &[Transfer]) {
        for transfer in made.iter().rev() {
            if let Err(err) =
                self.ledger
                    .transfer(transfer.asset, &transfer.to, &self.address, transfer.amount)
            {
                error!(
                    asset = ?transfer.asset,
                    to = ?transfer.to,
                    amount = %transfer.amount,
                    error = %err,
                    "could not reclaim payout"
                );
            }
        }
    }

    fn publish_sync(&self, state: &PoolState) {
        self.events.publish(PoolEvent::Sync {
            reserve0: state.reserve0,
            reserve1: state.reserve1,
            timestamp: state.last_settled,
        });
    }

    fn record_settlement(&self, settled_before: Timestamp, state: &PoolState) {
        if state.last_settled > settled_before {
            debug!(
                from = settled_before,
                to = state.last_settled,
                reserve0 = %state.reserve0,
                reserve1 = %state.reserve1,
                "settled"
            );
            metrics::record_settlement();
        }
    }

    fn observe<T>(&self, operation: &'static str, result: Result<T, PoolError>) -> Result<T, PoolError> {
        if let Err(err) = &result {
            warn!(operation, reason = err.reason(), error = %err, "call rejected");
            metrics::record_rejection(err.reason());
        }
        result
    }

    fn try_swap(
        &self,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        data: Vec<u8>,
    ) -> Result<SwapReceipt, PoolError> {
        let _guard = self.enter()?;
        let now = self.clock.now();
        let balances = self.balances()?;

        let Commit {
            applied,
            checkpoint,
            settled_before,
            state,
            ..
        } = self.commit(StreamingPool::checkpoint, |pool| {
            pool.swap(amount0_out, amount1_out, to, balances, now)
        })?;
        self.pay(&applied.transfers, checkpoint)?;
        self.record_settlement(settled_before, &state);

        let receipt = applied.receipt;
        self.publish_sync(&state);
        self.events.publish(PoolEvent::Swap {
            to,
            amount0_in: receipt.amount0_in,
            amount1_in: receipt.amount1_in,
            amount0_out: receipt.amount0_out,
            amount1_out: receipt.amount1_out,
            data,
        });

        metrics::record_swap();
        info!(
            amount0_in = %receipt.amount0_in,
            amount1_in = %receipt.amount1_in,
            amount0_out = %receipt.amount0_out,
            amount1_out = %receipt.amount1_out,
            "swap executed"
        );
        Ok(receipt)
    }

    fn try_mint(&self, to: Address) -> Result<MintReceipt, PoolError> {
        let _guard = self.enter()?;
        let now = self.clock.now();
        let balances = self.balances()?;

        let Commit {
            applied,
            checkpoint,
            settled_before,
            state,
            ..
        } = self.commit(StreamingPool::checkpoint, |pool| pool.mint(to, balances, now))?;
        self.pay(&applied.transfers, checkpoint)?;
        self.record_settlement(settled_before, &state);

        let receipt = applied.receipt;
        self.publish_sync(&state);
        self.events.publish(PoolEvent::Mint {
            to,
            amount0: receipt.amount0,
            amount1: receipt.amount1,
            liquidity: receipt.liquidity,
        });

        metrics::record_liquidity("mint");
        info!(
            liquidity = %receipt.liquidity,
            protocol_fee = %receipt.protocol_fee,
            "liquidity minted"
        );
        Ok(receipt)
    }

    fn try_burn(&self, to: Address) -> Result<BurnReceipt, PoolError> {
        let _guard = self.enter()?;
        let now = self.clock.now();
        let balances = self.balances()?;

        let Commit {
            applied,
            checkpoint,
            settled_before,
            state,
            ..
        } = self.commit(StreamingPool::checkpoint_with_liquidity, |pool| {
            pool.burn(to, balances, now)
        })?;
        self.pay(&applied.transfers, checkpoint)?;
        self.record_settlement(settled_before, &state);

        let receipt = applied.receipt;
        self.publish_sync(&state);
        self.events.publish(PoolEvent::Burn {
            to,
            amount0: receipt.amount0,
            amount1: receipt.amount1,
            liquidity: receipt.liquidity,
        });

        metrics::record_liquidity("burn");
        info!(
            liquidity = %receipt.liquidity,
            amount0 = %receipt.amount0,
            amount1 = %receipt.amount1,
            "liquidity burned"
        );
        Ok(receipt)
    }

    fn try_sync(&self) -> Result<Reserves, PoolError> {
        let _guard = self.enter()?;
        let now = self.clock.now();
        let balances = self.balances()?;

        let commit = self.commit(StreamingPool::checkpoint, |pool| {
            pool.sync(balances, now).map(Applied::without_transfers)
        })?;
        self.record_settlement(commit.settled_before, &commit.state);
        self.publish_sync(&commit.state);
        Ok(commit.applied.receipt)
    }

    fn try_skim(&self, to: Address) -> Result<(U256, U256), PoolError> {
        let _guard = self.enter()?;
        let now = self.clock.now();
        let balances = self.balances()?;

        let Commit {
            applied,
            checkpoint,
            settled_before,
            state,
            ..
        } = self.commit(StreamingPool::checkpoint, |pool| pool.skim(to, balances, now))?;
        self.pay(&applied.transfers, checkpoint)?;
        self.record_settlement(settled_before, &state);
        Ok(applied.receipt)
    }

    fn try_transfer_liquidity(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), PoolError> {
        let _guard = self.enter()?;
        self.pool.write().transfer_liquidity(from, to, amount)?;
        self.events
            .publish(PoolEvent::LiquidityTransfer { from, to, amount });
        Ok(())
    }

    /// Pays out a committed flow change, then publishes its event.
    fn finish_flow(&self, commit: Commit<FlowReceipt>) -> Result<FlowReceipt, PoolError> {
        let Commit {
            applied,
            checkpoint,
            settled_before,
            state,
            active_streams,
        } = commit;
        self.pay(&applied.transfers, checkpoint)?;
        self.record_settlement(settled_before, &state);

        let receipt = applied.receipt;
        self.events.publish(PoolEvent::FlowSettled {
            user: receipt.user,
            asset: receipt.asset,
            change: receipt.change,
            flow_rate: receipt.flow_rate,
            paid0: receipt.paid0,
            paid1: receipt.paid1,
            timestamp: receipt.timestamp,
        });

        let kind = match receipt.change {
            FlowChange::Created => "created",
            FlowChange::Updated => "updated",
            FlowChange::Deleted => "deleted",
        };
        metrics::record_flow(kind);
        metrics::set_active_streams(active_streams);
        info!(
            kind,
            asset = ?receipt.asset,
            flow_rate = %receipt.flow_rate,
            paid0 = %receipt.paid0,
            paid1 = %receipt.paid1,
            "flow settled"
        );
        Ok(receipt)
    }

    /// Checks a notified rate against what the streaming protocol reports.
    fn verify_rate(&self, user: &Address, asset: Asset, notified: FlowRate) -> Result<(), PoolError> {
        let actual = self.flows.get_flow_rate(asset, user, &self.address)?;
        if actual != notified {
            return Err(PoolError::FlowRateMismatch {
                asset,
                notified,
                actual,
            });
        }
        Ok(())
    }

    fn try_flow_created(
        &self,
        user: Address,
        asset: Asset,
        rate: FlowRate,
    ) -> Result<FlowReceipt, PoolError> {
        let _guard = self.enter()?;
        self.verify_rate(&user, asset, rate)?;
        let now = self.clock.now();
        let commit = self.commit(StreamingPool::checkpoint, |pool| {
            pool.on_flow_created(user, asset, rate, now)
        })?;
        self.finish_flow(commit)
    }

    fn try_flow_updated(
        &self,
        user: Address,
        asset: Asset,
        rate: FlowRate,
    ) -> Result<FlowReceipt, PoolError> {
        let _guard = self.enter()?;
        self.verify_rate(&user, asset, rate)?;
        let now = self.clock.now();
        let commit = self.commit(StreamingPool::checkpoint, |pool| {
            pool.on_flow_updated(user, asset, rate, now)
        })?;
        self.finish_flow(commit)
    }

    fn try_flow_deleted(&self, user: Address, asset: Asset) -> Result<FlowReceipt, PoolError> {
        let _guard = self.enter()?;
        self.verify_rate(&user, asset, 0)?;
        let now = self.clock.now();
        let commit = self.commit(
            |pool: &StreamingPool| pool.checkpoint_with_stream(user),
            |pool| pool.on_flow_deleted(user, asset, now),
        )?;
        self.finish_flow(commit)
    }
}

impl<L, F, E, C> StreamingPoolApi for PoolService<L, F, E, C>
where
    L: AssetLedger,
    F: FlowProvider,
    E: EventPublisher,
    C: TimeSource,
{
    #[instrument(skip(self, data))]
    fn swap(
        &self,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
        data: Vec<u8>,
    ) -> Result<SwapReceipt, PoolError> {
        self.observe("swap", self.try_swap(amount0_out, amount1_out, to, data))
    }

    #[instrument(skip(self))]
    fn mint(&self, to: Address) -> Result<MintReceipt, PoolError> {
        self.observe("mint", self.try_mint(to))
    }

    #[instrument(skip(self))]
    fn burn(&self, to: Address) -> Result<BurnReceipt, PoolError> {
        self.observe("burn", self.try_burn(to))
    }

    #[instrument(skip(self))]
    fn sync(&self) -> Result<Reserves, PoolError> {
        self.observe("sync", self.try_sync())
    }

    #[instrument(skip(self))]
    fn skim(&self, to: Address) -> Result<(U256, U256), PoolError> {
        self.observe("skim", self.try_skim(to))
    }

    #[instrument(skip(self))]
    fn transfer_liquidity(
        &self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), PoolError> {
        self.observe(
            "transfer_liquidity",
            self.try_transfer_liquidity(from, to, amount),
        )
    }

    fn get_reserves(&self) -> Result<Reserves, PoolError> {
        Ok(self.pool.read().reserves())
    }

    fn get_real_time_reserves(&self) -> Result<Reserves, PoolError> {
        self.pool.read().reserves_at(self.clock.now())
    }

    fn get_reserves_at_time(&self, time: Timestamp) -> Result<Reserves, PoolError> {
        self.pool.read().reserves_at(time)
    }

    fn get_real_time_user_balances(&self, user: Address) -> Result<UserBalances, PoolError> {
        self.pool.read().user_balances_at(&user, self.clock.now())
    }

    fn get_user_balances_at_time(
        &self,
        user: Address,
        time: Timestamp,
    ) -> Result<UserBalances, PoolError> {
        self.pool.read().user_balances_at(&user, time)
    }

    fn get_real_time_total_swapped_funds(&self) -> Result<SwappedFunds, PoolError> {
        self.pool.read().total_swapped_funds_at(self.clock.now())
    }

    fn price_cumulative_last(&self) -> Result<(U256, U256), PoolError> {
        Ok(self.pool.read().price_cumulative_last())
    }

    fn k_last(&self) -> Result<U256, PoolError> {
        Ok(self.pool.read().k_last())
    }

    fn total_flows(&self) -> Result<(U256, U256), PoolError> {
        Ok(self.pool.read().total_flows())
    }

    fn stream(&self, user: Address) -> Result<Option<StreamRecord>, PoolError> {
        Ok(self.pool.read().stream(&user))
    }

    fn liquidity_balance_of(&self, holder: Address) -> Result<U256, PoolError> {
        Ok(self.pool.read().liquidity_balance_of(&holder))
    }

    fn total_supply(&self) -> Result<U256, PoolError> {
        Ok(self.pool.read().total_supply())
    }

    #[instrument(skip(self))]
    fn reconcile(&self, asset: Asset) -> Result<ReconciliationReport, PoolError> {
        let pool = self.pool.read();
        let ledger_balance = self.ledger.balance_of(asset, &self.address)?;
        let report = pool.reconcile(asset, ledger_balance, self.clock.now())?;
        if !report.is_within(pool.config().dust_tolerance) {
            warn!(
                ledger = %report.ledger_balance,
                reserve = %report.reserve,
                owed = %report.owed_to_streamers,
                "ledger balance outside dust tolerance"
            );
        }
        Ok(report)
    }
}

impl<L, F, E, C> FlowLifecycleHandler for PoolService<L, F, E, C>
where
    L: AssetLedger,
    F: FlowProvider,
    E: EventPublisher,
    C: TimeSource,
{
    #[instrument(skip(self))]
    fn on_flow_created(
        &self,
        user: Address,
        asset: Asset,
        rate: FlowRate,
    ) -> Result<FlowReceipt, PoolError> {
        self.observe("flow_created", self.try_flow_created(user, asset, rate))
    }

    #[instrument(skip(self))]
    fn on_flow_updated(
        &self,
        user: Address,
        asset: Asset,
        rate: FlowRate,
    ) -> Result<FlowReceipt, PoolError> {
        self.observe("flow_updated", self.try_flow_updated(user, asset, rate))
    }

    #[instrument(skip(self))]
    fn on_flow_deleted(&self, user: Address, asset: Asset) -> Result<FlowReceipt, PoolError> {
        self.observe("flow_deleted", self.try_flow_deleted(user, asset))
    }
}
