//! # In-Memory Streaming Ledger
//!
//! A token ledger with constant-rate flows, for tests and the simulator.
//! Implements both `AssetLedger` and `FlowProvider`.
//!
//! Account balances are stored as a settled amount plus net flow rates and
//! evaluated against the injected clock, so a receiver's balance grows
//! every second without any writes.

use crate::domain::{Address, Asset, FlowRate, PoolError, Timestamp, U256};
use crate::ports::outbound::{AssetLedger, FlowProvider, TimeSource};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Callback run after `account` receives a transfer, with no ledger lock
/// held.
pub type TransferHook = Arc<dyn Fn(Asset, &Address, U256) + Send + Sync>;

#[derive(Clone, Copy, Debug, Default)]
struct AccountEntry {
    settled: U256,
    inflow: U256,
    outflow: U256,
    updated_at: Timestamp,
}

impl AccountEntry {
    /// Balance at `now`, floored at zero when outflows outrun funds.
    fn balance_at(&self, now: Timestamp) -> U256 {
        let dt = U256::from(now.saturating_sub(self.updated_at));
        let credited = self.settled.saturating_add(self.inflow.saturating_mul(dt));
        credited.saturating_sub(self.outflow.saturating_mul(dt))
    }

    fn settle(&mut self, now: Timestamp) {
        self.settled = self.balance_at(now);
        self.updated_at = now;
    }
}

pub struct InMemoryLedger<C: TimeSource> {
    clock: Arc<C>,
    accounts: RwLock<HashMap<(Asset, Address), AccountEntry>>,
    flows: RwLock<HashMap<(Asset, Address, Address), FlowRate>>,
    hooks: RwLock<HashMap<Address, TransferHook>>,
    blocked: RwLock<HashSet<(Asset, Address)>>,
}

impl<C: TimeSource> InMemoryLedger<C> {
    pub fn new(clock: Arc<C>) -> Self {
        Self {
            clock,
            accounts: RwLock::new(HashMap::new()),
            flows: RwLock::new(HashMap::new()),
            hooks: RwLock::new(HashMap::new()),
            blocked: RwLock::new(HashSet::new()),
        }
    }

    /// Credits `amount` out of thin air.
    pub fn mint(&self, asset: Asset, to: Address, amount: U256) {
        let now = self.clock.now();
        let mut accounts = self.accounts.write();
        let entry = accounts.entry((asset, to)).or_default();
        entry.settle(now);
        entry.settled = entry.settled.saturating_add(amount);
    }

    /// Runs `hook` after every transfer into `account`.
    pub fn on_transfer(&self, account: Address, hook: TransferHook) {
        self.hooks.write().insert(account, hook);
    }

    /// Makes every transfer of `asset` into `account` fail, the way a
    /// token with a deny list rejects a frozen holder.
    pub fn block_recipient(&self, asset: Asset, account: Address) {
        self.blocked.write().insert((asset, account));
    }

    pub fn create_flow(
        &self,
        asset: Asset,
        sender: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<(), PoolError> {
        if rate <= 0 {
            return Err(PoolError::InvalidFlowRate(rate));
        }
        let mut flows = self.flows.write();
        if flows.contains_key(&(asset, sender, receiver)) {
            return Err(PoolError::Ledger(format!(
                "{asset:?} flow already exists"
            )));
        }
        self.shift_rates(asset, sender, receiver, 0, rate);
        flows.insert((asset, sender, receiver), rate);
        Ok(())
    }

    pub fn update_flow(
        &self,
        asset: Asset,
        sender: Address,
        receiver: Address,
        rate: FlowRate,
    ) -> Result<(), PoolError> {
        if rate <= 0 {
            return Err(PoolError::InvalidFlowRate(rate));
        }
        let mut flows = self.flows.write();
        let previous = *flows
            .get(&(asset, sender, receiver))
            .ok_or_else(|| PoolError::Ledger(format!("no {asset:?} flow to update")))?;
        self.shift_rates(asset, sender, receiver, previous, rate);
        flows.insert((asset, sender, receiver), rate);
        Ok(())
    }

    pub fn delete_flow(
        &self,
        asset: Asset,
        sender: Address,
        receiver: Address,
    ) -> Result<(), PoolError> {
        let mut flows = self.flows.write();
        let previous = flows
            .remove(&(asset, sender, receiver))
            .ok_or_else(|| PoolError::Ledger(format!("no {asset:?} flow to delete")))?;
        self.shift_rates(asset, sender, receiver, previous, 0);
        Ok(())
    }

    /// Settles both accounts and swaps `previous` for `next` in their rates.
    fn shift_rates(
        &self,
        asset: Asset,
        sender: Address,
        receiver: Address,
        previous: FlowRate,
        next: FlowRate,
    ) {
        let now = self.clock.now();
        let previous = U256::from(previous.max(0) as u128);
        let next = U256::from(next.max(0) as u128);
        let mut accounts = self.accounts.write();

        let out = accounts.entry((asset, sender)).or_default();
        out.settle(now);
        out.outflow = out.outflow.saturating_sub(previous).saturating_add(next);

        let inbound = accounts.entry((asset, receiver)).or_default();
        inbound.settle(now);
        inbound.inflow = inbound.inflow.saturating_sub(previous).saturating_add(next);
    }
}

impl<C: TimeSource> AssetLedger for InMemoryLedger<C> {
    fn balance_of(&self, asset: Asset, account: &Address) -> Result<U256, PoolError> {
        let now = self.clock.now();
        Ok(self
            .accounts
            .read()
            .get(&(asset, *account))
            .map(|entry| entry.balance_at(now))
            .unwrap_or_default())
    }

    fn transfer(
        &self,
        asset: Asset,
        from: &Address,
        to: &Address,
        amount: U256,
    ) -> Result<(), PoolError> {
        if self.blocked.read().contains(&(asset, *to)) {
            return Err(PoolError::Ledger(format!(
                "{asset:?} recipient {to:?} is blocked"
            )));
        }
        let now = self.clock.now();
        {
            let mut accounts = self.accounts.write();
            let source = accounts.entry((asset, *from)).or_default();
            source.settle(now);
            if source.settled < amount {
                return Err(PoolError::Ledger(format!(
                    "insufficient {asset:?} balance: required {amount}, available {}",
                    source.settled
                )));
            }
            source.settled -= amount;

            let target = accounts.entry((asset, *to)).or_default();
            target.settle(now);
            target.settled = target.settled.saturating_add(amount);
        }

        let hook = self.hooks.read().get(to).cloned();
        if let Some(hook) = hook {
            hook(asset, to, amount);
        }
        Ok(())
    }
}

impl<C: TimeSource> FlowProvider for InMemoryLedger<C> {
    fn get_flow_rate(
        &self,
        asset: Asset,
        sender: &Address,
        receiver: &Address,
    ) -> Result<FlowRate, PoolError> {
        Ok(self
            .flows
            .read()
            .get(&(asset, *sender, *receiver))
            .copied()
            .unwrap_or(0))
    }
}
