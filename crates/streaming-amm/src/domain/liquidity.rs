//! # Liquidity Token Ledger
//!
//! Total supply and per-holder balances of the pool's LP token.
//!
//! Burning works on the LP tokens held by the pool's own address: a provider
//! first transfers liquidity to the pool, then calls burn.

use super::entities::{Address, U256};
use super::errors::{ArithmeticError, PoolError};
use super::math;
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct LiquidityLedger {
    total_supply: U256,
    balances: HashMap<Address, U256>,
}

impl LiquidityLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, holder: &Address) -> U256 {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    pub fn mint(&mut self, to: Address, amount: U256) -> Result<(), ArithmeticError> {
        let supply = math::add(self.total_supply, amount)?;
        let balance = math::add(self.balance_of(&to), amount)?;
        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    pub fn burn(&mut self, from: Address, amount: U256) -> Result<(), PoolError> {
        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(PoolError::InsufficientLiquidityBalance {
                required: amount,
                available: balance,
            });
        }
        self.total_supply = math::sub(self.total_supply, amount)?;
        self.set_balance(from, balance - amount);
        Ok(())
    }

    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), PoolError> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(PoolError::InsufficientLiquidityBalance {
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = math::add(self.balance_of(&to), amount)?;
        self.set_balance(from, available - amount);
        self.set_balance(to, credited);
        Ok(())
    }

    fn set_balance(&mut self, holder: Address, amount: U256) {
        if amount.is_zero() {
            self.balances.remove(&holder);
        } else {
            self.balances.insert(holder, amount);
        }
    }
}

/// LP tokens owed to the protocol for fee growth since `k_last`.
///
/// One sixth of the growth in `√K`, expressed as newly minted supply:
/// `S · (√K − √K_last) / (5·√K + √K_last)`.
pub fn protocol_fee_liquidity(
    total_supply: U256,
    reserve0: U256,
    reserve1: U256,
    k_last: U256,
) -> Result<U256, ArithmeticError> {
    if k_last.is_zero() {
        return Ok(U256::zero());
    }
    let root_k = math::isqrt(math::mul(reserve0, reserve1)?);
    let root_k_last = math::isqrt(k_last);
    if root_k <= root_k_last {
        return Ok(U256::zero());
    }
    let numerator = math::mul(total_supply, root_k - root_k_last)?;
    let denominator = math::add(math::mul(root_k, U256::from(5u8))?, root_k_last)?;
    math::div(numerator, denominator)
}
