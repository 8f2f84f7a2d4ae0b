//! # Settlement
//!
//! The only code that advances time. Produces new state values and never
//! writes through a reference, so a caller that fails later in the same
//! operation simply drops the result.
//!
//! ## Per-user entitlement
//!
//! Each interval releases `swapped1` token1 to token0 streamers (and
//! `swapped0` token0 to token1 streamers). Rather than walking every stream,
//! the pool advances a Q112 index per unit of flow rate:
//!
//! ```text
//! swapped_index1 += swapped1 · 2^112 / total_flow0
//! user.balance1  += user.flow_rate0 · (swapped_index1 − snapshot1) / 2^112
//! ```
//!
//! A user is only brought current when touched. Both divisions floor, so the
//! sum of user balances never exceeds `total_swapped_funds`.

use super::entities::{PoolState, StreamRecord, Timestamp, U256};
use super::errors::{ArithmeticError, PoolError};
use super::math;
use super::reserves::project_reserves;

/// Result of settling a pool to a timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settlement {
    pub state: PoolState,
    pub elapsed: Timestamp,
    pub swapped0: U256,
    pub swapped1: U256,
}

/// Settles `state` up to `now`.
///
/// # Errors
/// - `InvalidTimestamp` if `now` precedes the last settlement
/// - `Arithmetic` on projection or accumulator overflow
pub fn settle_pool(state: &PoolState, now: Timestamp) -> Result<Settlement, PoolError> {
    if now < state.last_settled {
        return Err(PoolError::InvalidTimestamp {
            requested: now,
            last_settled: state.last_settled,
        });
    }
    let elapsed = now - state.last_settled;
    let mut next = *state;

    if elapsed > 0 && !state.reserve0.is_zero() && !state.reserve1.is_zero() {
        let dt = U256::from(elapsed);
        let price0 = math::encode_price(state.reserve1, state.reserve0)?;
        let price1 = math::encode_price(state.reserve0, state.reserve1)?;
        next.price0_cumulative = math::add(next.price0_cumulative, math::mul(price0, dt)?)?;
        next.price1_cumulative = math::add(next.price1_cumulative, math::mul(price1, dt)?)?;
    }

    let projection = project_reserves(
        state.reserve0,
        state.reserve1,
        state.total_flow0,
        state.total_flow1,
        elapsed,
    )?;

    if !projection.swapped1.is_zero() {
        let step = math::per_unit_flow(projection.swapped1, state.total_flow0)?;
        next.swapped_index1 = math::add(next.swapped_index1, step)?;
        next.total_swapped_funds1 = math::add(next.total_swapped_funds1, projection.swapped1)?;
    }
    if !projection.swapped0.is_zero() {
        let step = math::per_unit_flow(projection.swapped0, state.total_flow1)?;
        next.swapped_index0 = math::add(next.swapped_index0, step)?;
        next.total_swapped_funds0 = math::add(next.total_swapped_funds0, projection.swapped0)?;
    }

    next.reserve0 = projection.reserve0;
    next.reserve1 = projection.reserve1;
    next.last_settled = now;

    Ok(Settlement {
        state: next,
        elapsed,
        swapped0: projection.swapped0,
        swapped1: projection.swapped1,
    })
}

/// Brings a stream record current against an already settled pool.
pub fn settle_stream(
    record: &StreamRecord,
    settled: &PoolState,
) -> Result<StreamRecord, ArithmeticError> {
    let mut next = *record;

    let delta1 = math::sub(settled.swapped_index1, record.index1_snapshot)?;
    if !record.flow_rate0.is_zero() && !delta1.is_zero() {
        next.balance1 = math::add(next.balance1, math::accrued(record.flow_rate0, delta1)?)?;
    }
    let delta0 = math::sub(settled.swapped_index0, record.index0_snapshot)?;
    if !record.flow_rate1.is_zero() && !delta0.is_zero() {
        next.balance0 = math::add(next.balance0, math::accrued(record.flow_rate1, delta0)?)?;
    }

    next.index0_snapshot = settled.swapped_index0;
    next.index1_snapshot = settled.swapped_index1;
    next.last_settled = settled.last_settled;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn pool(reserve0: u128, reserve1: u128) -> PoolState {
        PoolState {
            reserve0: U256::from(reserve0),
            reserve1: U256::from(reserve1),
            last_settled: 100,
            ..Default::default()
        }
    }

    #[test]
    fn test_rejects_time_travel() {
        let err = settle_pool(&pool(10, 10), 99).unwrap_err();
        assert_eq!(
            err,
            PoolError::InvalidTimestamp {
                requested: 99,
                last_settled: 100
            }
        );
    }

    #[test]
    fn test_zero_elapsed_is_identity() {
        let mut state = pool(10 * E18, 10 * E18);
        state.total_flow0 = U256::from(1_000_000_000u64);
        let settled = settle_pool(&state, 100).unwrap();
        assert_eq!(settled.state, state);
        assert_eq!(settled.elapsed, 0);
    }

    #[test]
    fn test_price_accumulators_use_pre_update_reserves() {
        let state = pool(3 * E18, 3 * E18);
        let settled = settle_pool(&state, 110).unwrap();
        let one = math::q112();
        assert_eq!(settled.state.price0_cumulative, one * 10);
        assert_eq!(settled.state.price1_cumulative, one * 10);
        assert_eq!(settled.state.last_settled, 110);
    }

    #[test]
    fn test_empty_pool_skips_accumulators() {
        let settled = settle_pool(&PoolState::default(), 50).unwrap();
        assert!(settled.state.price0_cumulative.is_zero());
        assert_eq!(settled.state.last_settled, 50);
    }

    #[test]
    fn test_single_stream_entitlement_matches_release() {
        let rate = U256::from(1_000_000_000u64);
        let mut state = pool(10 * E18, 10 * E18);
        state.total_flow0 = rate;

        let mut record = StreamRecord::anchored(&state);
        record.flow_rate0 = rate;

        let settled = settle_pool(&state, 700).unwrap();
        let record = settle_stream(&record, &settled.state).unwrap();

        assert_eq!(settled.state.total_swapped_funds1, settled.swapped1);
        assert!(record.balance1 <= settled.swapped1);
        assert!(settled.swapped1 - record.balance1 <= U256::one());
        assert!(record.balance0.is_zero());
        assert_eq!(record.last_settled, 700);
    }

    #[test]
    fn test_split_settlement_agrees_with_single_step() {
        let rate = U256::from(1_000_000_000u64);
        let mut state = pool(10 * E18, 10 * E18);
        state.total_flow1 = rate;

        let once = settle_pool(&state, 400).unwrap().state;
        let first = settle_pool(&state, 250).unwrap().state;
        let twice = settle_pool(&first, 400).unwrap().state;

        assert_eq!(once.reserve1, twice.reserve1);
        let diff = if once.reserve0 > twice.reserve0 {
            once.reserve0 - twice.reserve0
        } else {
            twice.reserve0 - once.reserve0
        };
        assert!(diff <= U256::one());
    }

    #[test]
    fn test_stream_anchored_late_earns_nothing_earlier() {
        let rate = U256::from(1_000_000_000u64);
        let mut state = pool(10 * E18, 10 * E18);
        state.total_flow0 = rate;
        let state = settle_pool(&state, 500).unwrap().state;

        let record = StreamRecord::anchored(&state);
        let record = settle_stream(&record, &state).unwrap();
        assert!(record.balance1.is_zero());
    }
}
