//! # Real-Time Reserve Calculator
//!
//! Projects settled reserves forward under constant aggregate flow rates.
//!
//! ## Cases
//!
//! | Flows | Derived reserve |
//! |-------|-----------------|
//! | none, or `dt = 0` | unchanged |
//! | token0 only | `R0' = R0 + r0·dt`, `R1' = ⌊K / R0'⌋` |
//! | token1 only | `R1' = R1 + r1·dt`, `R0' = ⌊K / R1'⌋` |
//! | both | `R0' = ⌊√(K·(R0 + r0·dt) / (R1 + r1·dt))⌋`, `R1' = ⌊K / R0'⌋` |
//!
//! The two-flow row is the square-root approximation of the continuous
//! TWAMM solution. It is exact when the flows are in the pool's price ratio
//! and converges to it as the interval shrinks.
//!
//! Whatever one side releases (`available − derived`) is owed to streamers of
//! the opposite asset.

use super::entities::{Timestamp, U256};
use super::errors::ArithmeticError;
use super::math;

/// Reserves after an interval plus the amounts released to streamers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Projection {
    pub reserve0: U256,
    pub reserve1: U256,
    /// token0 released to token1 streamers.
    pub swapped0: U256,
    /// token1 released to token0 streamers.
    pub swapped1: U256,
}

impl Projection {
    fn unchanged(reserve0: U256, reserve1: U256) -> Self {
        Self {
            reserve0,
            reserve1,
            ..Default::default()
        }
    }
}

/// Projects `(reserve0, reserve1)` forward by `dt` seconds.
///
/// Pure. The query path and the settling path both call this, so they can
/// never disagree.
pub fn project_reserves(
    reserve0: U256,
    reserve1: U256,
    total_flow0: U256,
    total_flow1: U256,
    dt: Timestamp,
) -> Result<Projection, ArithmeticError> {
    if dt == 0 || (total_flow0.is_zero() && total_flow1.is_zero()) {
        return Ok(Projection::unchanged(reserve0, reserve1));
    }

    let k = math::mul(reserve0, reserve1)?;
    if k.is_zero() {
        return Err(ArithmeticError::DivisionByZero);
    }

    let elapsed = U256::from(dt);
    let streamed0 = math::mul(total_flow0, elapsed)?;
    let streamed1 = math::mul(total_flow1, elapsed)?;
    let available0 = math::add(reserve0, streamed0)?;
    let available1 = math::add(reserve1, streamed1)?;

    let (derived0, derived1) = if total_flow1.is_zero() {
        (available0, (k / available0).min(available1))
    } else if total_flow0.is_zero() {
        ((k / available1).min(available0), available1)
    } else {
        let derived0 = math::isqrt(math::mul_div(k, available0, available1)?).min(available0);
        if derived0.is_zero() {
            return Err(ArithmeticError::DivisionByZero);
        }
        (derived0, (k / derived0).min(available1))
    };

    Ok(Projection {
        reserve0: derived0,
        reserve1: derived1,
        swapped0: available0 - derived0,
        swapped1: available1 - derived1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn u(n: u128) -> U256 {
        U256::from(n)
    }

    #[test]
    fn test_no_time_is_identity() {
        let p = project_reserves(u(10 * E18), u(10 * E18), u(1_000_000_000), u(7), 0).unwrap();
        assert_eq!(p, Projection::unchanged(u(10 * E18), u(10 * E18)));
    }

    #[test]
    fn test_no_flows_is_identity() {
        let p = project_reserves(u(5), u(9), U256::zero(), U256::zero(), 3_600).unwrap();
        assert_eq!(p.reserve0, u(5));
        assert_eq!(p.reserve1, u(9));
        assert!(p.swapped0.is_zero() && p.swapped1.is_zero());
    }

    #[test]
    fn test_empty_pool_with_flows_fails() {
        let err = project_reserves(U256::zero(), u(10), u(1), U256::zero(), 1).unwrap_err();
        assert_eq!(err, ArithmeticError::DivisionByZero);
    }

    #[test]
    fn test_token0_flow_is_linear_in_reserve0() {
        let r = u(10 * E18);
        let rate = u(1_000_000_000);
        let p = project_reserves(r, r, rate, U256::zero(), 600).unwrap();

        let a = r + rate * 600;
        let b = r * r / a;
        assert_eq!(p.reserve0, a);
        assert_eq!(p.reserve1, b);
        assert_eq!(p.swapped0, U256::zero());
        assert_eq!(p.swapped1, r - b);
    }

    #[test]
    fn test_token1_flow_is_linear_in_reserve1() {
        let r = u(10 * E18);
        let rate = u(1_000_000_000);
        let p = project_reserves(r, r, U256::zero(), rate, 600).unwrap();

        let b = r + rate * 600;
        assert_eq!(p.reserve1, b);
        assert_eq!(p.reserve0, r * r / b);
        assert_eq!(p.swapped0, r - r * r / b);
    }

    #[test]
    fn test_two_flows_match_square_root_approximation() {
        let r = 10 * E18;
        let (rate0, rate1, dt) = (1_000_000_000u128, 500_000_000u128, 60u64);
        let p = project_reserves(u(r), u(r), u(rate0), u(rate1), dt).unwrap();

        let k = (r as f64) * (r as f64);
        let a_avail = r as f64 + (rate0 * dt as u128) as f64;
        let b_avail = r as f64 + (rate1 * dt as u128) as f64;
        let a = (k * a_avail / b_avail).sqrt();
        let b = k / a;

        let r0 = p.reserve0.as_u128() as f64;
        let r1 = p.reserve1.as_u128() as f64;
        assert!((r0 - a).abs() / a < 1e-9);
        assert!((r1 - b).abs() / b < 1e-9);
    }

    #[test]
    fn test_two_flows_close_to_exact_solution() {
        let r = 10 * E18;
        let (rate0, rate1, dt) = (1_000_000_000u128, 500_000_000u128, 60u64);
        let p = project_reserves(u(r), u(r), u(rate0), u(rate1), dt).unwrap();

        let (ra, rb) = (r as f64, r as f64);
        let (ia, ib) = ((rate0 * dt as u128) as f64, (rate1 * dt as u128) as f64);
        let k = ra * rb;
        let c = ((ra * ib).sqrt() - (rb * ia).sqrt()) / ((ra * ib).sqrt() + (rb * ia).sqrt());
        let e = (2.0 * (ia * ib / k).sqrt()).exp();
        let exact_a = (k * ia / ib).sqrt() * (e + c) / (e - c);

        let r0 = p.reserve0.as_u128() as f64;
        assert!((r0 - exact_a).abs() / exact_a < 1e-4);
    }

    #[test]
    fn test_two_flows_release_both_sides() {
        let r = u(1_000 * E18);
        let p = project_reserves(r, r, u(E18), u(E18 / 2), 100).unwrap();
        assert!(!p.swapped0.is_zero());
        assert!(!p.swapped1.is_zero());
        assert_eq!(p.reserve0 + p.swapped0, r + u(100 * E18));
        assert_eq!(p.reserve1 + p.swapped1, r + u(50 * E18));
    }

    proptest! {
        #[test]
        fn prop_single_flow_never_increases_k(
            r0 in 1u128..=u64::MAX as u128,
            r1 in 1u128..=u64::MAX as u128,
            rate in 1u128..=u32::MAX as u128,
            dt in 1u64..=1_000_000,
        ) {
            let p = project_reserves(u(r0), u(r1), u(rate), U256::zero(), dt).unwrap();
            let k_before = u(r0) * u(r1);
            let k_after = p.reserve0 * p.reserve1;
            prop_assert!(k_after <= k_before);
            // floor loses strictly less than one unit of reserve1
            prop_assert!(k_before - k_after < p.reserve0);
        }

        #[test]
        fn prop_released_plus_reserve_equals_available(
            r0 in 1u128..=u64::MAX as u128,
            r1 in 1u128..=u64::MAX as u128,
            f0 in 0u128..=u32::MAX as u128,
            f1 in 0u128..=u32::MAX as u128,
            dt in 0u64..=1_000_000,
        ) {
            let p = project_reserves(u(r0), u(r1), u(f0), u(f1), dt).unwrap();
            prop_assert_eq!(p.reserve0 + p.swapped0, u(r0) + u(f0) * u(dt as u128));
            prop_assert_eq!(p.reserve1 + p.swapped1, u(r1) + u(f1) * u(dt as u128));
        }

        #[test]
        fn prop_projection_is_deterministic(
            r0 in 1u128..=u64::MAX as u128,
            f1 in 1u128..=u32::MAX as u128,
            dt in 0u64..=86_400,
        ) {
            let a = project_reserves(u(r0), u(r0), U256::zero(), u(f1), dt).unwrap();
            let b = project_reserves(u(r0), u(r0), U256::zero(), u(f1), dt).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
