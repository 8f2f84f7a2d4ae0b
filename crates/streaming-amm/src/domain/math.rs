//! # Fixed-Point Math Kernel
//!
//! Integer-only primitives used by every reserve computation.
//!
//! ## Rounding
//!
//! Every function rounds toward zero. Rounding dust therefore stays in the
//! pool: a streamer is never credited more than the curve released.
//!
//! ## Totality
//!
//! Nothing here panics on valid unsigned input. Overflow and division by
//! zero come back as `ArithmeticError`.

use super::entities::{U256, U512};
use super::errors::ArithmeticError;

/// Fractional bits of the UQ112x112 price and per-flow index encodings.
pub const Q112_BITS: usize = 112;

/// 2^112
pub fn q112() -> U256 {
    U256::one() << Q112_BITS
}

pub fn add(a: U256, b: U256) -> Result<U256, ArithmeticError> {
    a.checked_add(b).ok_or(ArithmeticError::Overflow)
}

pub fn sub(a: U256, b: U256) -> Result<U256, ArithmeticError> {
    a.checked_sub(b).ok_or(ArithmeticError::Underflow)
}

pub fn mul(a: U256, b: U256) -> Result<U256, ArithmeticError> {
    a.checked_mul(b).ok_or(ArithmeticError::Overflow)
}

pub fn div(a: U256, b: U256) -> Result<U256, ArithmeticError> {
    a.checked_div(b).ok_or(ArithmeticError::DivisionByZero)
}

/// floor(a · b / denominator) with a 512-bit intermediate product.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, ArithmeticError> {
    if denominator.is_zero() {
        return Err(ArithmeticError::DivisionByZero);
    }
    let quotient = a.full_mul(b) / U512::from(denominator);
    U256::try_from(quotient).map_err(|_| ArithmeticError::Overflow)
}

/// floor(√y), Babylonian iteration.
///
/// Starts above the root and decreases monotonically, so intermediate
/// sums never overflow even for `U256::MAX`.
pub fn isqrt(y: U256) -> U256 {
    if y > U256::from(3u8) {
        let mut z = y;
        let mut x = y / 2 + 1;
        while x < z {
            z = x;
            x = (y / x + x) / 2;
        }
        z
    } else if !y.is_zero() {
        U256::one()
    } else {
        U256::zero()
    }
}

/// UQ112x112 encoding of `numerator / denominator`.
pub fn encode_price(numerator: U256, denominator: U256) -> Result<U256, ArithmeticError> {
    mul_div(numerator, q112(), denominator)
}

/// Amount released per unit of flow rate, as a Q112 index increment.
pub fn per_unit_flow(amount: U256, total_flow: U256) -> Result<U256, ArithmeticError> {
    mul_div(amount, q112(), total_flow)
}

/// Share of a Q112 index delta earned by `flow_rate`.
pub fn accrued(flow_rate: U256, index_delta: U256) -> Result<U256, ArithmeticError> {
    mul_div(flow_rate, index_delta, q112())
}
