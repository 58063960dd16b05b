//! Fixed-point arithmetic
//!
//! All amounts are unsigned integers scaled by [`SCALE`]. Products are formed
//! in 256 bits and truncated toward zero after division, so results are
//! bit-exact and independent of evaluation platform.

use crate::error::{GvtError, Result};
use crate::types::Amount;
use primitive_types::U256;

/// 1.0 in 18-decimal fixed point
pub const SCALE: u128 = 1_000_000_000_000_000_000;

/// 100% in basis points
pub const BASIS_POINTS: u128 = 10_000;

/// 1.0x expressed as a percentage multiplier
pub const PERCENT: u128 = 100;

/// `a * b / denominator`, truncated, with a 256-bit intermediate product
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(GvtError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    narrow(product / U256::from(denominator))
}

/// `a * b * c / denominator`, truncated
///
/// The triple product can reach ~2^384 only for absurd inputs; anything that
/// does not fit in 256 bits is reported as overflow.
pub fn mul_mul_div(a: u128, b: u128, c: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(GvtError::DivisionByZero);
    }
    let product = (U256::from(a) * U256::from(b))
        .checked_mul(U256::from(c))
        .ok_or(GvtError::MathOverflow)?;
    narrow(product / U256::from(denominator))
}

/// `amount * bps / 10_000`
pub fn apply_bps(amount: Amount, bps: u128) -> Result<Amount> {
    mul_div(amount, bps, BASIS_POINTS)
}

/// `amount * percent / 100`
pub fn apply_percent(amount: Amount, percent: u128) -> Result<Amount> {
    mul_div(amount, percent, PERCENT)
}

pub fn checked_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(GvtError::MathOverflow)
}

pub fn checked_sub(a: u128, b: u128) -> Result<u128> {
    a.checked_sub(b).ok_or(GvtError::MathOverflow)
}

fn narrow(value: U256) -> Result<u128> {
    if value > U256::from(u128::MAX) {
        return Err(GvtError::MathOverflow);
    }
    Ok(value.low_u128())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mul_div_truncates() {
        assert_eq!(mul_div(10, 3, 4).unwrap(), 7);
        assert_eq!(mul_div(1, 1, 2).unwrap(), 0);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 1e30 * 1e30 overflows u128 but the quotient fits.
        let big = 1_000_000_000_000_000_000_000_000_000_000u128;
        assert_eq!(mul_div(big, big, big).unwrap(), big);
    }

    #[test]
    fn test_mul_mul_div_reward_shape() {
        // 1000 tokens (18 decimals) at 1e15/s for a year.
        let amount = 1_000 * SCALE;
        let rate = 1_000_000_000_000_000u128;
        let elapsed = 365 * 86_400u128;
        let expected = amount / SCALE * rate * elapsed;
        assert_eq!(mul_mul_div(amount, rate, elapsed, SCALE).unwrap(), expected);
    }

    #[test]
    fn test_overflow_reported() {
        assert_eq!(
            mul_div(u128::MAX, u128::MAX, 1),
            Err(GvtError::MathOverflow)
        );
        assert_eq!(checked_add(u128::MAX, 1), Err(GvtError::MathOverflow));
        assert_eq!(checked_sub(0, 1), Err(GvtError::MathOverflow));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(mul_div(1, 1, 0), Err(GvtError::DivisionByZero));
        assert_eq!(mul_mul_div(1, 1, 1, 0), Err(GvtError::DivisionByZero));
    }

    #[test]
    fn test_bps_and_percent() {
        assert_eq!(apply_bps(1_000, 1_000).unwrap(), 100);
        assert_eq!(apply_percent(86_400, 150).unwrap(), 129_600);
        assert_eq!(apply_percent(7, 110).unwrap(), 7);
    }

    proptest! {
        #[test]
        fn prop_mul_div_matches_u128_when_small(a in any::<u64>(), b in any::<u64>(), d in 1u64..=u64::MAX) {
            let expected = (a as u128) * (b as u128) / (d as u128);
            prop_assert_eq!(mul_div(a as u128, b as u128, d as u128).unwrap(), expected);
        }

        #[test]
        fn prop_bps_never_exceeds_amount(amount in 0u128..u128::MAX / 2, bps in 0u128..=10_000) {
            prop_assert!(apply_bps(amount, bps).unwrap() <= amount);
        }
    }
}
