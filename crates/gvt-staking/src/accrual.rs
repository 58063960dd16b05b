//! # Reward Accrual
//!
//! ```text
//! base   = amount * emission_rate * elapsed / 1e18
//! tiered = base * lock_multiplier / 100      (lock bonus on)
//! reward = tiered * boost / 100              (oracle failure -> 100)
//! ```
//!
//! ## Lock tiers
//!
//! | Lock duration | Multiplier |
//! |---------------|------------|
//! | >= 730 days | 200 |
//! | >= 365 days | 150 |
//! | >= 180 days | 125 |
//! | >= 90 days | 110 |
//! | shorter | 100 |

use gvt_core::error::{GvtError, Result};
use gvt_core::math::{self, PERCENT, SCALE};
use gvt_core::time::days;
use gvt_core::types::Amount;
use serde::{Deserialize, Serialize};

pub const MIN_LOCK_PERIOD: u64 = days(30);
pub const MAX_LOCK_PERIOD: u64 = days(730);

/// 10% of the staked amount
pub const EARLY_EXIT_PENALTY_BPS: u128 = 1_000;

const LOCK_TIERS: [(u64, u128); 4] = [
    (days(730), 200),
    (days(365), 150),
    (days(180), 125),
    (days(90), 110),
];

/// Lock-duration bonus in percent
pub fn lock_multiplier(lock_duration: u64) -> u128 {
    LOCK_TIERS
        .iter()
        .find(|(threshold, _)| lock_duration >= *threshold)
        .map(|(_, multiplier)| *multiplier)
        .unwrap_or(PERCENT)
}

pub fn validate_lock_duration(lock_duration: u64) -> Result<()> {
    if !(MIN_LOCK_PERIOD..=MAX_LOCK_PERIOD).contains(&lock_duration) {
        return Err(GvtError::InvalidLockDuration {
            duration: lock_duration,
            min: MIN_LOCK_PERIOD,
            max: MAX_LOCK_PERIOD,
        });
    }
    Ok(())
}

/// Everything the reward formula looks at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualInputs {
    pub amount: Amount,
    pub emission_rate: Amount,
    pub elapsed: u64,
    pub lock_duration: u64,
    pub lock_bonus: bool,
    /// Percent, 100 = neutral
    pub boost: u128,
}

pub fn reward_for(inputs: &AccrualInputs) -> Result<Amount> {
    if inputs.elapsed == 0 || inputs.emission_rate == 0 {
        return Ok(0);
    }
    let mut reward = math::mul_mul_div(
        inputs.amount,
        inputs.emission_rate,
        inputs.elapsed as u128,
        SCALE,
    )?;
    if inputs.lock_bonus {
        reward = math::apply_percent(reward, lock_multiplier(inputs.lock_duration))?;
    }
    math::apply_percent(reward, inputs.boost)
}

pub fn early_exit_penalty(amount: Amount) -> Result<Amount> {
    math::apply_bps(amount, EARLY_EXIT_PENALTY_BPS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvt_core::time::SECONDS_PER_DAY;
    use proptest::prelude::*;

    fn inputs(amount: Amount, lock_days: u64) -> AccrualInputs {
        AccrualInputs {
            amount,
            emission_rate: 1_000_000_000_000_000,
            elapsed: SECONDS_PER_DAY,
            lock_duration: days(lock_days),
            lock_bonus: true,
            boost: PERCENT,
        }
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(lock_multiplier(days(90)), 110);
        assert_eq!(lock_multiplier(days(89)), 100);
        assert_eq!(lock_multiplier(days(180)), 125);
        assert_eq!(lock_multiplier(days(365)), 150);
        assert_eq!(lock_multiplier(days(730)), 200);
        assert_eq!(lock_multiplier(days(30)), 100);
    }

    #[test]
    fn test_lock_bounds() {
        assert!(validate_lock_duration(MIN_LOCK_PERIOD).is_ok());
        assert!(validate_lock_duration(MAX_LOCK_PERIOD).is_ok());
        assert!(matches!(
            validate_lock_duration(MIN_LOCK_PERIOD - 1),
            Err(GvtError::InvalidLockDuration { .. })
        ));
        assert!(validate_lock_duration(MAX_LOCK_PERIOD + 1).is_err());
    }

    #[test]
    fn test_one_day_at_base_tier() {
        // 1000 * 1e15 * 86400 / 1e18
        assert_eq!(reward_for(&inputs(1_000, 30)).unwrap(), 86_400);
        let whole = 1_000 * SCALE;
        assert_eq!(reward_for(&inputs(whole, 30)).unwrap(), 86_400 * SCALE);
    }

    #[test]
    fn test_year_lock_pays_one_and_a_half() {
        let whole = 1_000 * SCALE;
        let short = reward_for(&inputs(whole, 30)).unwrap();
        let long = reward_for(&inputs(whole, 365)).unwrap();
        assert_eq!(long * 2, short * 3);
    }

    #[test]
    fn test_bonus_toggle_and_boost() {
        let mut base = inputs(1_000 * SCALE, 730);
        base.lock_bonus = false;
        let plain = reward_for(&base).unwrap();

        base.boost = 150;
        assert_eq!(reward_for(&base).unwrap(), plain * 3 / 2);

        base.lock_bonus = true;
        assert_eq!(reward_for(&base).unwrap(), plain * 3);
    }

    #[test]
    fn test_nothing_without_time_or_rate() {
        let mut none = inputs(1_000, 30);
        none.elapsed = 0;
        assert_eq!(reward_for(&none).unwrap(), 0);
        none.elapsed = 10;
        none.emission_rate = 0;
        assert_eq!(reward_for(&none).unwrap(), 0);
    }

    #[test]
    fn test_penalty() {
        assert_eq!(early_exit_penalty(1_000).unwrap(), 100);
        assert_eq!(early_exit_penalty(9).unwrap(), 0);
    }

    proptest! {
        #[test]
        fn prop_longer_locks_never_earn_less(
            amount in 1u128..1_000_000_000_000_000_000_000_000,
            a in MIN_LOCK_PERIOD..=MAX_LOCK_PERIOD,
            b in MIN_LOCK_PERIOD..=MAX_LOCK_PERIOD,
        ) {
            let (short, long) = if a <= b { (a, b) } else { (b, a) };
            let mut input = inputs(amount, 30);
            input.lock_duration = short;
            let short_reward = reward_for(&input).unwrap();
            input.lock_duration = long;
            prop_assert!(reward_for(&input).unwrap() >= short_reward);
        }
    }
}
