//! Reward accrual over the stake pool's circular day buffer.
//!
//! Every day the crank writes the pool's and stakers' reward for that day into
//! `balances[day % STAKE_BUFFER_LEN]`. Claimable rewards are the sum over the
//! unclaimed days, scaled by the staked amount in the program's fixed-point
//! format. Days older than the buffer are lost.

use crate::constants::*;
use crate::error::{Result, WidgetError};
use crate::state::StakePool;

/// Which half of a [`crate::state::RewardsTuple`] to accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewardShare {
    Stakers,
    Pool,
}

/// Fixed-point convention used to scale a summed reward by a stake amount.
///
/// The program has shipped more than one convention, so the shift and the
/// rounding mode are explicit instead of hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardFormula {
    /// Number of fractional bits in the per-token reward.
    pub shift: u32,
    /// Add half an ulp before shifting (round half up) instead of truncating.
    pub rounding: bool,
}

impl RewardFormula {
    /// `(reward * amount) >> 32`, truncating.
    pub const TRUNCATED_32: Self = Self {
        shift: REWARD_FIXED_POINT_SHIFT,
        rounding: false,
    };

    /// `(reward * amount + (1 << 30)) >> 31`.
    pub const ROUNDED_31: Self = Self {
        shift: 31,
        rounding: true,
    };

    /// Scale `reward` by `amount`.
    pub fn apply(&self, reward: u128, amount: u64) -> Result<u64> {
        let mut product = reward
            .checked_mul(u128::from(amount))
            .ok_or(WidgetError::MathOverflow)?;

        if self.rounding && self.shift > 0 {
            product = product
                .checked_add(1u128 << (self.shift - 1))
                .ok_or(WidgetError::MathOverflow)?;
        }

        let scaled = product
            .checked_shr(self.shift)
            .ok_or(WidgetError::MathOverflow)?;
        u64::try_from(scaled).map_err(|_| WidgetError::MathOverflow)
    }
}

impl Default for RewardFormula {
    fn default() -> Self {
        Self::TRUNCATED_32
    }
}

/// Number of days the account has not claimed, as seen by the pool.
pub fn unclaimed_days(stake_pool: &StakePool, last_claimed_offset: u64) -> i64 {
    let current = i64::from(stake_pool.current_day_idx);
    let last = i64::try_from(last_claimed_offset).unwrap_or(i64::MAX);
    current.saturating_sub(last).max(0)
}

/// Sum the selected reward over the last `unclaimed_days` days, inclusive of
/// the current day.
///
/// `unclaimed_days` is clamped to `[0, STAKE_BUFFER_LEN - 1]`. Indices wrap with
/// euclidean modulo, so a walk that starts before slot 0 continues from the
/// end of the buffer.
pub fn calculate_reward(unclaimed_days: i64, stake_pool: &StakePool, share: RewardShare) -> Result<u128> {
    if unclaimed_days <= 0 {
        return Ok(0);
    }

    let len = STAKE_BUFFER_LEN as i64;
    let days_behind = unclaimed_days.min(len - 1);
    let idx = i64::from(stake_pool.current_day_idx);

    (idx - days_behind..=idx)
        .map(|day| day.rem_euclid(len) as usize)
        .map(|slot| {
            stake_pool
                .balances
                .get(slot)
                .map(|tuple| match share {
                    RewardShare::Stakers => tuple.stakers_reward,
                    RewardShare::Pool => tuple.pool_reward,
                })
                .unwrap_or(0)
        })
        .try_fold(0u128, |total, reward| {
            total.checked_add(reward).ok_or(WidgetError::MathOverflow)
        })
}

/// Claimable rewards of a staker holding `stake_amount`.
pub fn calculate_reward_for_staker(
    unclaimed_days: i64,
    stake_pool: &StakePool,
    stake_amount: u64,
    formula: RewardFormula,
) -> Result<u64> {
    let reward = calculate_reward(unclaimed_days, stake_pool, RewardShare::Stakers)?;
    formula.apply(reward, stake_amount)
}

/// Claimable rewards of the pool owner, scaled by the pool's total stake.
pub fn calculate_reward_for_pool(
    unclaimed_days: i64,
    stake_pool: &StakePool,
    formula: RewardFormula,
) -> Result<u64> {
    let reward = calculate_reward(unclaimed_days, stake_pool, RewardShare::Pool)?;
    formula.apply(reward, stake_pool.total_staked)
}
