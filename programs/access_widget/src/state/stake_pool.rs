use anchor_lang::prelude::Pubkey;
use borsh_derive::{BorshDeserialize, BorshSerialize};

use crate::constants::*;
use crate::error::Result;
use crate::state::layout::{self, deserialize_pubkey, serialize_pubkey};
use crate::state::{CentralState, Tag};

/// Rewards recorded for one day of the circular buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct RewardsTuple {
    pub pool_reward: u128,
    pub stakers_reward: u128,
}

/// Stake pool state.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StakePool {
    pub tag: u8,
    pub nonce: u8,
    /// Index of the most recently closed day in `balances`.
    pub current_day_idx: u16,
    pub _padding: [u8; 4],
    pub minimum_stake_amount: u64,
    pub total_staked: u64,
    pub last_crank_time: i64,
    pub last_claimed_offset: u64,
    pub stakers_part: u64,
    pub unstake_period: i64,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub owner: Pubkey,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub vault: Pubkey,
    pub balances: [RewardsTuple; STAKE_BUFFER_LEN],
}

impl StakePool {
    pub const ACCEPTED_TAGS: [Tag; 3] = [Tag::StakePool, Tag::InactiveStakePool, Tag::FrozenStakePool];

    pub fn decode(data: &[u8]) -> Result<Self> {
        let pool: Self = layout::decode("stake pool", data)?;
        Tag::expect("stake pool", pool.tag, &Self::ACCEPTED_TAGS)?;
        Ok(pool)
    }

    /// Derive the stake pool address for `owner`.
    pub fn key(program_id: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[STAKE_POOL_SEED, owner.as_ref()], program_id)
    }

    /// Whether the pool's daily snapshot is older than wall-clock time allows.
    ///
    /// The day at `current_day_idx` closes at
    /// `creation_time + 86400 * (current_day_idx + 1)`; once that moment is in
    /// the past the pool needs a crank before its buffer can be trusted.
    pub fn is_crank_due(&self, central_state: &CentralState, now: i64) -> bool {
        let next_day = i64::from(self.current_day_idx) + 1;
        match SECONDS_PER_DAY
            .checked_mul(next_day)
            .and_then(|elapsed| central_state.creation_time.checked_add(elapsed))
        {
            Some(day_end) => day_end < now,
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn empty_pool(current_day_idx: u16) -> StakePool {
    StakePool {
        tag: Tag::StakePool as u8,
        nonce: 0,
        current_day_idx,
        _padding: [0; 4],
        minimum_stake_amount: 0,
        total_staked: 0,
        last_crank_time: 0,
        last_claimed_offset: 0,
        stakers_part: 50,
        unstake_period: 0,
        owner: Pubkey::new_unique(),
        vault: Pubkey::new_unique(),
        balances: [RewardsTuple::default(); STAKE_BUFFER_LEN],
    }
}
