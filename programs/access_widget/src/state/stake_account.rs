use anchor_lang::prelude::Pubkey;
use borsh_derive::{BorshDeserialize, BorshSerialize};

use crate::constants::*;
use crate::error::Result;
use crate::state::layout::{self, deserialize_pubkey, serialize_pubkey};
use crate::state::Tag;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct UnstakeRequest {
    pub amount: u64,
    pub time: i64,
}

/// A user's position in one stake pool.
///
/// Created on first lock and mutated by stake, unstake and claim instructions.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct StakeAccount {
    pub tag: u8,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub owner: Pubkey,
    pub stake_amount: u64,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub stake_pool: Pubkey,
    /// Pool day index up to which rewards were claimed.
    pub last_claimed_offset: u64,
    pub pool_minimum_at_creation: u64,
    pub pending_unstake_requests: u8,
    pub unstake_requests: [UnstakeRequest; MAX_UNSTAKE_REQUESTS],
}

impl StakeAccount {
    pub const ACCEPTED_TAGS: [Tag; 2] = [Tag::StakeAccount, Tag::FrozenStakeAccount];

    pub fn decode(data: &[u8]) -> Result<Self> {
        let account: Self = layout::decode("stake", data)?;
        Tag::expect("stake", account.tag, &Self::ACCEPTED_TAGS)?;
        Ok(account)
    }

    /// Derive the stake account address of `owner` in `stake_pool`.
    pub fn key(program_id: &Pubkey, owner: &Pubkey, stake_pool: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[STAKE_ACCOUNT_SEED, owner.as_ref(), stake_pool.as_ref()],
            program_id,
        )
    }

    /// Unstake requests that are still pending.
    pub fn pending_requests(&self) -> &[UnstakeRequest] {
        let len = usize::from(self.pending_unstake_requests).min(MAX_UNSTAKE_REQUESTS);
        &self.unstake_requests[..len]
    }

    /// Whether another unstake request fits in the bounded request list.
    pub fn can_request_unstake(&self) -> bool {
        usize::from(self.pending_unstake_requests) < MAX_UNSTAKE_REQUESTS
    }
}

#[cfg(test)]
pub(crate) fn sample_stake(owner: Pubkey, stake_pool: Pubkey, stake_amount: u64) -> StakeAccount {
    StakeAccount {
        tag: Tag::StakeAccount as u8,
        owner,
        stake_amount,
        stake_pool,
        last_claimed_offset: 0,
        pool_minimum_at_creation: 0,
        pending_unstake_requests: 0,
        unstake_requests: [UnstakeRequest::default(); MAX_UNSTAKE_REQUESTS],
    }
}
