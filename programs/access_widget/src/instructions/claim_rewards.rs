//! Claim rewards instruction builder.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_spl::token;
use borsh_derive::BorshSerialize;

use crate::error::Result;
use crate::instructions::{pack, tag};

#[derive(Debug, Clone, BorshSerialize)]
struct ClaimRewardsData {
    tag: u8,
    allow_zero_rewards: u8,
}

/// Accounts required for claiming staker rewards.
pub struct ClaimRewards {
    pub stake_pool: Pubkey,
    pub stake_account: Pubkey,
    pub owner: Pubkey,
    /// Token account receiving the minted rewards.
    pub rewards_destination: Pubkey,
    pub central_state: Pubkey,
    /// Token mint (rewards are minted).
    pub mint: Pubkey,
    /// Whether the owner signs; cleared when a relay claims on the owner's behalf.
    pub owner_must_sign: bool,
}

impl ClaimRewards {
    pub fn instruction(&self, program_id: &Pubkey, allow_zero_rewards: bool) -> Result<Instruction> {
        Ok(Instruction {
            program_id: *program_id,
            accounts: vec![
                AccountMeta::new(self.stake_pool, false),
                AccountMeta::new(self.stake_account, false),
                AccountMeta::new_readonly(self.owner, self.owner_must_sign),
                AccountMeta::new(self.rewards_destination, false),
                AccountMeta::new_readonly(self.central_state, false),
                AccountMeta::new(self.mint, false),
                AccountMeta::new_readonly(token::ID, false),
            ],
            data: pack(
                "claim rewards",
                &ClaimRewardsData {
                    tag: tag::CLAIM_REWARDS,
                    allow_zero_rewards: u8::from(allow_zero_rewards),
                },
            )?,
        })
    }
}
