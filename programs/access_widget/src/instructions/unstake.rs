//! Unstake instruction builder.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_spl::token;
use borsh_derive::BorshSerialize;

use crate::error::Result;
use crate::instructions::{pack, tag};

#[derive(Debug, Clone, BorshSerialize)]
struct UnstakeData {
    tag: u8,
    amount: u64,
}

/// Accounts required for unstaking.
pub struct Unstake {
    pub central_state: Pubkey,
    pub stake_account: Pubkey,
    pub stake_pool: Pubkey,
    /// Stake owner, must sign.
    pub owner: Pubkey,
    /// Token account receiving the unlocked tokens.
    pub destination_token: Pubkey,
    /// Pool vault the tokens leave.
    pub vault: Pubkey,
}

impl Unstake {
    pub fn instruction(&self, program_id: &Pubkey, amount: u64) -> Result<Instruction> {
        Ok(Instruction {
            program_id: *program_id,
            accounts: vec![
                AccountMeta::new(self.central_state, false),
                AccountMeta::new(self.stake_account, false),
                AccountMeta::new(self.stake_pool, false),
                AccountMeta::new_readonly(self.owner, true),
                AccountMeta::new(self.destination_token, false),
                AccountMeta::new_readonly(token::ID, false),
                AccountMeta::new(self.vault, false),
            ],
            data: pack(
                "unstake",
                &UnstakeData {
                    tag: tag::UNSTAKE,
                    amount,
                },
            )?,
        })
    }
}
