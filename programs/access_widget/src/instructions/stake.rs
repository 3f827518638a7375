//! Stake instruction builder.
//!
//! Locks tokens from the owner's token account into the pool vault.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_spl::token;
use borsh_derive::BorshSerialize;

use crate::error::Result;
use crate::instructions::{pack, tag};

#[derive(Debug, Clone, BorshSerialize)]
struct StakeData {
    tag: u8,
    amount: u64,
}

/// Accounts required for staking.
pub struct Stake {
    /// Program central state.
    pub central_state: Pubkey,
    /// The staker's account in the pool.
    pub stake_account: Pubkey,
    /// The stake pool.
    pub stake_pool: Pubkey,
    /// Token owner, must sign.
    pub owner: Pubkey,
    /// Token account the stake is taken from.
    pub source_token: Pubkey,
    /// Pool vault receiving the tokens.
    pub vault: Pubkey,
    /// Protocol fee token account (ATA of the central state authority).
    pub fee_account: Pubkey,
    /// Owner's bond account, when one exists.
    pub bond_account: Option<Pubkey>,
}

impl Stake {
    pub fn instruction(&self, program_id: &Pubkey, amount: u64) -> Result<Instruction> {
        let mut accounts = vec![
            AccountMeta::new(self.central_state, false),
            AccountMeta::new(self.stake_account, false),
            AccountMeta::new(self.stake_pool, false),
            AccountMeta::new_readonly(self.owner, true),
            AccountMeta::new(self.source_token, false),
            AccountMeta::new_readonly(token::ID, false),
            AccountMeta::new(self.vault, false),
            AccountMeta::new(self.fee_account, false),
        ];
        if let Some(bond_account) = self.bond_account {
            accounts.push(AccountMeta::new_readonly(bond_account, false));
        }

        let data = StakeData {
            tag: tag::STAKE,
            amount,
        };
        Ok(Instruction {
            program_id: *program_id,
            accounts,
            data: pack("stake", &data)?,
        })
    }
}
