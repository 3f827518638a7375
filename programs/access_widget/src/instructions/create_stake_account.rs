//! Create stake account instruction builder.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::system_program;
use borsh_derive::BorshSerialize;

use crate::error::Result;
use crate::instructions::{pack, tag};
use crate::state::layout::serialize_pubkey;
use crate::state::StakeAccount;

#[derive(Debug, Clone, BorshSerialize)]
struct CreateStakeAccountData {
    tag: u8,
    nonce: u8,
    #[borsh(serialize_with = "serialize_pubkey")]
    owner: Pubkey,
}

/// Accounts required to create a stake account.
pub struct CreateStakeAccount {
    /// The account being created (PDA of owner and pool).
    pub stake_account: Pubkey,
    /// Pool the account belongs to.
    pub stake_pool: Pubkey,
    /// Pays the rent; the wallet or the fee-payer relay.
    pub fee_payer: Pubkey,
}

/// Build the instruction creating `owner`'s stake account in `stake_pool`.
pub fn create_stake_account(
    program_id: &Pubkey,
    owner: &Pubkey,
    stake_pool: &Pubkey,
    fee_payer: &Pubkey,
) -> Result<Instruction> {
    let (stake_account, nonce) = StakeAccount::key(program_id, owner, stake_pool);
    let accounts = CreateStakeAccount {
        stake_account,
        stake_pool: *stake_pool,
        fee_payer: *fee_payer,
    };
    accounts.instruction(program_id, *owner, nonce)
}

impl CreateStakeAccount {
    pub fn instruction(&self, program_id: &Pubkey, owner: Pubkey, nonce: u8) -> Result<Instruction> {
        let data = CreateStakeAccountData {
            tag: tag::CREATE_STAKE_ACCOUNT,
            nonce,
            owner,
        };
        Ok(Instruction {
            program_id: *program_id,
            accounts: vec![
                AccountMeta::new(self.stake_account, false),
                AccountMeta::new_readonly(system_program::ID, false),
                AccountMeta::new_readonly(self.stake_pool, false),
                AccountMeta::new(self.fee_payer, true),
            ],
            data: pack("create stake account", &data)?,
        })
    }
}
