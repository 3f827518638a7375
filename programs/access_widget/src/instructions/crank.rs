//! Crank instruction builder.
//!
//! The crank closes the pool's current day and writes its rewards into the
//! circular buffer. Anyone may call it.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};

use crate::instructions::tag;

pub fn crank(program_id: &Pubkey, stake_pool: &Pubkey, central_state: &Pubkey) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*stake_pool, false),
            AccountMeta::new(*central_state, false),
        ],
        data: vec![tag::CRANK],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crank_needs_no_signer() {
        let ix = crank(&Pubkey::new_unique(), &Pubkey::new_unique(), &Pubkey::new_unique());
        assert_eq!(ix.data, vec![tag::CRANK]);
        assert!(ix.accounts.iter().all(|m| !m.is_signer && m.is_writable));
    }
}
