use anchor_lang::prelude::Pubkey;
use borsh_derive::{BorshDeserialize, BorshSerialize};

use crate::error::Result;
use crate::state::layout::{self, deserialize_pubkey, serialize_pubkey};
use crate::state::Tag;

/// Program-wide singleton: token mint, authority and inflation bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct CentralState {
    pub tag: u8,
    pub signer_nonce: u8,
    pub daily_inflation: u64,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub token_mint: Pubkey,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub authority: Pubkey,
    /// Unix time of day zero; pool day indices count from here.
    pub creation_time: i64,
    pub total_staked: u64,
    pub total_staked_snapshot: u64,
    pub last_snapshot_offset: u64,
}

impl CentralState {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let state: Self = layout::decode("central state", data)?;
        Tag::expect("central state", state.tag, &[Tag::CentralState])?;
        Ok(state)
    }

    /// The central state lives at the PDA seeded by the program id itself.
    pub fn key(program_id: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[program_id.as_ref()], program_id)
    }
}

#[cfg(test)]
pub(crate) fn sample_central(creation_time: i64) -> CentralState {
    CentralState {
        tag: Tag::CentralState as u8,
        signer_nonce: 255,
        daily_inflation: 1_000_000,
        token_mint: Pubkey::new_unique(),
        authority: Pubkey::new_unique(),
        creation_time,
        total_staked: 0,
        total_staked_snapshot: 0,
        last_snapshot_offset: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_what_the_program_writes() {
        let state = sample_central(1_650_000_000);
        let bytes = borsh::to_vec(&state).unwrap();
        assert_eq!(bytes.len(), 1 + 1 + 8 + 32 + 32 + 8 * 4);
        assert_eq!(CentralState::decode(&bytes).unwrap(), state);
    }

    #[test]
    fn key_is_deterministic() {
        let program = Pubkey::new_unique();
        assert_eq!(CentralState::key(&program), CentralState::key(&program));
    }
}
