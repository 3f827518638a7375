use anchor_lang::prelude::Pubkey;
use borsh_derive::{BorshDeserialize, BorshSerialize};

use crate::constants::BOND_ACCOUNT_SEED;
use crate::error::Result;
use crate::state::layout::{
    self, deserialize_pubkey, deserialize_pubkeys, serialize_pubkey, serialize_pubkeys,
};
use crate::state::Tag;

/// Bond account: a reward-bearing position bought in a token sale or airdrop,
/// tracked apart from the stake account.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BondAccount {
    pub tag: u8,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub owner: Pubkey,
    pub total_amount_sold: u64,
    pub total_staked: u64,
    pub total_quote_amount: u64,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub quote_mint: Pubkey,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub seller_token_account: Pubkey,
    pub unlock_start_date: i64,
    pub unlock_period: i64,
    pub unlock_amount: u64,
    pub last_unlock_time: i64,
    pub total_unlocked_amount: u64,
    pub pool_minimum_at_creation: u64,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub stake_pool: Pubkey,
    pub last_claimed_offset: u64,
    #[borsh(serialize_with = "serialize_pubkeys", deserialize_with = "deserialize_pubkeys")]
    pub sellers: Vec<Pubkey>,
}

impl BondAccount {
    pub const ACCEPTED_TAGS: [Tag; 3] = [
        Tag::BondAccount,
        Tag::InactiveBondAccount,
        Tag::FrozenBondAccount,
    ];

    pub fn decode(data: &[u8]) -> Result<Self> {
        let bond: Self = layout::decode("bond", data)?;
        Tag::expect("bond", bond.tag, &Self::ACCEPTED_TAGS)?;
        Ok(bond)
    }

    /// Derive the bond address from its owner and the amount sold.
    pub fn key(program_id: &Pubkey, owner: &Pubkey, total_amount_sold: u64) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[
                BOND_ACCOUNT_SEED,
                owner.as_ref(),
                &total_amount_sold.to_le_bytes(),
            ],
            program_id,
        )
    }

    /// Tokens still locked in the bond.
    pub fn locked_amount(&self) -> u64 {
        self.total_staked
    }
}

/// Second-generation bond: a plain locked amount with an optional unlock date.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct BondV2Account {
    pub tag: u8,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub owner: Pubkey,
    pub amount: u64,
    #[borsh(serialize_with = "serialize_pubkey", deserialize_with = "deserialize_pubkey")]
    pub pool: Pubkey,
    pub last_claimed_offset: u64,
    pub pool_minimum_at_creation: u64,
    /// `None` means locked forever.
    pub unlock_timestamp: Option<i64>,
}

impl BondV2Account {
    pub const ACCEPTED_TAGS: [Tag; 2] = [Tag::BondV2Account, Tag::FrozenBondV2Account];

    pub fn decode(data: &[u8]) -> Result<Self> {
        let bond: Self = layout::decode("bond v2", data)?;
        Tag::expect("bond v2", bond.tag, &Self::ACCEPTED_TAGS)?;
        Ok(bond)
    }

    pub fn is_forever(&self) -> bool {
        self.unlock_timestamp.is_none()
    }
}
