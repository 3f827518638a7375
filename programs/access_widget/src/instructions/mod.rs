//! Instruction builders for the ACCESS staking program.
//!
//! Each builder mirrors one program instruction: a borsh-encoded payload that
//! starts with the instruction tag, and the ordered account list the program
//! expects.

pub mod associated_token;
pub mod claim_rewards;
pub mod crank;
pub mod create_stake_account;
pub mod stake;
pub mod unstake;

pub use associated_token::*;
pub use claim_rewards::*;
pub use crank::*;
pub use create_stake_account::*;
pub use stake::*;
pub use unstake::*;

use borsh::BorshSerialize;

use crate::error::{Result, WidgetError};

/// Borsh-encode an instruction payload.
pub(crate) fn pack<T: BorshSerialize>(instruction: &'static str, data: &T) -> Result<Vec<u8>> {
    borsh::to_vec(data).map_err(|e| WidgetError::Encode {
        what: instruction,
        reason: e.to_string(),
    })
}

/// Instruction tags understood by the program.
pub mod tag {
    pub const CREATE_STAKE_ACCOUNT: u8 = 3;
    pub const STAKE: u8 = 4;
    pub const UNSTAKE: u8 = 5;
    pub const CLAIM_REWARDS: u8 = 8;
    pub const CRANK: u8 = 9;
}
