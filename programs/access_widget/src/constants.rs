//! Constants shared by the widget core.
//!
//! This module defines the on-chain layout sizes, PDA seeds, time periods and
//! the retry/concurrency limits used when talking to the RPC node and relay.

use std::time::Duration;

/// Seed for deriving the stake pool PDA
pub const STAKE_POOL_SEED: &[u8] = b"stake_pool";

/// Seed for deriving stake account PDAs
pub const STAKE_ACCOUNT_SEED: &[u8] = b"stake_account";

/// Seed for deriving bond account PDAs
pub const BOND_ACCOUNT_SEED: &[u8] = b"bond_account";

/// Length of the stake pool circular buffer (9 months of days)
pub const STAKE_BUFFER_LEN: usize = 274;

/// Maximum number of pending unstake requests on a stake account
pub const MAX_UNSTAKE_REQUESTS: usize = 10;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Fractional bits of the on-chain reward fixed-point format
pub const REWARD_FIXED_POINT_SHIFT: u32 = 32;

/// Byte offset of the owner key in stake and bond accounts (right after the tag)
pub const OWNER_OFFSET: usize = 1;

/// Byte offset of the stake pool key in a stake account
pub const STAKE_ACCOUNT_POOL_OFFSET: usize = 1 + 32 + 8;

/// Maximum instructions packed into a single transaction
pub const IX_BATCH_SIZE: usize = 4;

/// Cap on concurrent RPC tasks when preparing or confirming batches
pub const MAX_CONCURRENT_TASKS: usize = 10;

/// Compute unit limit used when simulating a batch
pub const SIMULATION_COMPUTE_UNITS: u32 = 1_400_000;

/// Minimum native balance (lamports) for the wallet to pay its own fees
pub const DEFAULT_MIN_FEE_BALANCE: u64 = 1_000_000;

/// Polling schedule for a freshly created stake account
pub mod account_poll {
    use super::Duration;

    /// Maximum retrieval attempts after submitting the creation instruction
    pub const MAX_ATTEMPTS: u32 = 20;
    /// Delay between attempts
    pub const DELAY: Duration = Duration::from_secs(1);
}

/// Polling schedule for transaction confirmation
pub mod confirmation_poll {
    use super::Duration;

    /// Maximum status polls before the submission is declared failed
    pub const MAX_ATTEMPTS: u32 = 150;
    /// Polls issued back to back before the delay kicks in
    pub const EAGER_ATTEMPTS: u32 = 30;
    /// Delay between polls once the eager phase is over
    pub const DELAY: Duration = Duration::from_secs(1);
}
