//! # ACCESS Staking Widget Core
//!
//! The chain-facing half of the embeddable ACCESS Protocol staking widget:
//! everything a host page needs to show a user's position in one stake pool
//! and to lock, unlock or claim, minus the rendering.
//!
//! - **Account reader**: decodes stake pools, stake accounts, bonds and the
//!   central state, and summarizes staked / available / claimable balances
//! - **Reward calculator**: sums the pool's circular day buffer over the
//!   unclaimed days in fixed point
//! - **Transaction orchestrator**: crank, account creation, claim and
//!   stake/unstake as one forward-only sequence
//! - **Fee-payer relay**: wallets without SOL get their fees paid by a
//!   co-signing relay
//!
//! ## Features
//! - Batched submission with a capped worker pool and bounded confirmation polling
//! - Strictly validated off-chain subscription records
//! - Host events for connection and completed operations
//! - Safe math with overflow protection

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod instructions;
pub mod orchestrator;
pub mod reader;
pub mod relay;
pub mod retry;
pub mod rewards;
pub mod rpc;
pub mod send;
pub mod state;
pub mod subscriptions;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{EmbedOptions, Environment, WidgetConfig};
pub use error::{ErrorCategory, Result, WidgetError};
pub use events::{EventBus, EventSink, HostCommand, WidgetEvent};
pub use orchestrator::{OperationGuard, OperationOutcome, Orchestrator, Step};
pub use reader::{AccountReader, Overview};
pub use relay::{FeePaymentData, FeeRelay, HttpRelayClient, RelayEncoding};
pub use rewards::{calculate_reward, calculate_reward_for_staker, RewardFormula};
pub use rpc::RpcConnection;
pub use wallet::{KeypairWallet, WalletSigner};
