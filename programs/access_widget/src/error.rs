//! Error types for the widget core.
//!
//! Every fallible operation in the crate returns [`WidgetError`]. Accounts that
//! do not exist yet are not errors: readers return `None` or an empty list so
//! callers can present a zero state.
//!
//! ## Error groups
//! - Configuration errors
//! - Balance errors (user-facing guidance, not failures of the system)
//! - Math errors
//! - Relay / network errors
//! - On-chain errors (simulation, confirmation)
//! - Decoding errors

use anchor_lang::prelude::Pubkey;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WidgetError>;

/// Coarse classification used by the embedding UI to decide how to present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or invalid embed/environment configuration.
    Config,
    /// Balance below what the operation needs; shown as guidance.
    InsufficientFunds,
    /// Fee-payer relay or HTTP endpoint failure.
    Network,
    /// The chain rejected or never confirmed a transaction.
    OnChain,
    /// Data returned by a collaborator did not match the expected layout.
    Decode,
    /// Local invariant violation (overflow, concurrent operation).
    Internal,
}

#[derive(Debug, Error)]
pub enum WidgetError {
    // ========== Configuration Errors ==========

    /// A required embed option or environment variable is absent.
    #[error("You must provide '{0}' in 'init' method.")]
    MissingOption(&'static str),

    /// A required environment variable is absent.
    #[error("{0} must be set!")]
    MissingEnv(&'static str),

    /// A configuration value is present but unusable.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },

    // ========== Balance Errors ==========

    /// Token balance does not cover the requested lock amount.
    #[error("Insufficient balance: {available} available, {required} required. Get more tokens at {get_tokens_url}")]
    InsufficientFunds {
        required: u64,
        available: u64,
        get_tokens_url: String,
    },

    /// The resulting stake would be below the pool's minimum.
    #[error("The pool requires at least {minimum} locked, this lock would leave {resulting}. Get more tokens at {get_tokens_url}")]
    BelowPoolMinimum {
        minimum: u64,
        resulting: u64,
        get_tokens_url: String,
    },

    /// Unlock requested for more than is staked.
    #[error("Insufficient staked balance: {staked} staked, {requested} requested")]
    InsufficientStake { staked: u64, requested: u64 },

    /// Amount must be greater than zero.
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// Operation needs a stake account the owner does not have.
    #[error("No stake account found for {owner} in pool {pool}")]
    NoStakeAccount { owner: Pubkey, pool: Pubkey },

    // ========== Math Errors ==========

    /// Arithmetic overflow occurred during calculation.
    #[error("Arithmetic overflow occurred during calculation")]
    MathOverflow,

    // ========== Relay / Network Errors ==========

    /// The fee-payer relay could not be reached.
    #[error("Fee payer relay unavailable: {0}")]
    RelayUnavailable(String),

    /// The fee-payer relay answered with a non-success status.
    #[error("Fee payer relay rejected the request ({status}): {body}")]
    RelayRejected { status: u16, body: String },

    /// An off-chain HTTP endpoint failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The RPC node returned an error.
    #[error("RPC error: {0}")]
    Rpc(String),

    // ========== On-chain Errors ==========

    /// Simulation of a transaction batch failed.
    #[error("Error simulating transaction: {0}")]
    Simulation(String),

    /// A transaction was sent but never reached the requested commitment.
    #[error("We were unable to send transactions to Solana successfully. Please try again later.")]
    ConfirmationTimeout,

    /// A transaction landed with an execution error.
    #[error("Transaction {signature} failed: {reason}")]
    TransactionFailed { signature: String, reason: String },

    /// A freshly created account never became visible.
    #[error("Account {0} was not visible after creation")]
    AccountNotVisible(Pubkey),

    /// The wallet refused or failed to sign.
    #[error("Wallet signing failed: {0}")]
    Signing(String),

    // ========== Decoding Errors ==========

    /// Account bytes did not match the expected layout.
    #[error("Failed to decode {account} account: {reason}")]
    Decode { account: &'static str, reason: String },

    /// Account carries a tag other than the one expected.
    #[error("Unexpected account tag {found} for {account}")]
    UnexpectedTag { account: &'static str, found: u8 },

    /// An HTTP payload did not match its schema.
    #[error("Invalid response schema: {0}")]
    Schema(String),

    /// An instruction payload could not be serialized.
    #[error("Failed to encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    // ========== Concurrency Errors ==========

    /// Another lock/unlock/claim is already running for this owner.
    #[error("An operation is already in progress for {0}")]
    OperationInProgress(Pubkey),
}

impl WidgetError {
    /// Map the error onto the taxonomy used by the presentation layer.
    pub fn category(&self) -> ErrorCategory {
        use WidgetError::*;
        match self {
            MissingOption(_) | MissingEnv(_) | InvalidOption { .. } => ErrorCategory::Config,
            InsufficientFunds { .. }
            | BelowPoolMinimum { .. }
            | InsufficientStake { .. }
            | ZeroAmount
            | NoStakeAccount { .. } => ErrorCategory::InsufficientFunds,
            RelayUnavailable(_) | RelayRejected { .. } | Http(_) | Rpc(_) => {
                ErrorCategory::Network
            }
            Simulation(_)
            | ConfirmationTimeout
            | TransactionFailed { .. }
            | AccountNotVisible(_)
            | Signing(_) => ErrorCategory::OnChain,
            Decode { .. } | UnexpectedTag { .. } | Schema(_) | Encode { .. } => ErrorCategory::Decode,
            MathOverflow | OperationInProgress(_) => ErrorCategory::Internal,
        }
    }

    pub(crate) fn decode(account: &'static str, err: impl std::fmt::Display) -> Self {
        WidgetError::Decode {
            account,
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_option_matches_loader_message() {
        let err = WidgetError::MissingOption("poolId");
        assert_eq!(err.to_string(), "You must provide 'poolId' in 'init' method.");
        assert_eq!(err.category(), ErrorCategory::Config);
    }

    #[test]
    fn insufficient_funds_carries_call_to_action() {
        let err = WidgetError::InsufficientFunds {
            required: 10,
            available: 3,
            get_tokens_url: "https://example.org/get".into(),
        };
        assert!(err.to_string().contains("https://example.org/get"));
        assert_eq!(err.category(), ErrorCategory::InsufficientFunds);
    }

    #[test]
    fn relay_failures_are_network_errors() {
        assert_eq!(
            WidgetError::RelayUnavailable("timeout".into()).category(),
            ErrorCategory::Network
        );
        assert_eq!(
            WidgetError::RelayRejected { status: 500, body: String::new() }.category(),
            ErrorCategory::Network
        );
        assert_eq!(WidgetError::ConfirmationTimeout.category(), ErrorCategory::OnChain);
    }
}
