//! The RPC node as seen by the widget.
//!
//! Everything the reader, sender and orchestrator need from the chain goes
//! through [`RpcConnection`]. The production implementation wraps the
//! non-blocking `solana_client` RPC client; tests substitute an in-memory ledger.

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{
    RpcAccountInfoConfig, RpcProgramAccountsConfig, RpcSendTransactionConfig,
    RpcSimulateTransactionConfig,
};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::TransactionConfirmationStatus;

use crate::error::{Result, WidgetError};

/// Byte-prefix filter for program account scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcmpFilter {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

impl MemcmpFilter {
    pub fn new(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            bytes: bytes.into(),
        }
    }

    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(self.offset..self.offset + self.bytes.len()) == Some(self.bytes.as_slice())
    }
}

/// Commitment reached by a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confirmation {
    Processed,
    Confirmed,
    Finalized,
}

/// Status of a submitted signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureStatus {
    pub confirmation: Option<Confirmation>,
    /// Execution error, if the transaction landed and failed.
    pub err: Option<String>,
}

#[async_trait]
pub trait RpcConnection: Send + Sync {
    /// Raw account data, `None` when the account does not exist.
    async fn get_account_data(&self, key: &Pubkey) -> Result<Option<Vec<u8>>>;

    /// Program accounts whose data matches every filter.
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: Vec<MemcmpFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>>;

    /// Native balance in lamports.
    async fn get_balance(&self, key: &Pubkey) -> Result<u64>;

    /// Raw token amount held by a token account.
    async fn get_token_account_balance(&self, key: &Pubkey) -> Result<u64>;

    async fn get_latest_blockhash(&self) -> Result<Hash>;

    /// Compute units consumed by simulating `transaction` (signatures not verified).
    async fn simulate_units(&self, transaction: &Transaction) -> Result<u64>;

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature>;

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>>;
}

fn rpc_err(err: impl std::fmt::Display) -> WidgetError {
    WidgetError::Rpc(err.to_string())
}

#[async_trait]
impl RpcConnection for RpcClient {
    async fn get_account_data(&self, key: &Pubkey) -> Result<Option<Vec<u8>>> {
        let response = self
            .get_account_with_commitment(key, self.commitment())
            .await
            .map_err(rpc_err)?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: Vec<MemcmpFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(
                filters
                    .into_iter()
                    .map(|f| RpcFilterType::Memcmp(Memcmp::new_raw_bytes(f.offset, f.bytes)))
                    .collect(),
            ),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };
        let accounts = self
            .get_program_accounts_with_config(program_id, config)
            .await
            .map_err(rpc_err)?;
        Ok(accounts
            .into_iter()
            .map(|(key, account)| (key, account.data))
            .collect())
    }

    async fn get_balance(&self, key: &Pubkey) -> Result<u64> {
        RpcClient::get_balance(self, key).await.map_err(rpc_err)
    }

    async fn get_token_account_balance(&self, key: &Pubkey) -> Result<u64> {
        let amount = RpcClient::get_token_account_balance(self, key)
            .await
            .map_err(rpc_err)?;
        amount
            .amount
            .parse()
            .map_err(|e| WidgetError::decode("token amount", e))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        RpcClient::get_latest_blockhash(self).await.map_err(rpc_err)
    }

    async fn simulate_units(&self, transaction: &Transaction) -> Result<u64> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            commitment: Some(CommitmentConfig::confirmed()),
            ..RpcSimulateTransactionConfig::default()
        };
        let response = self
            .simulate_transaction_with_config(transaction, config)
            .await
            .map_err(rpc_err)?;
        if let Some(err) = response.value.err {
            return Err(WidgetError::Simulation(err.to_string()));
        }
        Ok(response.value.units_consumed.unwrap_or(0))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        let config = RpcSendTransactionConfig {
            skip_preflight: true,
            max_retries: Some(0),
            ..RpcSendTransactionConfig::default()
        };
        self.send_transaction_with_config(transaction, config)
            .await
            .map_err(rpc_err)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>> {
        let response = self
            .get_signature_statuses_with_history(&[*signature])
            .await
            .map_err(rpc_err)?;
        Ok(response.value.into_iter().next().flatten().map(|status| SignatureStatus {
            confirmation: status.confirmation_status.map(|level| match level {
                TransactionConfirmationStatus::Processed => Confirmation::Processed,
                TransactionConfirmationStatus::Confirmed => Confirmation::Confirmed,
                TransactionConfirmationStatus::Finalized => Confirmation::Finalized,
            }),
            err: status.err.map(|e| e.to_string()),
        }))
    }
}
