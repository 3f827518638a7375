//! Preparing, sending and confirming transactions.
//!
//! Instructions are packed [`IX_BATCH_SIZE`] to a transaction. Each batch can
//! be simulated to size its compute budget and spread a priority fee; batches
//! are prepared and confirmed by a worker pool capped at
//! [`MAX_CONCURRENT_TASKS`]. Confirmation results are keyed by signature.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use futures::stream::{self, StreamExt, TryStreamExt};
use indexmap::IndexMap;
use log::{debug, info, warn};
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use crate::constants::*;
use crate::error::{Result, WidgetError};
use crate::retry::{Attempt, RetryPolicy};
use crate::rpc::{Confirmation, RpcConnection};
use crate::wallet::WalletSigner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    /// Total priority fee (lamports) spread over all batches; `0` disables
    /// simulation and compute-budget instructions.
    pub max_priority_fee_lamports: u64,
    /// Commitment a transaction must reach to count as confirmed.
    pub commitment: Confirmation,
    pub confirmation: RetryPolicy,
    /// Re-broadcast transactions that are not yet visible while polling.
    pub resend_while_pending: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            max_priority_fee_lamports: 0,
            commitment: Confirmation::Confirmed,
            confirmation: RetryPolicy::confirmation(),
            resend_while_pending: true,
        }
    }
}

/// A sent transaction awaiting confirmation.
#[derive(Debug, Clone)]
pub struct Pending {
    pub signature: Signature,
    /// Kept for re-broadcast; `None` when someone else sent it.
    pub transaction: Option<Transaction>,
}

/// Split instructions into transaction-sized batches, preserving order.
pub fn batch_instructions(instructions: Vec<Instruction>) -> Vec<Vec<Instruction>> {
    instructions
        .chunks(IX_BATCH_SIZE)
        .map(<[Instruction]>::to_vec)
        .collect()
}

/// Compute unit price (micro-lamports per unit) that spends `fee_lamports`
/// over `units` compute units.
pub fn compute_unit_price(fee_lamports: u64, units: u32) -> u64 {
    if units == 0 {
        return 0;
    }
    let price = u128::from(fee_lamports) * 1_000_000 / u128::from(units);
    u64::try_from(price).unwrap_or(u64::MAX)
}

pub struct TransactionSender<'a, C: RpcConnection + ?Sized> {
    rpc: &'a C,
    options: SendOptions,
}

impl<'a, C: RpcConnection + ?Sized> TransactionSender<'a, C> {
    pub fn new(rpc: &'a C, options: SendOptions) -> Self {
        Self { rpc, options }
    }

    pub fn options(&self) -> &SendOptions {
        &self.options
    }

    /// Build unsigned transactions (without blockhash) for every batch.
    ///
    /// Batches are simulated concurrently when a priority fee is configured.
    /// The returned transactions keep the order of `batches`.
    pub async fn prepare(&self, batches: Vec<Vec<Instruction>>, payer: &Pubkey) -> Result<Vec<Transaction>> {
        let batch_count = batches.len().max(1) as u64;
        let fee_per_batch = self.options.max_priority_fee_lamports / batch_count;

        stream::iter(batches)
            .map(|batch| self.prepare_batch(batch, payer, fee_per_batch))
            .buffered(MAX_CONCURRENT_TASKS)
            .try_collect()
            .await
    }

    async fn prepare_batch(&self, batch: Vec<Instruction>, payer: &Pubkey, fee_lamports: u64) -> Result<Transaction> {
        if self.options.max_priority_fee_lamports == 0 {
            return Ok(Transaction::new_unsigned(Message::new(&batch, Some(payer))));
        }

        let mut sizing = vec![ComputeBudgetInstruction::set_compute_unit_limit(
            SIMULATION_COMPUTE_UNITS,
        )];
        sizing.extend(batch.iter().cloned());
        let simulated = self
            .rpc
            .simulate_units(&Transaction::new_unsigned(Message::new(&sizing, Some(payer))))
            .await?;

        // 10% headroom over what the simulation consumed; no report keeps the ceiling
        let units = match simulated {
            0 => SIMULATION_COMPUTE_UNITS,
            consumed => u32::try_from(consumed.saturating_mul(11) / 10)
                .unwrap_or(SIMULATION_COMPUTE_UNITS)
                .min(SIMULATION_COMPUTE_UNITS),
        };
        debug!("batch of {} instructions needs {} compute units", batch.len(), units);

        let mut instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(units),
            ComputeBudgetInstruction::set_compute_unit_price(compute_unit_price(fee_lamports, units)),
        ];
        instructions.extend(batch);
        Ok(Transaction::new_unsigned(Message::new(&instructions, Some(payer))))
    }

    /// Stamp every transaction with a fresh blockhash.
    pub async fn stamp(&self, transactions: &mut [Transaction]) -> Result<Hash> {
        let blockhash = self.rpc.get_latest_blockhash().await?;
        for transaction in transactions.iter_mut() {
            transaction.message.recent_blockhash = blockhash;
        }
        Ok(blockhash)
    }

    /// Broadcast signed transactions in order.
    pub async fn send_all(&self, transactions: Vec<Transaction>) -> Result<Vec<Pending>> {
        let mut pending = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let signature = self.rpc.send_transaction(&transaction).await?;
            info!("transaction sent: {}", signature);
            pending.push(Pending {
                signature,
                transaction: Some(transaction),
            });
        }
        Ok(pending)
    }

    /// Poll every pending signature until it reaches the configured commitment.
    ///
    /// Fails with [`WidgetError::ConfirmationTimeout`] if any signature runs out
    /// of attempts, or [`WidgetError::TransactionFailed`] if one landed with an
    /// error.
    pub async fn confirm(&self, pending: Vec<Pending>) -> Result<IndexMap<Signature, Confirmation>> {
        let results: Vec<(Signature, Option<Confirmation>)> = stream::iter(pending)
            .map(|entry| async move {
                let reached = self.confirm_one(&entry).await?;
                Ok::<_, WidgetError>((entry.signature, reached))
            })
            .buffer_unordered(MAX_CONCURRENT_TASKS)
            .try_collect()
            .await?;

        let mut confirmed = IndexMap::with_capacity(results.len());
        for (signature, reached) in results {
            match reached {
                Some(level) => {
                    confirmed.insert(signature, level);
                }
                None => {
                    warn!("transaction {} not confirmed in time", signature);
                    return Err(WidgetError::ConfirmationTimeout);
                }
            }
        }
        Ok(confirmed)
    }

    async fn confirm_one(&self, entry: &Pending) -> Result<Option<Confirmation>> {
        let target = self.options.commitment;
        self.options
            .confirmation
            .run(|_| async move {
                let status = self.rpc.get_signature_status(&entry.signature).await?;
                match status {
                    Some(status) if status.err.is_some() => Err(WidgetError::TransactionFailed {
                        signature: entry.signature.to_string(),
                        reason: status.err.unwrap_or_default(),
                    }),
                    Some(status) => match status.confirmation {
                        Some(level) if level >= target => Ok(Attempt::Ready(level)),
                        _ => Ok(Attempt::Retry),
                    },
                    None => {
                        if let (true, Some(tx)) = (self.options.resend_while_pending, &entry.transaction) {
                            debug!("resending transaction {}", entry.signature);
                            // a failed resend is not fatal, the next poll decides
                            if let Err(err) = self.rpc.send_transaction(tx).await {
                                debug!("resend failed: {}", err);
                            }
                        }
                        Ok(Attempt::Retry)
                    }
                }
            })
            .await
    }

    /// Batch, prepare, sign with the wallet (which also pays fees), send and confirm.
    pub async fn send_with_wallet<W: WalletSigner + ?Sized>(
        &self,
        wallet: &W,
        instructions: Vec<Instruction>,
    ) -> Result<Vec<Signature>> {
        if instructions.is_empty() {
            warn!("no transactions to sign");
            return Ok(Vec::new());
        }
        let payer = wallet.pubkey();
        let mut transactions = self.prepare(batch_instructions(instructions), &payer).await?;
        self.stamp(&mut transactions).await?;
        let signed = wallet.sign_all_transactions(transactions).await?;
        let pending = self.send_all(signed).await?;
        let signatures: Vec<Signature> = pending.iter().map(|p| p.signature).collect();
        self.confirm(pending).await?;
        Ok(signatures)
    }
}
