//! Who pays transaction fees and rent.
//!
//! Decided once per operation from the wallet's native balance. The chosen
//! key is the payer of every transaction and the funder of every account the
//! operation creates.

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use log::{info, warn};
use solana_sdk::signature::Signature;

use crate::error::{Result, WidgetError};
use crate::relay::{FeeRelay, RelaySubmission};
use crate::rpc::RpcConnection;
use crate::send::{batch_instructions, Pending, TransactionSender};
use crate::wallet::WalletSigner;

pub enum FeePayer<'a> {
    Wallet(Pubkey),
    Relay {
        fee_payer: Pubkey,
        relay: &'a dyn FeeRelay,
    },
}

impl<'a> FeePayer<'a> {
    /// Pick the wallet when it can afford fees, the relay otherwise.
    pub fn choose(
        wallet: Pubkey,
        native_balance: u64,
        min_fee_balance: u64,
        relay: Option<(Pubkey, &'a dyn FeeRelay)>,
    ) -> Self {
        if native_balance >= min_fee_balance {
            return FeePayer::Wallet(wallet);
        }
        match relay {
            Some((fee_payer, relay)) => {
                info!(
                    "wallet balance {} below {}, fees paid by relay {}",
                    native_balance, min_fee_balance, fee_payer
                );
                FeePayer::Relay { fee_payer, relay }
            }
            None => {
                warn!("wallet balance {} is low and no fee payer relay is configured", native_balance);
                FeePayer::Wallet(wallet)
            }
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        match self {
            FeePayer::Wallet(key) => *key,
            FeePayer::Relay { fee_payer, .. } => *fee_payer,
        }
    }

    pub fn is_relay(&self) -> bool {
        matches!(self, FeePayer::Relay { .. })
    }

    /// Sign, submit and confirm `instructions` with this fee payer.
    pub async fn submit<C, W>(
        &self,
        sender: &TransactionSender<'_, C>,
        wallet: &W,
        instructions: Vec<Instruction>,
    ) -> Result<Vec<Signature>>
    where
        C: RpcConnection + ?Sized,
        W: WalletSigner + ?Sized,
    {
        let (fee_payer, relay) = match self {
            FeePayer::Wallet(_) => return sender.send_with_wallet(wallet, instructions).await,
            FeePayer::Relay { fee_payer, relay } => (fee_payer, *relay),
        };
        if instructions.is_empty() {
            return Ok(Vec::new());
        }

        let mut transactions = sender.prepare(batch_instructions(instructions), fee_payer).await?;
        sender.stamp(&mut transactions).await?;
        let signed = wallet.sign_all_transactions(transactions).await?;

        let submissions = relay.submit(&signed).await?;
        if submissions.len() != signed.len() {
            return Err(WidgetError::Schema(format!(
                "relay answered {} results for {} transactions",
                submissions.len(),
                signed.len()
            )));
        }

        let mut pending = Vec::with_capacity(submissions.len());
        for submission in submissions {
            match submission {
                RelaySubmission::Sent(signature) => pending.push(Pending {
                    signature,
                    transaction: None,
                }),
                RelaySubmission::CoSigned(transaction) => {
                    pending.extend(sender.send_all(vec![transaction]).await?);
                }
            }
        }

        let signatures = pending.iter().map(|p| p.signature).collect();
        sender.confirm(pending).await?;
        Ok(signatures)
    }
}
