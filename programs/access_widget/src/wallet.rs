//! The connected wallet.
//!
//! The widget never holds the user's key material in production: signing is
//! delegated to whatever wallet the host page connected. [`KeypairWallet`] is
//! the local-key implementation used by scripts and tests.

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;

use crate::error::{Result, WidgetError};

#[async_trait]
pub trait WalletSigner: Send + Sync {
    fn pubkey(&self) -> Pubkey;

    /// Add the wallet's signature to `transaction`.
    ///
    /// Must not require every signature to be present: with a fee-payer relay
    /// the payer signature is added later by the relay.
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction>;

    /// Sign a whole batch. Wallets that can approve several transactions in a
    /// single prompt override this.
    async fn sign_all_transactions(&self, transactions: Vec<Transaction>) -> Result<Vec<Transaction>> {
        let mut signed = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            signed.push(self.sign_transaction(transaction).await?);
        }
        Ok(signed)
    }
}

/// Wallet backed by an in-process keypair.
pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl WalletSigner for KeypairWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        let signers = usize::from(transaction.message.header.num_required_signatures);
        let owner = self.keypair.pubkey();
        if !transaction.message.account_keys.iter().take(signers).any(|key| key == &owner) {
            // nothing for this wallet to sign, e.g. a relay-paid crank
            return Ok(transaction);
        }
        let blockhash = transaction.message.recent_blockhash;
        transaction
            .try_partial_sign(&[&self.keypair], blockhash)
            .map_err(|e| WidgetError::Signing(e.to_string()))?;
        Ok(transaction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
    use solana_sdk::hash::Hash;

    #[tokio::test]
    async fn partial_sign_leaves_payer_slot_empty() {
        let wallet = KeypairWallet::new(Keypair::new());
        let relay = Pubkey::new_unique();
        let ix = Instruction {
            program_id: Pubkey::new_unique(),
            accounts: vec![AccountMeta::new_readonly(wallet.pubkey(), true)],
            data: vec![],
        };
        let mut tx = Transaction::new_with_payer(&[ix], Some(&relay));
        tx.message.recent_blockhash = Hash::new_unique();

        let signed = wallet.sign_transaction(tx).await.unwrap();
        assert_eq!(signed.message.account_keys[0], relay);
        assert_eq!(signed.signatures[0], Default::default());
        assert_ne!(signed.signatures[1], Default::default());
        assert!(!signed.is_signed());
    }
}
