//! Read-only access to program accounts and balances.
//!
//! A missing account is a normal answer (`None` or an empty list); only
//! malformed account data is an error.

use anchor_lang::prelude::Pubkey;
use log::debug;

use crate::constants::*;
use crate::error::Result;
use crate::instructions::associated_token_address;
use crate::rewards::{calculate_reward_for_staker, unclaimed_days, RewardFormula};
use crate::rpc::{MemcmpFilter, RpcConnection};
use crate::state::{BondAccount, BondV2Account, CentralState, StakeAccount, StakePool, Tag};

/// Balances shown on the widget's landing screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overview {
    pub staked: u64,
    /// Tokens in the owner's associated token account.
    pub available: u64,
    pub claimable: u64,
    pub pool_minimum: u64,
    pub has_stake_account: bool,
}

pub struct AccountReader<'a, C: RpcConnection + ?Sized> {
    rpc: &'a C,
    program_id: Pubkey,
    formula: RewardFormula,
}

impl<'a, C: RpcConnection + ?Sized> AccountReader<'a, C> {
    pub fn new(rpc: &'a C, program_id: Pubkey, formula: RewardFormula) -> Self {
        Self {
            rpc,
            program_id,
            formula,
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    async fn scan<T>(
        &self,
        tag: Tag,
        owner: &Pubkey,
        extra: Option<MemcmpFilter>,
        decode: fn(&[u8]) -> Result<T>,
    ) -> Result<Vec<(Pubkey, T)>> {
        let mut filters = vec![
            MemcmpFilter::new(0, vec![tag as u8]),
            MemcmpFilter::new(OWNER_OFFSET, owner.to_bytes().to_vec()),
        ];
        filters.extend(extra);

        let accounts = self.rpc.get_program_accounts(&self.program_id, filters).await?;
        debug!("{} {:?} accounts found for {}", accounts.len(), tag, owner);
        accounts
            .into_iter()
            .map(|(key, data)| Ok((key, decode(&data)?)))
            .collect()
    }

    pub async fn get_stake_accounts(&self, owner: &Pubkey) -> Result<Vec<(Pubkey, StakeAccount)>> {
        self.scan(Tag::StakeAccount, owner, None, StakeAccount::decode).await
    }

    pub async fn get_bond_accounts(&self, owner: &Pubkey) -> Result<Vec<(Pubkey, BondAccount)>> {
        self.scan(Tag::BondAccount, owner, None, BondAccount::decode).await
    }

    pub async fn get_bond_v2_accounts(&self, owner: &Pubkey) -> Result<Vec<(Pubkey, BondV2Account)>> {
        self.scan(Tag::BondV2Account, owner, None, BondV2Account::decode).await
    }

    /// The owner's stake account in `stake_pool`, if one exists.
    pub async fn find_stake_account(
        &self,
        owner: &Pubkey,
        stake_pool: &Pubkey,
    ) -> Result<Option<(Pubkey, StakeAccount)>> {
        let pool_filter = MemcmpFilter::new(STAKE_ACCOUNT_POOL_OFFSET, stake_pool.to_bytes().to_vec());
        let accounts = self
            .scan(Tag::StakeAccount, owner, Some(pool_filter), StakeAccount::decode)
            .await?;
        Ok(accounts.into_iter().find(|(_, account)| &account.stake_pool == stake_pool))
    }

    async fn retrieve<T>(&self, key: &Pubkey, decode: fn(&[u8]) -> Result<T>) -> Result<Option<T>> {
        match self.rpc.get_account_data(key).await? {
            Some(data) => decode(&data).map(Some),
            None => Ok(None),
        }
    }

    pub async fn retrieve_stake_pool(&self, key: &Pubkey) -> Result<Option<StakePool>> {
        self.retrieve(key, StakePool::decode).await
    }

    pub async fn retrieve_stake_account(&self, key: &Pubkey) -> Result<Option<StakeAccount>> {
        self.retrieve(key, StakeAccount::decode).await
    }

    pub async fn retrieve_bond_account(&self, key: &Pubkey) -> Result<Option<BondAccount>> {
        self.retrieve(key, BondAccount::decode).await
    }

    pub async fn retrieve_central_state(&self) -> Result<Option<CentralState>> {
        let (key, _) = CentralState::key(&self.program_id);
        self.retrieve(&key, CentralState::decode).await
    }

    /// Token balance of the owner's associated token account for `mint`;
    /// zero when that account does not exist yet.
    pub async fn get_token_balance(&self, owner: &Pubkey, mint: &Pubkey) -> Result<u64> {
        let ata = associated_token_address(owner, mint);
        if self.rpc.get_account_data(&ata).await?.is_none() {
            return Ok(0);
        }
        self.rpc.get_token_account_balance(&ata).await
    }

    pub async fn get_native_balance(&self, owner: &Pubkey) -> Result<u64> {
        self.rpc.get_balance(owner).await
    }

    /// Staked, available and claimable amounts of `owner` in `stake_pool`.
    pub async fn load_overview(&self, owner: &Pubkey, stake_pool: &Pubkey) -> Result<Overview> {
        let mut overview = Overview::default();

        if let Some(central) = self.retrieve_central_state().await? {
            overview.available = self.get_token_balance(owner, &central.token_mint).await?;
        }

        let pool = match self.retrieve_stake_pool(stake_pool).await? {
            Some(pool) => pool,
            None => return Ok(overview),
        };
        overview.pool_minimum = pool.minimum_stake_amount;

        let (stake_key, _) = StakeAccount::key(&self.program_id, owner, stake_pool);
        if let Some(stake) = self.retrieve_stake_account(&stake_key).await? {
            overview.has_stake_account = true;
            overview.staked = stake.stake_amount;
            let days = unclaimed_days(&pool, stake.last_claimed_offset);
            overview.claimable = calculate_reward_for_staker(days, &pool, stake.stake_amount, self.formula)?;
        }

        Ok(overview)
    }
}
