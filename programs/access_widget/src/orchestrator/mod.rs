//! Lock, unlock and claim.
//!
//! Every operation walks the same forward-only sequence:
//!
//! `Idle → [Crank] → [CreateAccount] → [ClaimRewards] → Stake | Unstake → Done`
//!
//! - **Crank** when the pool's current day has already closed, so rewards are
//!   computed against an up-to-date buffer.
//! - **CreateAccount** on the first lock into a pool, then waits until the new
//!   account is readable.
//! - **ClaimRewards** when something is claimable and unclaimed days exist,
//!   judged against the pool as it stands after any crank; staking or
//!   unstaking first would forfeit them.
//! - **Stake / Unstake** last, with the owner's token account created in the
//!   same transaction when missing.
//!
//! The fee payer is chosen once, before the first submission. Operations never
//! return early without reaching `Done`; failures are carried in the outcome.

pub mod fee_payer;
pub mod guard;
pub mod progress;

pub use fee_payer::*;
pub use guard::*;
pub use progress::*;

use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::instruction::Instruction;
use log::{error, info};
use solana_sdk::signature::Signature;

use crate::config::WidgetConfig;
use crate::error::{Result, WidgetError};
use crate::events::{EventSink, WidgetEvent};
use crate::instructions::{
    associated_token_address, crank, create_associated_token_account, create_stake_account,
    ClaimRewards, Stake, Unstake,
};
use crate::reader::AccountReader;
use crate::relay::{FeePaymentData, FeeRelay};
use crate::retry::{Attempt, RetryPolicy};
use crate::rewards::{calculate_reward_for_staker, unclaimed_days};
use crate::rpc::RpcConnection;
use crate::send::{SendOptions, TransactionSender};
use crate::state::{CentralState, StakeAccount, StakePool};
use crate::wallet::WalletSigner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Lock,
    Unlock,
    Claim,
}

/// On-chain accounts an operation works with.
struct Context {
    owner: Pubkey,
    central_key: Pubkey,
    central: CentralState,
    pool_key: Pubkey,
    pool: StakePool,
    stake_key: Pubkey,
    stake: Option<StakeAccount>,
    owner_ata: Pubkey,
}

/// Mutable state of one running operation.
#[derive(Default)]
struct Run {
    tracker: StepTracker,
    signatures: Vec<Signature>,
}

fn system_now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub struct Orchestrator<'a, C: RpcConnection + ?Sized, W: WalletSigner + ?Sized> {
    config: &'a WidgetConfig,
    rpc: &'a C,
    wallet: &'a W,
    events: &'a dyn EventSink,
    guard: &'a OperationGuard,
    relay: Option<(Pubkey, &'a dyn FeeRelay)>,
    clock: fn() -> i64,
}

impl<'a, C: RpcConnection + ?Sized, W: WalletSigner + ?Sized> Orchestrator<'a, C, W> {
    pub fn new(
        config: &'a WidgetConfig,
        rpc: &'a C,
        wallet: &'a W,
        events: &'a dyn EventSink,
        guard: &'a OperationGuard,
    ) -> Self {
        Self {
            config,
            rpc,
            wallet,
            events,
            guard,
            relay: None,
            clock: system_now,
        }
    }

    /// Let the relay pay fees when the wallet cannot.
    pub fn with_relay<R: FeeRelay>(mut self, fee_payment: &'a FeePaymentData<R>) -> Self {
        let relay: &'a dyn FeeRelay = &fee_payment.relay;
        self.relay = Some((fee_payment.fee_payer, relay));
        self
    }

    /// Source of the current unix time, used to decide whether to crank.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn reader(&self) -> AccountReader<'a, C> {
        AccountReader::new(self.rpc, self.config.program_id, self.config.reward_formula)
    }

    fn sender(&self) -> TransactionSender<'a, C> {
        TransactionSender::new(
            self.rpc,
            SendOptions {
                max_priority_fee_lamports: self.config.max_priority_fee_lamports,
                ..SendOptions::default()
            },
        )
    }

    /// Tell the host a wallet is connected.
    pub fn announce_connection(&self) {
        self.events.emit(WidgetEvent::Connected {
            address: self.wallet.pubkey(),
        });
    }

    /// Lock `amount` tokens into the configured pool.
    pub async fn lock(&self, amount: u64) -> OperationOutcome {
        self.run(Operation::Lock, amount).await
    }

    /// Unlock `amount` tokens from the configured pool.
    pub async fn unlock(&self, amount: u64) -> OperationOutcome {
        self.run(Operation::Unlock, amount).await
    }

    /// Claim every reward accrued in the configured pool.
    pub async fn claim(&self) -> OperationOutcome {
        self.run(Operation::Claim, 0).await
    }

    async fn run(&self, operation: Operation, amount: u64) -> OperationOutcome {
        let owner = self.wallet.pubkey();
        let mut run = Run::default();

        let result = match self.guard.acquire(owner) {
            Ok(_in_flight) => match operation {
                Operation::Lock => self.run_lock(&mut run, amount).await,
                Operation::Unlock => self.run_unlock(&mut run, amount).await,
                Operation::Claim => self.run_claim(&mut run).await,
            },
            Err(err) => Err(err),
        };

        let steps = run.tracker.finish();
        match result {
            Ok(amount) => {
                info!("{:?} of {} for {} done", operation, amount, owner);
                self.events.emit(match operation {
                    Operation::Lock => WidgetEvent::Lock { address: owner, amount },
                    Operation::Unlock => WidgetEvent::Unlock { address: owner, amount },
                    Operation::Claim => WidgetEvent::Claim { address: owner, amount },
                });
                OperationOutcome {
                    steps,
                    signatures: run.signatures,
                    amount,
                    error: None,
                }
            }
            Err(err) => {
                error!("{:?} for {} failed: {}", operation, owner, err);
                OperationOutcome {
                    steps,
                    signatures: run.signatures,
                    amount: 0,
                    error: Some(err),
                }
            }
        }
    }

    async fn run_lock(&self, run: &mut Run, amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(WidgetError::ZeroAmount);
        }
        let reader = self.reader();
        let mut ctx = self.load_context().await?;

        let available = reader.get_token_balance(&ctx.owner, &ctx.central.token_mint).await?;
        if available < amount {
            return Err(WidgetError::InsufficientFunds {
                required: amount,
                available,
                get_tokens_url: self.config.get_acs_url.clone(),
            });
        }
        let staked = ctx.stake.as_ref().map_or(0, |stake| stake.stake_amount);
        let resulting = staked.checked_add(amount).ok_or(WidgetError::MathOverflow)?;
        if resulting < ctx.pool.minimum_stake_amount {
            return Err(WidgetError::BelowPoolMinimum {
                minimum: ctx.pool.minimum_stake_amount,
                resulting,
                get_tokens_url: self.config.get_acs_url.clone(),
            });
        }

        let payer = self.fee_payer(&ctx.owner).await?;
        self.crank_if_due(run, &mut ctx, &payer).await?;
        if ctx.stake.is_none() {
            self.create_stake_account(run, &mut ctx, &payer).await?;
        }
        self.claim_if_due(run, &ctx, &payer).await?;

        let bond_account = reader
            .get_bond_accounts(&ctx.owner)
            .await?
            .into_iter()
            .next()
            .map(|(key, _)| key);
        let mut instructions = self.token_account_setup(&ctx, &payer).await?;
        instructions.push(
            Stake {
                central_state: ctx.central_key,
                stake_account: ctx.stake_key,
                stake_pool: ctx.pool_key,
                owner: ctx.owner,
                source_token: ctx.owner_ata,
                vault: ctx.pool.vault,
                fee_account: associated_token_address(&ctx.central.authority, &ctx.central.token_mint),
                bond_account,
            }
            .instruction(&self.config.program_id, amount)?,
        );
        self.submit(run, &payer, Step::Stake, instructions).await?;
        Ok(amount)
    }

    async fn run_unlock(&self, run: &mut Run, amount: u64) -> Result<u64> {
        if amount == 0 {
            return Err(WidgetError::ZeroAmount);
        }
        let mut ctx = self.load_context().await?;
        let staked = match &ctx.stake {
            Some(stake) => stake.stake_amount,
            None => {
                return Err(WidgetError::NoStakeAccount {
                    owner: ctx.owner,
                    pool: ctx.pool_key,
                })
            }
        };
        if amount > staked {
            return Err(WidgetError::InsufficientStake {
                staked,
                requested: amount,
            });
        }

        let payer = self.fee_payer(&ctx.owner).await?;
        self.crank_if_due(run, &mut ctx, &payer).await?;
        self.claim_if_due(run, &ctx, &payer).await?;

        let mut instructions = self.token_account_setup(&ctx, &payer).await?;
        instructions.push(
            Unstake {
                central_state: ctx.central_key,
                stake_account: ctx.stake_key,
                stake_pool: ctx.pool_key,
                owner: ctx.owner,
                destination_token: ctx.owner_ata,
                vault: ctx.pool.vault,
            }
            .instruction(&self.config.program_id, amount)?,
        );
        self.submit(run, &payer, Step::Unstake, instructions).await?;
        Ok(amount)
    }

    async fn run_claim(&self, run: &mut Run) -> Result<u64> {
        let mut ctx = self.load_context().await?;
        if ctx.stake.is_none() {
            return Err(WidgetError::NoStakeAccount {
                owner: ctx.owner,
                pool: ctx.pool_key,
            });
        }
        let payer = self.fee_payer(&ctx.owner).await?;
        self.crank_if_due(run, &mut ctx, &payer).await?;
        self.claim_if_due(run, &ctx, &payer).await
    }

    async fn load_context(&self) -> Result<Context> {
        let reader = self.reader();
        let program_id = &self.config.program_id;
        let owner = self.wallet.pubkey();

        let (central_key, _) = CentralState::key(program_id);
        let central = reader
            .retrieve_central_state()
            .await?
            .ok_or_else(|| WidgetError::InvalidOption {
                name: "PROGRAM_ID",
                reason: format!("central state {} not found", central_key),
            })?;
        let pool_key = self.config.pool_id;
        let pool = self.retrieve_pool(&pool_key).await?;
        let (stake_key, _) = StakeAccount::key(program_id, &owner, &pool_key);
        let stake = reader.retrieve_stake_account(&stake_key).await?;
        let owner_ata = associated_token_address(&owner, &central.token_mint);

        Ok(Context {
            owner,
            central_key,
            central,
            pool_key,
            pool,
            stake_key,
            stake,
            owner_ata,
        })
    }

    async fn retrieve_pool(&self, key: &Pubkey) -> Result<StakePool> {
        self.reader()
            .retrieve_stake_pool(key)
            .await?
            .ok_or_else(|| WidgetError::InvalidOption {
                name: "poolId",
                reason: format!("stake pool {} not found", key),
            })
    }

    async fn fee_payer(&self, owner: &Pubkey) -> Result<FeePayer<'a>> {
        let native_balance = self.reader().get_native_balance(owner).await?;
        Ok(FeePayer::choose(
            *owner,
            native_balance,
            self.config.min_fee_balance,
            self.relay,
        ))
    }

    async fn submit(
        &self,
        run: &mut Run,
        payer: &FeePayer<'_>,
        step: Step,
        instructions: Vec<Instruction>,
    ) -> Result<()> {
        run.tracker.advance(step);
        let signatures = payer.submit(&self.sender(), self.wallet, instructions).await?;
        run.signatures.extend(signatures);
        Ok(())
    }

    /// Crank the pool if its current day has closed; refreshes `ctx.pool`.
    async fn crank_if_due(&self, run: &mut Run, ctx: &mut Context, payer: &FeePayer<'_>) -> Result<()> {
        let now = (self.clock)();
        if !ctx.pool.is_crank_due(&ctx.central, now) {
            return Ok(());
        }
        info!("cranking pool {} at day {}", ctx.pool_key, ctx.pool.current_day_idx);
        let instruction = crank(&self.config.program_id, &ctx.pool_key, &ctx.central_key);
        self.submit(run, payer, Step::Crank, vec![instruction]).await?;
        ctx.pool = self.retrieve_pool(&ctx.pool_key).await?;
        Ok(())
    }

    /// Create the owner's stake account and wait until it can be read back.
    async fn create_stake_account(&self, run: &mut Run, ctx: &mut Context, payer: &FeePayer<'_>) -> Result<()> {
        let instruction = create_stake_account(
            &self.config.program_id,
            &ctx.owner,
            &ctx.pool_key,
            &payer.pubkey(),
        )?;
        self.submit(run, payer, Step::CreateAccount, vec![instruction]).await?;

        let reader = &self.reader();
        let key = ctx.stake_key;
        let stake = RetryPolicy::account_creation()
            .run(|_| async move {
                Ok::<_, WidgetError>(match reader.retrieve_stake_account(&key).await? {
                    Some(stake) => Attempt::Ready(stake),
                    None => Attempt::Retry,
                })
            })
            .await?
            .ok_or(WidgetError::AccountNotVisible(key))?;
        info!("stake account {} created", key);
        ctx.stake = Some(stake);
        Ok(())
    }

    /// Claim pending rewards; returns the amount claimed (zero when skipped).
    async fn claim_if_due(&self, run: &mut Run, ctx: &Context, payer: &FeePayer<'_>) -> Result<u64> {
        let stake = match &ctx.stake {
            Some(stake) => stake,
            None => return Ok(0),
        };
        let days = unclaimed_days(&ctx.pool, stake.last_claimed_offset);
        let reward = calculate_reward_for_staker(days, &ctx.pool, stake.stake_amount, self.config.reward_formula)?;
        // the pool was refetched after any crank, so a closed day shows up here
        let behind = stake.last_claimed_offset < u64::from(ctx.pool.current_day_idx);
        if reward == 0 || !behind {
            return Ok(0);
        }

        info!("claiming {} over {} days", reward, days);
        let mut instructions = self.token_account_setup(ctx, payer).await?;
        instructions.push(
            ClaimRewards {
                stake_pool: ctx.pool_key,
                stake_account: ctx.stake_key,
                owner: ctx.owner,
                rewards_destination: ctx.owner_ata,
                central_state: ctx.central_key,
                mint: ctx.central.token_mint,
                owner_must_sign: true,
            }
            .instruction(&self.config.program_id, true)?,
        );
        self.submit(run, payer, Step::ClaimRewards, instructions).await?;
        Ok(reward)
    }

    /// Instruction creating the owner's token account, if it does not exist.
    async fn token_account_setup(&self, ctx: &Context, payer: &FeePayer<'_>) -> Result<Vec<Instruction>> {
        if self.rpc.get_account_data(&ctx.owner_ata).await?.is_some() {
            return Ok(Vec::new());
        }
        Ok(vec![create_associated_token_account(
            &payer.pubkey(),
            &ctx.owner,
            &ctx.central.token_mint,
        )])
    }
}
