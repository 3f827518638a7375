//! In-memory collaborators for tests: an RPC node backed by a tiny ledger that
//! applies the staking program's effects, a keypair wallet and a relay.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use anchor_lang::prelude::Pubkey;
use async_trait::async_trait;
use borsh::to_vec;
use indexmap::IndexMap;
use solana_sdk::hash::Hash;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::constants::SECONDS_PER_DAY;
use crate::error::{Result, WidgetError};
use crate::instructions::{associated_token_address, tag};
use crate::relay::{FeeRelay, RelaySubmission};
use crate::rpc::{Confirmation, MemcmpFilter, RpcConnection, SignatureStatus};
use crate::state::central_state::sample_central;
use crate::state::stake_account::sample_stake;
use crate::state::stake_pool::empty_pool;
use crate::state::{CentralState, StakeAccount, StakePool};
use crate::wallet::WalletSigner;

/// Fixed "now" for orchestrator tests.
pub const NOW: i64 = 1_700_000_000;

pub fn fixed_now() -> i64 {
    NOW
}

const TOKEN_ACCOUNT_LEN: usize = 165;

#[derive(Default)]
struct State {
    accounts: IndexMap<Pubkey, Vec<u8>>,
    token_balances: HashMap<Pubkey, u64>,
    native_balances: HashMap<Pubkey, u64>,
    sent: Vec<Transaction>,
    seen: HashSet<Signature>,
    statuses: HashMap<Signature, SignatureStatus>,
    simulated_units: u64,
    never_confirm: bool,
    failing_tag: Option<u8>,
    hide_created_accounts: bool,
    program_id: Option<Pubkey>,
    blockhash: Hash,
}

/// RPC node over an in-memory account map.
#[derive(Clone, Default)]
pub struct MockRpc {
    state: Arc<Mutex<State>>,
}

impl MockRpc {
    pub fn new() -> Self {
        let rpc = Self::default();
        {
            let mut state = rpc.state();
            state.simulated_units = 200_000;
            state.blockhash = Hash::new_unique();
        }
        rpc
    }

    /// A node holding the ledger's central state and stake pool.
    pub fn with_ledger(ledger: &Ledger) -> Self {
        let rpc = Self::new();
        rpc.state().program_id = Some(ledger.program_id);
        let mut central = sample_central(ledger.creation_time);
        central.token_mint = ledger.mint;
        central.authority = ledger.authority;
        rpc.set_account(ledger.central, to_vec(&central).unwrap());

        let mut pool = empty_pool(ledger.current_day_idx);
        pool.owner = ledger.pool_owner;
        pool.vault = ledger.vault;
        rpc.set_account(ledger.pool, to_vec(&pool).unwrap());
        rpc
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn set_account(&self, key: Pubkey, data: Vec<u8>) {
        self.state().accounts.insert(key, data);
    }

    pub fn account(&self, key: &Pubkey) -> Option<Vec<u8>> {
        self.state().accounts.get(key).cloned()
    }

    pub fn set_native_balance(&self, key: Pubkey, lamports: u64) {
        self.state().native_balances.insert(key, lamports);
    }

    pub fn set_simulated_units(&self, units: u64) {
        self.state().simulated_units = units;
    }

    pub fn never_confirm(&self) {
        self.state().never_confirm = true;
    }

    pub fn confirm_signature(&self, signature: Signature) {
        self.state().statuses.insert(
            signature,
            SignatureStatus {
                confirmation: Some(Confirmation::Confirmed),
                err: None,
            },
        );
    }

    pub fn fail_signature(&self, signature: Signature, reason: &str) {
        self.state().statuses.insert(
            signature,
            SignatureStatus {
                confirmation: Some(Confirmation::Processed),
                err: Some(reason.to_string()),
            },
        );
    }

    /// Transactions carrying a program instruction with this tag land with an error.
    pub fn fail_instruction(&self, instruction_tag: u8) {
        self.state().failing_tag = Some(instruction_tag);
    }

    /// Created stake accounts never become readable.
    pub fn hide_created_accounts(&self) {
        self.state().hide_created_accounts = true;
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.state().sent.clone()
    }

    /// Tags of every staking program instruction sent, in order.
    pub fn sent_program_tags(&self) -> Vec<u8> {
        let state = self.state();
        let program_id = match state.program_id {
            Some(id) => id,
            None => return Vec::new(),
        };
        state
            .sent
            .iter()
            .flat_map(|tx| {
                tx.message
                    .instructions
                    .iter()
                    .filter(|ix| tx.message.account_keys[ix.program_id_index as usize] == program_id)
                    .map(|ix| ix.data[0])
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

fn read_u64(data: &[u8]) -> u64 {
    u64::from_le_bytes(data[..8].try_into().unwrap())
}

impl State {
    fn update<T, F>(&mut self, key: &Pubkey, decode: fn(&[u8]) -> Result<T>, f: F)
    where
        T: borsh::BorshSerialize,
        F: FnOnce(&mut T),
    {
        if let Some(data) = self.accounts.get(key) {
            let mut value = decode(data).unwrap();
            f(&mut value);
            self.accounts.insert(*key, to_vec(&value).unwrap());
        }
    }

    fn current_day(&self, pool: &Pubkey) -> u64 {
        self.accounts
            .get(pool)
            .map(|data| u64::from(StakePool::decode(data).unwrap().current_day_idx))
            .unwrap_or(0)
    }

    /// Apply what the staking program would do with `tx`.
    fn apply(&mut self, tx: &Transaction) {
        let program_id = match self.program_id {
            Some(id) => id,
            None => return,
        };
        let keys = &tx.message.account_keys;
        for ix in &tx.message.instructions {
            let program = keys[ix.program_id_index as usize];
            let account = |i: usize| keys[ix.accounts[i] as usize];

            if program == anchor_spl::associated_token::ID {
                let ata = account(1);
                if !self.accounts.contains_key(&ata) {
                    self.accounts.insert(ata, vec![0; TOKEN_ACCOUNT_LEN]);
                }
                continue;
            }
            if program != program_id {
                continue;
            }

            match ix.data[0] {
                tag::CREATE_STAKE_ACCOUNT => {
                    let stake_key = account(0);
                    let pool = account(2);
                    let owner = Pubkey::try_from(&ix.data[2..34]).unwrap();
                    let mut stake = sample_stake(owner, pool, 0);
                    stake.last_claimed_offset = self.current_day(&pool);
                    self.accounts.insert(stake_key, to_vec(&stake).unwrap());
                }
                tag::STAKE => {
                    let amount = read_u64(&ix.data[1..]);
                    self.update(&account(1), StakeAccount::decode, |s| s.stake_amount += amount);
                    let source = self.token_balances.entry(account(4)).or_default();
                    *source = source.saturating_sub(amount);
                }
                tag::UNSTAKE => {
                    let amount = read_u64(&ix.data[1..]);
                    self.update(&account(1), StakeAccount::decode, |s| s.stake_amount -= amount);
                }
                tag::CLAIM_REWARDS => {
                    let day = self.current_day(&account(0));
                    self.update(&account(1), StakeAccount::decode, |s| s.last_claimed_offset = day);
                }
                tag::CRANK => {
                    self.update(&account(0), StakePool::decode, |p| p.current_day_idx += 1);
                }
                _ => {}
            }
        }
    }

    fn carries_failing_instruction(&self, tx: &Transaction) -> bool {
        match (self.failing_tag, self.program_id) {
            (Some(failing), Some(program_id)) => tx.message.instructions.iter().any(|ix| {
                tx.message.account_keys[ix.program_id_index as usize] == program_id
                    && ix.data.first() == Some(&failing)
            }),
            _ => false,
        }
    }
}

#[async_trait]
impl RpcConnection for MockRpc {
    async fn get_account_data(&self, key: &Pubkey) -> Result<Option<Vec<u8>>> {
        Ok(self.state().accounts.get(key).cloned())
    }

    async fn get_program_accounts(
        &self,
        _program_id: &Pubkey,
        filters: Vec<MemcmpFilter>,
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        Ok(self
            .state()
            .accounts
            .iter()
            .filter(|(_, data)| filters.iter().all(|f| f.matches(data)))
            .map(|(key, data)| (*key, data.clone()))
            .collect())
    }

    async fn get_balance(&self, key: &Pubkey) -> Result<u64> {
        Ok(self.state().native_balances.get(key).copied().unwrap_or(0))
    }

    async fn get_token_account_balance(&self, key: &Pubkey) -> Result<u64> {
        Ok(self.state().token_balances.get(key).copied().unwrap_or(0))
    }

    async fn get_latest_blockhash(&self) -> Result<Hash> {
        Ok(self.state().blockhash)
    }

    async fn simulate_units(&self, _transaction: &Transaction) -> Result<u64> {
        Ok(self.state().simulated_units)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> Result<Signature> {
        if !transaction.is_signed() {
            return Err(WidgetError::Rpc("transaction is missing signatures".to_string()));
        }
        let signature = transaction.signatures[0];
        let mut state = self.state();
        if !state.seen.insert(signature) {
            return Ok(signature);
        }
        state.sent.push(transaction.clone());

        if state.carries_failing_instruction(transaction) {
            state.statuses.insert(
                signature,
                SignatureStatus {
                    confirmation: Some(Confirmation::Processed),
                    err: Some("custom program error: 0x0".to_string()),
                },
            );
            return Ok(signature);
        }

        let before: HashSet<Pubkey> = state.accounts.keys().copied().collect();
        state.apply(transaction);
        if state.hide_created_accounts {
            let created: Vec<Pubkey> = state
                .accounts
                .keys()
                .filter(|key| !before.contains(*key))
                .copied()
                .collect();
            for key in created {
                state.accounts.shift_remove(&key);
            }
        }

        if !state.never_confirm {
            state.statuses.insert(
                signature,
                SignatureStatus {
                    confirmation: Some(Confirmation::Confirmed),
                    err: None,
                },
            );
        }
        Ok(signature)
    }

    async fn get_signature_status(&self, signature: &Signature) -> Result<Option<SignatureStatus>> {
        let state = self.state();
        if state.never_confirm {
            return Ok(None);
        }
        Ok(state.statuses.get(signature).cloned())
    }
}

/// Keys and timing of a staking deployment with one pool.
pub struct Ledger {
    pub program_id: Pubkey,
    pub central: Pubkey,
    pub pool: Pubkey,
    pub pool_owner: Pubkey,
    pub mint: Pubkey,
    pub authority: Pubkey,
    pub vault: Pubkey,
    pub current_day_idx: u16,
    pub creation_time: i64,
}

impl Ledger {
    fn at(current_day_idx: u16, creation_time: i64) -> Self {
        let program_id = Pubkey::new_unique();
        let pool_owner = Pubkey::new_unique();
        Self {
            program_id,
            central: CentralState::key(&program_id).0,
            pool: StakePool::key(&program_id, &pool_owner).0,
            pool_owner,
            mint: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            vault: Pubkey::new_unique(),
            current_day_idx,
            creation_time,
        }
    }

    /// Pool whose current day is still open at [`NOW`].
    pub fn new(current_day_idx: u16) -> Self {
        let idx = i64::from(current_day_idx);
        Self::at(current_day_idx, NOW - SECONDS_PER_DAY * idx - 3_600)
    }

    /// Pool whose current day closed a day before [`NOW`].
    pub fn stale(current_day_idx: u16) -> Self {
        let idx = i64::from(current_day_idx);
        Self::at(current_day_idx, NOW - SECONDS_PER_DAY * (idx + 2))
    }

    pub fn stake_key(&self, owner: &Pubkey) -> Pubkey {
        StakeAccount::key(&self.program_id, owner, &self.pool).0
    }

    pub fn add_stake_account(&self, rpc: &MockRpc, owner: &Pubkey, amount: u64) -> Pubkey {
        self.add_stake_account_claimed_at(rpc, owner, amount, u64::from(self.current_day_idx))
    }

    pub fn add_stake_account_claimed_at(
        &self,
        rpc: &MockRpc,
        owner: &Pubkey,
        amount: u64,
        last_claimed_offset: u64,
    ) -> Pubkey {
        let key = self.stake_key(owner);
        let mut stake = sample_stake(*owner, self.pool, amount);
        stake.last_claimed_offset = last_claimed_offset;
        rpc.set_account(key, to_vec(&stake).unwrap());
        key
    }

    pub fn stake_account(&self, rpc: &MockRpc, owner: &Pubkey) -> Option<StakeAccount> {
        rpc.account(&self.stake_key(owner))
            .map(|data| StakeAccount::decode(&data).unwrap())
    }

    pub fn pool_state(&self, rpc: &MockRpc) -> StakePool {
        StakePool::decode(&rpc.account(&self.pool).unwrap()).unwrap()
    }

    fn update_pool(&self, rpc: &MockRpc, f: impl FnOnce(&mut StakePool)) {
        let mut pool = self.pool_state(rpc);
        f(&mut pool);
        rpc.set_account(self.pool, to_vec(&pool).unwrap());
    }

    /// Set the stakers' reward of the given buffer slots.
    pub fn set_rewards(&self, rpc: &MockRpc, rewards: &[(usize, u128)]) {
        self.update_pool(rpc, |pool| {
            for &(slot, reward) in rewards {
                pool.balances[slot].stakers_reward = reward;
            }
        });
    }

    pub fn set_pool_minimum(&self, rpc: &MockRpc, minimum: u64) {
        self.update_pool(rpc, |pool| pool.minimum_stake_amount = minimum);
    }

    /// Create `owner`'s token account holding `amount`.
    pub fn fund_tokens(&self, rpc: &MockRpc, owner: &Pubkey, amount: u64) -> Pubkey {
        let ata = associated_token_address(owner, &self.mint);
        rpc.set_account(ata, vec![0; TOKEN_ACCOUNT_LEN]);
        rpc.state().token_balances.insert(ata, amount);
        ata
    }

    pub fn token_balance(&self, rpc: &MockRpc, owner: &Pubkey) -> u64 {
        let ata = associated_token_address(owner, &self.mint);
        rpc.state().token_balances.get(&ata).copied().unwrap_or(0)
    }
}

/// Wallet holding a local keypair, optionally refusing to sign.
pub struct TestWallet {
    keypair: Keypair,
    refuse: bool,
}

impl TestWallet {
    pub fn new() -> Self {
        Self {
            keypair: Keypair::new(),
            refuse: false,
        }
    }

    pub fn refusing() -> Self {
        Self {
            keypair: Keypair::new(),
            refuse: true,
        }
    }
}

#[async_trait]
impl WalletSigner for TestWallet {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign_transaction(&self, mut transaction: Transaction) -> Result<Transaction> {
        if self.refuse {
            return Err(WidgetError::Signing("User rejected the request.".to_string()));
        }
        let signers = usize::from(transaction.message.header.num_required_signatures);
        if transaction.message.account_keys[..signers].contains(&self.keypair.pubkey()) {
            let blockhash = transaction.message.recent_blockhash;
            transaction.partial_sign(&[&self.keypair], blockhash);
        }
        Ok(transaction)
    }
}

enum RelayMode {
    CoSigning,
    Forwarding(MockRpc),
    Rejecting,
}

/// Fee-payer relay signing with its own keypair.
pub struct MockRelay {
    keypair: Keypair,
    mode: RelayMode,
    submitted: Mutex<usize>,
}

impl MockRelay {
    fn with_mode(mode: RelayMode) -> Self {
        Self {
            keypair: Keypair::new(),
            mode,
            submitted: Mutex::new(0),
        }
    }

    /// Returns co-signed transactions for the client to send.
    pub fn co_signing() -> Self {
        Self::with_mode(RelayMode::CoSigning)
    }

    /// Sends co-signed transactions to `rpc` itself.
    pub fn forwarding(rpc: MockRpc) -> Self {
        Self::with_mode(RelayMode::Forwarding(rpc))
    }

    pub fn rejecting() -> Self {
        Self::with_mode(RelayMode::Rejecting)
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn submitted(&self) -> usize {
        *self.submitted.lock().unwrap()
    }
}

#[async_trait]
impl FeeRelay for MockRelay {
    async fn fee_payer(&self) -> Result<Pubkey> {
        Ok(self.keypair.pubkey())
    }

    async fn submit(&self, transactions: &[Transaction]) -> Result<Vec<RelaySubmission>> {
        if let RelayMode::Rejecting = self.mode {
            return Err(WidgetError::RelayRejected {
                status: 500,
                body: "Unable to sign request on the backend".to_string(),
            });
        }
        *self.submitted.lock().unwrap() += transactions.len();

        let mut submissions = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let mut transaction = transaction.clone();
            let blockhash = transaction.message.recent_blockhash;
            transaction.partial_sign(&[&self.keypair], blockhash);
            submissions.push(match &self.mode {
                RelayMode::Forwarding(rpc) => RelaySubmission::Sent(rpc.send_transaction(&transaction).await?),
                _ => RelaySubmission::CoSigned(transaction),
            });
        }
        Ok(submissions)
    }
}

/// Canned reply of [`serve_http`]; `None` closes the connection unanswered.
pub type Reply = Option<(u16, String)>;

/// Answer one connection per reply, in order, on a local port. Returns the base URL.
pub async fn serve_http(replies: Vec<Reply>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for reply in replies {
            let (mut stream, _) = match listener.accept().await {
                Ok(connection) => connection,
                Err(_) => return,
            };
            let (status, body) = match reply {
                Some(reply) => reply,
                None => continue,
            };
            read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        }
    });
    format!("http://{}", addr)
}

/// Consume the request head and its `Content-Length` body.
async fn read_request(stream: &mut TcpStream) {
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(read) => read,
        };
        request.extend_from_slice(&chunk[..read]);
        let head_end = match request.windows(4).position(|w| w == b"\r\n\r\n") {
            Some(position) => position + 4,
            None => continue,
        };
        let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
        let body_len = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if request.len() >= head_end + body_len {
            return;
        }
    }
}
