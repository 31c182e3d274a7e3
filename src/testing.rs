//! In-memory stand-ins for the ledger, the contract and the wallet.

use crate::{
    error::DappError,
    network::{Gateway, Ledger},
    wallet::{Connector, Session, WalletProvider},
};
use async_trait::async_trait;
use ethers::types::{Address, Block, Transaction, TxHash, H256, U256, U64};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

pub fn addr(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

pub fn fake_session(account: Address) -> Session {
    Session {
        account,
        ledger: Arc::new(FakeChain::with_head(0)),
        gateway: Arc::new(FakeGateway::default()),
    }
}

#[derive(Default)]
struct ChainState {
    head: u64,
    /// Applied once, to the next head lookup
    head_delay: Option<Duration>,
    blocks: HashMap<u64, Block<Transaction>>,
    balances: HashMap<Address, U256>,
    failing: HashSet<u64>,
    fetched: Vec<u64>,
    next_hash: u64,
}

fn empty_block(n: u64) -> Block<Transaction> {
    Block {
        number: Some(U64::from(n)),
        hash: Some(H256::from_low_u64_be(n + 1)),
        ..Default::default()
    }
}

/// Chain with empty blocks `0..=head` that tests fill with transactions
pub struct FakeChain {
    state: Mutex<ChainState>,
}

impl FakeChain {
    pub fn with_head(head: u64) -> Self {
        let blocks = (0..=head).map(|n| (n, empty_block(n))).collect();
        Self {
            state: Mutex::new(ChainState {
                head,
                blocks,
                ..Default::default()
            }),
        }
    }

    /// Grows the chain with empty blocks up to `head`
    pub fn set_head(&self, head: u64) {
        let mut state = self.state.lock().unwrap();
        for n in state.head + 1..=head {
            state.blocks.insert(n, empty_block(n));
        }
        state.head = head;
    }

    /// The next head lookup answers with the current head, but only after
    /// `delay`
    pub fn delay_next_head(&self, delay: Duration) {
        self.state.lock().unwrap().head_delay = Some(delay);
    }

    /// Appends a transaction to `block` and returns its hash
    pub fn push_tx(&self, block: u64, from: Address, to: Option<Address>, value: U256) -> TxHash {
        let mut state = self.state.lock().unwrap();
        state.next_hash += 1;
        let hash = H256::from_low_u64_be(0x1000 + state.next_hash);
        let block = state.blocks.get_mut(&block).expect("block exists");
        block.transactions.push(Transaction {
            hash,
            from,
            to,
            value,
            block_number: block.number,
            transaction_index: Some(U64::from(block.transactions.len() as u64)),
            ..Default::default()
        });
        hash
    }

    pub fn set_balance(&self, account: Address, balance: U256) {
        self.state.lock().unwrap().balances.insert(account, balance);
    }

    pub fn remove_block(&self, number: u64) {
        self.state.lock().unwrap().blocks.remove(&number);
    }

    pub fn fail_block(&self, number: u64) {
        self.state.lock().unwrap().failing.insert(number);
    }

    /// Block numbers requested so far, in request order
    pub fn fetched_blocks(&self) -> Vec<u64> {
        self.state.lock().unwrap().fetched.clone()
    }
}

#[async_trait]
impl Ledger for FakeChain {
    async fn block_number(&self) -> Result<u64, DappError> {
        let (head, delay) = {
            let mut state = self.state.lock().unwrap();
            (state.head, state.head_delay.take())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(head)
    }

    async fn block_with_transactions(
        &self,
        number: u64,
    ) -> Result<Option<Block<Transaction>>, DappError> {
        let mut state = self.state.lock().unwrap();
        state.fetched.push(number);
        if state.failing.contains(&number) {
            return Err(DappError::Transport(format!("block {} unavailable", number)));
        }
        Ok(state.blocks.get(&number).cloned())
    }

    async fn balance(&self, account: Address) -> Result<U256, DappError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&account)
            .copied()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Submit { receiver: Address, amount: U256 },
    Mine,
}

/// Records calls; fails every call with `fail_with` when set
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<GatewayCall>>,
    fail_with: Mutex<Option<DappError>>,
}

impl FakeGateway {
    pub fn failing(err: DappError) -> Self {
        Self {
            fail_with: Mutex::new(Some(err)),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: GatewayCall) -> Result<TxHash, DappError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        match self.fail_with.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(H256::from_low_u64_be(calls.len() as u64)),
        }
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn submit_transaction(
        &self,
        receiver: Address,
        amount: U256,
    ) -> Result<TxHash, DappError> {
        self.record(GatewayCall::Submit { receiver, amount })
    }

    async fn mine_block(&self) -> Result<TxHash, DappError> {
        self.record(GatewayCall::Mine)
    }
}

pub struct FakeWallet {
    accounts: Result<Vec<Address>, DappError>,
}

impl FakeWallet {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            accounts: Ok(accounts),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accounts: Err(DappError::UserRejected),
        }
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    fn name(&self) -> &str {
        "fake"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, DappError> {
        self.accounts.clone()
    }

    async fn open_session(&self, account: Address) -> Result<Session, DappError> {
        Ok(fake_session(account))
    }
}

/// Hands out a prepared session, or an error
pub struct FakeConnector {
    pub result: Result<Session, DappError>,
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self) -> Result<Session, DappError> {
        self.result.clone()
    }
}
