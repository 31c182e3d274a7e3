pub mod contract;

use crate::error::DappError;
use async_trait::async_trait;
use ethers::{
    providers::Middleware,
    types::{Address, Block, BlockNumber, Transaction, U256},
};
use log::debug;
use std::sync::Arc;

pub use contract::{ContractGateway, Gateway};

/// Read access to the ledger used by the balance display and the history
/// scan.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn block_number(&self) -> Result<u64, DappError>;

    /// Block `number` with full transaction bodies, `None` if the node does
    /// not know it.
    async fn block_with_transactions(
        &self,
        number: u64,
    ) -> Result<Option<Block<Transaction>>, DappError>;

    async fn balance(&self, account: Address) -> Result<U256, DappError>;
}

/// [`Ledger`] backed by any ethers middleware stack
pub struct RpcLedger<M> {
    client: Arc<M>,
}

impl<M> RpcLedger<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M> Ledger for RpcLedger<M>
where
    M: Middleware + 'static,
{
    async fn block_number(&self) -> Result<u64, DappError> {
        let number = self
            .client
            .get_block_number()
            .await
            .map_err(|e| transport_error("eth_blockNumber", e))?;
        Ok(number.as_u64())
    }

    async fn block_with_transactions(
        &self,
        number: u64,
    ) -> Result<Option<Block<Transaction>>, DappError> {
        debug!("(ledger) fetching block {} with transactions", number);
        self.client
            .get_block_with_txs(BlockNumber::Number(number.into()))
            .await
            .map_err(|e| transport_error("eth_getBlockByNumber", e))
    }

    async fn balance(&self, account: Address) -> Result<U256, DappError> {
        self.client
            .get_balance(account, None)
            .await
            .map_err(|e| transport_error("eth_getBalance", e))
    }
}

fn transport_error<E: std::fmt::Display>(method: &str, err: E) -> DappError {
    DappError::Transport(format!("{} failed: {}", method, err))
}
