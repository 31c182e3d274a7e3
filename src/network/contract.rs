use crate::error::DappError;
use async_trait::async_trait;
use ethers::{
    contract::{abigen, ContractCall, ContractError},
    providers::Middleware,
    types::{Address, TransactionReceipt, TxHash, U256, U64},
};
use log::{debug, warn};
use std::sync::Arc;

abigen!(
    Transactions,
    r#"[
        function submitTransaction(address receiver, uint256 amount)
        function mineBlock()
    ]"#
);

/// The two state mutating entry points of the deployed contract. Both
/// return once the transaction has been included in a block.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn submit_transaction(&self, receiver: Address, amount: U256)
        -> Result<TxHash, DappError>;

    async fn mine_block(&self) -> Result<TxHash, DappError>;
}

pub struct ContractGateway<M> {
    contract: Transactions<M>,
}

impl<M: Middleware + 'static> ContractGateway<M> {
    pub fn new(address: Address, client: Arc<M>) -> Self {
        Self {
            contract: Transactions::new(address, client),
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    async fn send_and_wait(&self, call: ContractCall<M, ()>) -> Result<TxHash, DappError> {
        let pending = call.send().await.map_err(contract_error::<M>)?;
        let tx_hash = pending.tx_hash();
        debug!("(gateway) sent {:?}, waiting for inclusion", tx_hash);

        let receipt = pending
            .await
            .map_err(|e| DappError::Transport(e.to_string()))?;
        check_receipt(tx_hash, receipt)
    }
}

/// A mined transaction with status 0 ran out of gas or reverted without the
/// node telling us why
fn check_receipt(
    tx_hash: TxHash,
    receipt: Option<TransactionReceipt>,
) -> Result<TxHash, DappError> {
    let receipt = receipt.ok_or_else(|| {
        DappError::Transport(format!("transaction {:?} was dropped", tx_hash))
    })?;
    if receipt.status == Some(U64::zero()) {
        warn!("(gateway) transaction {:?} reverted", tx_hash);
        return Err(DappError::remote("transaction reverted"));
    }
    debug!(
        "(gateway) {:?} included in block {:?}",
        tx_hash, receipt.block_number
    );
    Ok(tx_hash)
}

#[async_trait]
impl<M: Middleware + 'static> Gateway for ContractGateway<M> {
    async fn submit_transaction(
        &self,
        receiver: Address,
        amount: U256,
    ) -> Result<TxHash, DappError> {
        self.send_and_wait(self.contract.submit_transaction(receiver, amount))
            .await
    }

    async fn mine_block(&self) -> Result<TxHash, DappError> {
        self.send_and_wait(self.contract.mine_block()).await
    }
}

/// Reverts become [`DappError::RemoteExecution`] carrying the decoded
/// `Error(string)` reason when there is one; everything else is transport.
fn contract_error<M: Middleware>(err: ContractError<M>) -> DappError {
    if err.is_revert() {
        let reason = err
            .decode_revert::<String>()
            .unwrap_or_else(|| "execution reverted".to_string());
        return DappError::remote(reason);
    }
    let message = err.to_string();
    // some nodes only report the reason inside the rpc error message
    if let Some((_, reason)) = message.split_once("reverted with reason string ") {
        return DappError::remote(reason.trim().trim_matches('\''));
    }
    DappError::Transport(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::{
        abi::{self, Token},
        providers::{MockProvider, Provider, ProviderError},
    };

    type Mocked = Provider<MockProvider>;

    #[test]
    fn revert_reason_is_decoded() {
        let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
        data.extend(abi::encode(&[Token::String("not enough funds".into())]));
        let err = ContractError::<Mocked>::Revert(data.into());
        assert_eq!(contract_error(err), DappError::remote("not enough funds"));
    }

    #[test]
    fn revert_without_reason() {
        let err = ContractError::<Mocked>::Revert(Vec::new().into());
        assert_eq!(contract_error(err), DappError::remote("execution reverted"));
    }

    #[test]
    fn reason_in_node_message_is_kept() {
        let err = ContractError::<Mocked>::ProviderError {
            e: ProviderError::CustomError(
                "VM Exception while processing transaction: reverted with reason string \
                 'Only owner can mine'"
                    .into(),
            ),
        };
        assert_eq!(contract_error(err), DappError::remote("Only owner can mine"));
    }

    #[test]
    fn other_node_failures_are_transport() {
        let err = ContractError::<Mocked>::ProviderError {
            e: ProviderError::CustomError("nonce too low".into()),
        };
        match contract_error(err) {
            DappError::Transport(msg) => assert!(msg.contains("nonce too low")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn failed_receipt_is_remote_execution() {
        let hash = TxHash::from_low_u64_be(1);
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            status: Some(U64::zero()),
            ..Default::default()
        };
        assert_eq!(
            check_receipt(hash, Some(receipt)),
            Err(DappError::remote("transaction reverted"))
        );
    }

    #[test]
    fn successful_receipt_returns_the_hash() {
        let hash = TxHash::from_low_u64_be(2);
        let receipt = TransactionReceipt {
            transaction_hash: hash,
            status: Some(U64::one()),
            block_number: Some(U64::from(5)),
            ..Default::default()
        };
        assert_eq!(check_receipt(hash, Some(receipt)), Ok(hash));
    }

    #[test]
    fn dropped_transaction_is_transport() {
        let hash = TxHash::from_low_u64_be(3);
        assert!(matches!(
            check_receipt(hash, None),
            Err(DappError::Transport(msg)) if msg.contains("dropped")
        ));
    }

    #[test]
    fn gateway_binds_configured_address() {
        let (provider, _mock) = Provider::mocked();
        let address = Address::from_low_u64_be(7);
        let gateway = ContractGateway::new(address, Arc::new(provider));
        assert_eq!(gateway.address(), address);
    }
}
