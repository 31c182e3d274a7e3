//! Wallet detection, account authorization and session setup.

use crate::{
    config::Config,
    error::DappError,
    network::{ContractGateway, Gateway, Ledger, RpcLedger},
};
use async_trait::async_trait;
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, JsonRpcClient, Middleware, Provider, ProviderError, RpcError},
    signers::{LocalWallet, Signer},
    types::Address,
};
use log::{debug, info, warn};
use std::{fmt, sync::Arc, time::Duration};

/// JSON-RPC "method not found"
const METHOD_NOT_FOUND_CODE: i64 = -32601;

/// Connection to the ledger for one authorized account. Replaced only by a
/// reconnect.
#[derive(Clone)]
pub struct Session {
    pub account: Address,
    pub ledger: Arc<dyn Ledger>,
    pub gateway: Arc<dyn Gateway>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

/// Something that holds accounts and can sign for them
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Asks for access to the provider's accounts. An empty list means the
    /// user did not authorize any.
    async fn request_accounts(&self) -> Result<Vec<Address>, DappError>;

    /// Wraps the provider into reading and signing capabilities for `account`
    async fn open_session(&self, account: Address) -> Result<Session, DappError>;
}

/// Requests authorization from `provider` and opens a session for the first
/// account it returns.
pub async fn connect(provider: Option<&dyn WalletProvider>) -> Result<Session, DappError> {
    let provider = provider.ok_or(DappError::ProviderAbsent)?;
    debug!("(wallet) requesting accounts from {}", provider.name());

    let accounts = provider.request_accounts().await?;
    let account = accounts.first().copied().ok_or(DappError::UserRejected)?;

    let session = provider.open_session(account).await?;
    info!("(wallet) connected {:?} via {}", account, provider.name());
    Ok(session)
}

/// Signs locally with a configured private key
pub struct LocalKeyWallet<P = Http> {
    provider: Provider<P>,
    wallet: LocalWallet,
    contract: Address,
}

impl<P: JsonRpcClient> LocalKeyWallet<P> {
    pub fn new(provider: Provider<P>, wallet: LocalWallet, contract: Address) -> Self {
        Self {
            provider,
            wallet,
            contract,
        }
    }
}

#[async_trait]
impl<P: JsonRpcClient + Clone + 'static> WalletProvider for LocalKeyWallet<P> {
    fn name(&self) -> &str {
        "local key"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, DappError> {
        Ok(vec![self.wallet.address()])
    }

    async fn open_session(&self, account: Address) -> Result<Session, DappError> {
        if account != self.wallet.address() {
            return Err(DappError::UserRejected);
        }
        let chain_id = self.provider.get_chainid().await?;
        let signer = self.wallet.clone().with_chain_id(chain_id.as_u64());
        let client = Arc::new(SignerMiddleware::new(self.provider.clone(), signer));

        Ok(Session {
            account,
            ledger: Arc::new(RpcLedger::new(client.clone())),
            gateway: Arc::new(ContractGateway::new(self.contract, client)),
        })
    }
}

/// Lets the node sign for one of its unlocked accounts
pub struct NodeWallet<P = Http> {
    provider: Provider<P>,
    contract: Address,
}

impl<P: JsonRpcClient> NodeWallet<P> {
    pub fn new(provider: Provider<P>, contract: Address) -> Self {
        Self { provider, contract }
    }
}

#[async_trait]
impl<P: JsonRpcClient + Clone + 'static> WalletProvider for NodeWallet<P> {
    fn name(&self) -> &str {
        "node accounts"
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, DappError> {
        let requested: Result<Vec<Address>, ProviderError> =
            self.provider.request("eth_requestAccounts", ()).await;
        match requested {
            Ok(accounts) => Ok(accounts),
            Err(e)
                if e.as_error_response().map(|r| r.code) == Some(METHOD_NOT_FOUND_CODE) =>
            {
                debug!("(wallet) eth_requestAccounts unsupported, using eth_accounts");
                Ok(self.provider.get_accounts().await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn open_session(&self, account: Address) -> Result<Session, DappError> {
        let client = Arc::new(self.provider.clone().with_sender(account));
        Ok(Session {
            account,
            ledger: Arc::new(RpcLedger::new(client.clone())),
            gateway: Arc::new(ContractGateway::new(self.contract, client)),
        })
    }
}

/// Looks for a usable wallet: a configured private key first, then a node
/// answering on the configured endpoint.
///
/// `Ok(None)` means nothing was found. A private key that does not parse is
/// an error rather than an absent wallet.
pub async fn detect_provider(
    config: &Config,
) -> Result<Option<Arc<dyn WalletProvider>>, DappError> {
    let url = config.network.rpc_url.trim();
    if url.is_empty() {
        debug!("(wallet) no rpc endpoint configured");
        return Ok(None);
    }
    let provider = match Provider::<Http>::try_from(url) {
        Ok(p) => p.interval(Duration::from_millis(config.network.poll_interval_ms)),
        Err(e) => {
            warn!("(wallet) invalid rpc endpoint {:?}: {}", url, e);
            return Ok(None);
        }
    };

    if let Some(key) = config.wallet.private_key.as_deref() {
        let wallet = key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| DappError::InvalidInput(format!("invalid private key: {}", e)))?;
        return Ok(Some(Arc::new(LocalKeyWallet::new(
            provider,
            wallet,
            config.contract.address,
        ))));
    }

    match provider.get_chainid().await {
        Ok(chain_id) => {
            debug!("(wallet) node at {} reports chain id {}", url, chain_id);
            Ok(Some(Arc::new(NodeWallet::new(
                provider,
                config.contract.address,
            ))))
        }
        Err(e) => {
            debug!("(wallet) no node answering at {}: {}", url, e);
            Ok(None)
        }
    }
}

/// Entry point used by the controller to (re)connect
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Session, DappError>;
}

pub struct WalletConnector {
    config: Config,
}

impl WalletConnector {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for WalletConnector {
    async fn connect(&self) -> Result<Session, DappError> {
        let provider = detect_provider(&self.config).await?;
        connect(provider.as_deref()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{addr, FakeWallet};
    use ethers::{
        providers::{JsonRpcError, MockProvider, MockResponse},
        types::U256,
    };

    // anvil / hardhat account #0
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn rpc_error(code: i64, message: &str) -> MockResponse {
        MockResponse::Error(JsonRpcError {
            code,
            message: message.into(),
            data: None,
        })
    }

    fn node_wallet() -> (NodeWallet<MockProvider>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (NodeWallet::new(provider, addr(0xc0)), mock)
    }

    #[tokio::test]
    async fn no_provider_is_provider_absent() {
        let err = connect(None).await.unwrap_err();
        assert_eq!(err, DappError::ProviderAbsent);
        assert_eq!(
            err.to_string(),
            "Wallet provider not detected. Please install or configure a wallet."
        );
    }

    #[tokio::test]
    async fn empty_authorization_is_user_rejected() {
        let wallet = FakeWallet::new(vec![]);
        let err = connect(Some(&wallet)).await.unwrap_err();
        assert_eq!(err, DappError::UserRejected);
    }

    #[tokio::test]
    async fn declined_request_is_user_rejected() {
        let wallet = FakeWallet::rejecting();
        let err = connect(Some(&wallet)).await.unwrap_err();
        assert_eq!(err, DappError::UserRejected);
    }

    #[tokio::test]
    async fn first_account_is_used() {
        let wallet = FakeWallet::new(vec![addr(1), addr(2)]);
        let session = connect(Some(&wallet)).await.unwrap();
        assert_eq!(session.account, addr(1));
    }

    #[tokio::test]
    async fn node_declining_access_is_user_rejected() {
        let (wallet, mock) = node_wallet();
        mock.push_response(rpc_error(4001, "User rejected the request."));

        let err = connect(Some(&wallet)).await.unwrap_err();
        assert_eq!(err, DappError::UserRejected);
        assert_eq!(err.to_string(), "User denied wallet connection");
    }

    #[tokio::test]
    async fn node_without_request_accounts_falls_back() {
        let (wallet, mock) = node_wallet();
        // answered last to first
        mock.push::<Vec<Address>, _>(vec![addr(0xa), addr(0xb)])
            .unwrap();
        mock.push_response(rpc_error(-32601, "the method eth_requestAccounts does not exist"));

        let accounts = wallet.request_accounts().await.unwrap();
        assert_eq!(accounts, vec![addr(0xa), addr(0xb)]);
        let session = wallet.open_session(accounts[0]).await.unwrap();
        assert_eq!(session.account, addr(0xa));
    }

    #[tokio::test]
    async fn node_with_no_authorized_accounts_is_user_rejected() {
        let (wallet, mock) = node_wallet();
        mock.push::<Vec<Address>, _>(Vec::new()).unwrap();
        let err = connect(Some(&wallet)).await.unwrap_err();
        assert_eq!(err, DappError::UserRejected);
    }

    #[tokio::test]
    async fn node_failure_is_transport() {
        let (wallet, mock) = node_wallet();
        mock.push_response(rpc_error(-32000, "header not found"));
        match wallet.request_accounts().await {
            Err(DappError::Transport(msg)) => assert!(msg.contains("header not found")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn local_key_session_only_for_its_own_account() {
        let (provider, mock) = Provider::mocked();
        let wallet: LocalWallet = DEV_KEY.parse().unwrap();
        let own = wallet.address();
        let wallet = LocalKeyWallet::new(provider, wallet, addr(0xc0));

        assert_eq!(wallet.request_accounts().await.unwrap(), vec![own]);
        assert_eq!(
            wallet.open_session(addr(0xa)).await.unwrap_err(),
            DappError::UserRejected
        );

        mock.push::<U256, _>(U256::from(31337)).unwrap();
        let session = wallet.open_session(own).await.unwrap();
        assert_eq!(session.account, own);
    }

    #[tokio::test]
    async fn empty_endpoint_detects_nothing() {
        let mut config = Config::default();
        config.network.rpc_url = String::new();
        config.wallet.private_key = Some(DEV_KEY.into());
        assert!(detect_provider(&config).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn configured_key_is_detected_without_probing() {
        let mut config = Config::default();
        config.network.rpc_url = "http://127.0.0.1:1".into();
        config.wallet.private_key = Some(DEV_KEY.into());

        let provider = detect_provider(&config).await.unwrap().unwrap();
        assert_eq!(provider.name(), "local key");
        let accounts = provider.request_accounts().await.unwrap();
        assert_eq!(
            accounts,
            vec!["0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()]
        );
    }

    #[tokio::test]
    async fn bad_key_is_invalid_input() {
        let mut config = Config::default();
        config.wallet.private_key = Some("not a key".into());
        let res = detect_provider(&config).await;
        assert!(matches!(res, Err(DappError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn unreachable_node_is_provider_absent() {
        let mut config = Config::default();
        config.network.rpc_url = "http://127.0.0.1:1".into();
        let err = WalletConnector::new(config).connect().await.unwrap_err();
        assert_eq!(err, DappError::ProviderAbsent);
    }
}
