use crate::app::ActionKind;
use ethers::providers::{ProviderError, RpcError};
use thiserror::Error;

/// JSON-RPC code wallets use when the user declines a request (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DappError {
    #[error("Wallet provider not detected. Please install or configure a wallet.")]
    ProviderAbsent,
    #[error("User denied wallet connection")]
    UserRejected,
    /// Contract level rejection, with the revert reason when the node returned one
    #[error("{reason}")]
    RemoteExecution { reason: String },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{} is already in progress", .0.describe())]
    Busy(ActionKind),
}

impl DappError {
    pub fn remote(reason: impl Into<String>) -> Self {
        DappError::RemoteExecution {
            reason: reason.into(),
        }
    }

    /// Text shown in status lines and the overlay
    pub fn display_message(&self) -> String {
        format!("Error: {}", self)
    }
}

impl From<ProviderError> for DappError {
    fn from(err: ProviderError) -> Self {
        match err.as_error_response() {
            Some(resp) if resp.code == USER_REJECTED_CODE => DappError::UserRejected,
            _ => DappError::Transport(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::{JsonRpcError, MockError};

    #[test]
    fn display_message_prefixes_error() {
        let err = DappError::remote("insufficient balance");
        assert_eq!(err.display_message(), "Error: insufficient balance");

        let err = DappError::Busy(ActionKind::MineBlock);
        assert_eq!(
            err.display_message(),
            "Error: block mining is already in progress"
        );
    }

    #[test]
    fn declined_request_maps_to_user_rejected() {
        let declined = JsonRpcError {
            code: USER_REJECTED_CODE,
            message: "User rejected the request.".into(),
            data: None,
        };
        let err: DappError =
            ProviderError::JsonRpcClientError(Box::new(MockError::JsonRpcError(declined))).into();
        assert_eq!(err, DappError::UserRejected);
    }

    #[test]
    fn provider_error_maps_to_transport() {
        let err: DappError = ProviderError::CustomError("connection refused".into()).into();
        match err {
            DappError::Transport(msg) => assert!(msg.contains("connection refused")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
