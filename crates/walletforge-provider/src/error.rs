//! Error types for the provider boundary.

use crate::ChainId;

/// EIP-1193 / EIP-3326 error codes a provider may return.
pub mod codes {
    pub const USER_REJECTED: i64 = 4001;
    pub const UNAUTHORIZED: i64 = 4100;
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    pub const DISCONNECTED: i64 = 4900;
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
}

/// Errors a wallet provider call can fail with.
///
/// `Clone` so scripted providers can hand out the same failure more than
/// once; the underlying RPC error is flattened to its code and message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The user declined the prompt in the wallet UI.
    #[error("user rejected the request")]
    UserRejected,

    /// The requested method or account has not been authorized.
    #[error("request not authorized by the wallet")]
    Unauthorized,

    /// The provider is not connected to any chain.
    #[error("provider is disconnected")]
    Disconnected,

    /// The provider doesn't know the requested chain and must be told
    /// about it with an add-chain request first.
    #[error("chain {0} is not recognized by the wallet")]
    UnrecognizedChain(ChainId),

    /// Any other RPC failure.
    #[error("provider error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// The provider answered, but not with something we can interpret.
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Classifies a raw RPC error code.
    ///
    /// `UNRECOGNIZED_CHAIN` is only meaningful next to the chain that was
    /// requested, so it is mapped by the switch-chain call itself and falls
    /// through to [`ProviderError::Rpc`] here.
    pub fn from_code(code: i64, message: impl Into<String>) -> Self {
        match code {
            codes::USER_REJECTED => Self::UserRejected,
            codes::UNAUTHORIZED => Self::Unauthorized,
            codes::DISCONNECTED | codes::CHAIN_DISCONNECTED => Self::Disconnected,
            _ => Self::Rpc {
                code,
                message: message.into(),
            },
        }
    }
}
