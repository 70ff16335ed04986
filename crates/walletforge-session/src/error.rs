//! Error types for the session layer.

use walletforge_provider::{ChainId, ProviderError};

use crate::Notice;

/// Errors a wallet session operation can end with.
///
/// None of these are fatal to the application. The controller logs each
/// one and turns it into a [`Notice`] before handing it back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    /// No injected provider is present.
    #[error("no wallet provider available")]
    ProviderUnavailable,

    /// The user declined a wallet prompt.
    #[error("request rejected in the wallet")]
    UserRejected,

    /// The wallet doesn't know the requested chain, and it couldn't be
    /// added.
    #[error("chain {0} is not recognized by the wallet")]
    UnrecognizedChain(ChainId),

    /// Any other provider failure (network hiccup, malformed response).
    #[error("wallet request failed: {0}")]
    Transient(#[source] ProviderError),

    /// The operation finished after a newer session change (a disconnect,
    /// another connect) and its result was dropped.
    #[error("superseded by a newer session change")]
    Superseded,
}

impl From<ProviderError> for WalletError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::UserRejected => Self::UserRejected,
            ProviderError::UnrecognizedChain(chain_id) => Self::UnrecognizedChain(chain_id),
            other => Self::Transient(other),
        }
    }
}

impl WalletError {
    /// The notice shown to the user for this error.
    pub fn notice(&self) -> Notice {
        match self {
            Self::ProviderUnavailable => {
                Notice::error("Please install MetaMask or another Web3 wallet")
            }
            Self::UserRejected => Notice::error("Request rejected in your wallet"),
            Self::UnrecognizedChain(_) => {
                Notice::error("Please add this network to your wallet first")
            }
            Self::Transient(err) => Notice::error(err.to_string()),
            Self::Superseded => Notice::info("Wallet request superseded"),
        }
    }
}
