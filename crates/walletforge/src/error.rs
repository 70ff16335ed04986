//! Unified error type for the Walletforge meta-crate.

use walletforge_provider::ProviderError;
use walletforge_session::WalletError;

/// Top-level error that wraps the sub-crate errors.
///
/// Hosts using the `walletforge` crate deal with this single type; the
/// `#[from]` conversions let `?` lift provider and session errors.
#[derive(Debug, thiserror::Error)]
pub enum WalletforgeError {
    /// A session operation failed (rejected, unavailable, superseded).
    #[error(transparent)]
    Wallet(#[from] WalletError),

    /// A provider value couldn't be decoded (e.g. a chain id).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The global tracing subscriber couldn't be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
