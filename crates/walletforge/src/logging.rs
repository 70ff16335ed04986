//! Tracing setup for hosts that don't install their own subscriber.

use tracing_subscriber::EnvFilter;

use crate::WalletforgeError;

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_directive` (e.g.
/// `"walletforge=info"`) is used. Fails if a global subscriber is already
/// installed.
pub fn init(default_directive: &str) -> Result<(), WalletforgeError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| WalletforgeError::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| WalletforgeError::Logging(e.to_string()))
}
