//! Wallet provider abstraction for Walletforge.
//!
//! Provides the [`WalletProvider`] trait: the capability set the session
//! layer needs from an injected wallet (account access, chain queries,
//! balances, chain switching, notifications).
//!
//! # Feature Flags
//!
//! - `eip1193` (default): [`Eip1193Provider`], an adapter over a raw
//!   JSON-RPC request function such as `window.ethereum.request`
//! - `fake`: [`fake::FakeProvider`], a scripted in-memory provider for
//!   tests and demos

#[cfg(feature = "eip1193")]
mod eip1193;
mod error;
mod event;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
mod types;

#[cfg(feature = "eip1193")]
pub use eip1193::{Eip1193Provider, RawEvent, RpcError, RpcTransport};
pub use error::{codes, ProviderError};
pub use event::{EventKind, EventStream, ProviderEvent};
pub use types::{Address, ChainDescriptor, ChainId};

use std::future::Future;

/// The capabilities an injected wallet provider exposes.
///
/// Every call is asynchronous and may suspend for as long as the user
/// leaves a wallet prompt open. None of them can be cancelled.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because the session layer shares one provider
/// across spawned tasks (balance refreshes, the event bridge).
pub trait WalletProvider: Send + Sync + 'static {
    /// Asks the user to expose their accounts. May open a prompt.
    ///
    /// Fails with [`ProviderError::UserRejected`] if the user declines.
    fn request_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<Address>, ProviderError>> + Send;

    /// Returns accounts already authorized for this application.
    ///
    /// Never prompts; an empty list means no standing grant.
    fn authorized_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<Address>, ProviderError>> + Send;

    /// The chain the wallet is currently on.
    fn chain_id(&self) -> impl Future<Output = Result<ChainId, ProviderError>> + Send;

    /// Native balance of `account` in the smallest unit, as a decimal
    /// integer string.
    fn balance(
        &self,
        account: &Address,
    ) -> impl Future<Output = Result<String, ProviderError>> + Send;

    /// Asks the wallet to switch networks.
    ///
    /// On success the wallet announces the new chain through a
    /// [`ProviderEvent::ChainChanged`] notification. Fails with
    /// [`ProviderError::UnrecognizedChain`] if the wallet doesn't know it.
    fn switch_chain(
        &self,
        chain_id: ChainId,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Asks the wallet to learn about a new network.
    fn add_chain(
        &self,
        descriptor: &ChainDescriptor,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Opens a notification stream carrying every [`ProviderEvent`] kind in
    /// arrival order.
    fn subscribe(&self) -> EventStream;
}
