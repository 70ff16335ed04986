//! # Walletforge
//!
//! Wallet connection and session management for dashboard applications.
//!
//! A dashboard holds one [`WalletSession`]: it connects to an injected
//! wallet, follows the wallet's account and network changes, and keeps a
//! formatted native balance, publishing a consistent snapshot after every
//! change.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use walletforge::prelude::*;
//!
//! // let wallet = WalletSessionBuilder::new()
//! //     .notifier(toast_sender)
//! //     .build(injected_provider);
//! // wallet.mount().await?;
//! // wallet.connect().await?;
//! // let mut updates = wallet.subscribe();
//! ```

mod error;
pub mod logging;
mod wallet;

pub use error::WalletforgeError;
pub use wallet::{WalletSession, WalletSessionBuilder};

/// Re-exports for hosts.
pub mod prelude {
    pub use crate::{WalletSession, WalletSessionBuilder, WalletforgeError};
    #[cfg(feature = "fake")]
    pub use walletforge_provider::fake::FakeProvider;
    #[cfg(feature = "eip1193")]
    pub use walletforge_provider::{Eip1193Provider, RawEvent, RpcError, RpcTransport};
    pub use walletforge_provider::{
        Address, ChainDescriptor, ChainId, ProviderError, ProviderEvent, WalletProvider,
    };
    pub use walletforge_session::{
        BalanceOutcome, ChainChangePolicy, Network, NetworkRegistry, Notice, NoticeLevel,
        Notifier, Phase, Session, SessionConfig, SessionState, TracingNotifier, WalletError,
        format_units,
    };
}
