//! Wallet session management for Walletforge.
//!
//! This crate owns the application's single wallet session and keeps it
//! consistent while two writers race on it:
//!
//! 1. **User actions**: connect, disconnect, switch network, refresh the
//!    balance ([`ConnectionController`])
//! 2. **Wallet notifications**: account, chain and disconnect events
//!    ([`EventBridge`])
//!
//! Both write through the [`SessionStore`], which publishes whole
//! [`Session`] snapshots and drops results that arrive after a newer
//! change.
//!
//! # How it fits in the stack
//!
//! ```text
//! Dashboard (above)  ← reads snapshots, calls controller operations
//!     ↕
//! Session Layer (this crate)  ← session state, connect flow, event bridge
//!     ↕
//! Provider Layer (below)  ← WalletProvider trait, Address, ChainId
//! ```

mod balance;
mod bridge;
mod config;
mod controller;
mod error;
mod networks;
mod notice;
mod session;
mod store;
mod units;

pub use balance::{BalanceOutcome, BalanceResolver};
pub use bridge::EventBridge;
pub use config::{ChainChangePolicy, SessionConfig};
pub use controller::ConnectionController;
pub use error::WalletError;
pub use networks::{Network, NetworkRegistry, DEFAULT_DECIMALS, UNKNOWN_NETWORK};
pub use notice::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use session::{
    Phase, ProviderHandle, Session, SessionHandles, SessionState, SignerHandle, ZERO_BALANCE,
};
pub use store::{BalanceTicket, ConnectCompletion, ConnectTicket, SessionStore};
pub use units::{format_units, is_decimal, UnitsError};
