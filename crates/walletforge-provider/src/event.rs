//! Unsolicited notifications pushed by the provider.

use std::fmt;

use tokio::sync::mpsc;

use crate::{Address, ChainId};

/// A notification the provider emits on its own, outside any request.
///
/// All kinds travel over one channel so their relative order survives;
/// an account switch followed by a disconnect must be applied in that order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// The set of exposed accounts changed. Empty means the wallet locked or
    /// revoked access.
    AccountsChanged(Vec<Address>),

    /// The wallet switched to another network.
    ChainChanged(ChainId),

    /// The provider lost its connection to every chain.
    Disconnected,
}

impl ProviderEvent {
    /// The event's kind, without its payload.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AccountsChanged(_) => EventKind::AccountsChanged,
            Self::ChainChanged(_) => EventKind::ChainChanged,
            Self::Disconnected => EventKind::Disconnected,
        }
    }
}

/// The three notification kinds the session layer listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    AccountsChanged,
    ChainChanged,
    Disconnected,
}

impl EventKind {
    /// Event name as emitted by EIP-1193 providers.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Disconnected => "disconnect",
        }
    }

    /// Looks up a kind by its EIP-1193 event name.
    ///
    /// Returns `None` for events the session layer ignores
    /// (`connect`, `message`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "accountsChanged" => Some(Self::AccountsChanged),
            "chainChanged" => Some(Self::ChainChanged),
            "disconnect" => Some(Self::Disconnected),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiving end of a provider subscription. Dropping it unsubscribes.
pub type EventStream = mpsc::UnboundedReceiver<ProviderEvent>;
