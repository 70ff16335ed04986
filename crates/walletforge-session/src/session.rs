//! Session types: the application's record of its wallet binding.
//!
//! A session answers three questions for every panel in the dashboard:
//! - WHICH account is active, and on WHICH chain
//! - WHAT phase the connection is in
//! - HOW MUCH native currency the account holds (best effort)

use std::fmt;
use std::sync::Arc;

use walletforge_provider::{Address, ChainId};

/// Balance shown while nothing has been resolved.
pub const ZERO_BALANCE: &str = "0.0";

// ---------------------------------------------------------------------------
// Phase / SessionState
// ---------------------------------------------------------------------------

/// Connection phase, without the connected payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No account is bound.
    Disconnected,
    /// A connect prompt is open in the wallet.
    Connecting,
    /// An account is bound on a known chain.
    Connected,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// The connection state machine.
///
/// ```text
///   Disconnected ──(connect)──→ Connecting ──(approved)──→ Connected
///        ↑                          │                          │
///        └───────(rejected)─────────┘                          │
///        └────────(disconnect / empty accounts / provider drop)┘
/// ```
///
/// Account and chain live inside `Connected`, so a session can never have
/// one without the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No account is bound.
    Disconnected,
    /// Waiting on the wallet prompt.
    Connecting,
    /// Bound to `account` on `chain_id`.
    Connected {
        /// The active account.
        account: Address,
        /// The chain the wallet last reported.
        chain_id: ChainId,
    },
}

impl SessionState {
    /// The phase, without the payload.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Disconnected => Phase::Disconnected,
            Self::Connecting => Phase::Connecting,
            Self::Connected { .. } => Phase::Connected,
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A consistent snapshot of the wallet session.
///
/// Snapshots are immutable values; the store publishes a new one after
/// every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Phase plus account and chain.
    state: SessionState,
    /// Formatted native balance of the active account.
    balance: String,
    /// Set when account or chain changed and no balance has landed since.
    balance_stale: bool,
}

impl Session {
    /// The initial, disconnected session.
    pub fn disconnected() -> Self {
        Self {
            state: SessionState::Disconnected,
            balance: ZERO_BALANCE.to_string(),
            balance_stale: false,
        }
    }

    pub(crate) fn connecting() -> Self {
        Self {
            state: SessionState::Connecting,
            ..Self::disconnected()
        }
    }

    /// The full state, payload included.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Connection phase.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// `true` in the `Connected` phase.
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected { .. })
    }

    /// The active account; `None` unless connected.
    pub fn account(&self) -> Option<&Address> {
        match &self.state {
            SessionState::Connected { account, .. } => Some(account),
            _ => None,
        }
    }

    /// The active chain; `None` unless connected.
    pub fn chain_id(&self) -> Option<ChainId> {
        match &self.state {
            SessionState::Connected { chain_id, .. } => Some(*chain_id),
            _ => None,
        }
    }

    /// Cached native balance as a decimal string.
    pub fn balance(&self) -> &str {
        &self.balance
    }

    /// `true` when the account or chain changed since the balance was last
    /// resolved.
    pub fn balance_is_stale(&self) -> bool {
        self.balance_stale
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub(crate) fn set_balance(&mut self, balance: String) {
        self.balance = balance;
        self.balance_stale = false;
    }

    pub(crate) fn mark_balance_stale(&mut self) {
        self.balance_stale = true;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::disconnected()
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Capability to talk to the provider on behalf of the session.
pub struct ProviderHandle<P>(Arc<P>);

impl<P> ProviderHandle<P> {
    /// The provider itself.
    pub fn get(&self) -> &P {
        &self.0
    }

    pub(crate) fn shared(&self) -> Arc<P> {
        Arc::clone(&self.0)
    }
}

impl<P> Clone for ProviderHandle<P> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Capability to act as the connected account (the thing a signing
/// request would go through).
pub struct SignerHandle<P> {
    provider: Arc<P>,
    address: Address,
}

impl<P> SignerHandle<P> {
    /// Account the signer acts as.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Provider that would carry the signing request.
    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P> Clone for SignerHandle<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            address: self.address.clone(),
        }
    }
}

/// Provider and signer handles; present only while connected.
pub struct SessionHandles<P> {
    pub provider: ProviderHandle<P>,
    pub signer: SignerHandle<P>,
}

impl<P> SessionHandles<P> {
    pub fn new(provider: Arc<P>, address: Address) -> Self {
        Self {
            signer: SignerHandle {
                provider: Arc::clone(&provider),
                address,
            },
            provider: ProviderHandle(provider),
        }
    }
}

impl<P> Clone for SessionHandles<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            signer: self.signer.clone(),
        }
    }
}

impl<P> fmt::Debug for SessionHandles<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandles")
            .field("signer", &self.signer.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_session_has_no_account_or_chain() {
        let s = Session::disconnected();
        assert_eq!(s.phase(), Phase::Disconnected);
        assert!(s.account().is_none());
        assert!(s.chain_id().is_none());
        assert_eq!(s.balance(), ZERO_BALANCE);
        assert!(!s.balance_is_stale());
    }

    #[test]
    fn test_connected_session_exposes_account_and_chain() {
        let mut s = Session::disconnected();
        s.set_state(SessionState::Connected {
            account: Address::new("0xabc"),
            chain_id: ChainId(137),
        });
        assert!(s.is_connected());
        assert_eq!(s.account(), Some(&Address::new("0xabc")));
        assert_eq!(s.chain_id(), Some(ChainId(137)));
    }

    #[test]
    fn test_set_balance_clears_staleness() {
        let mut s = Session::disconnected();
        s.mark_balance_stale();
        assert!(s.balance_is_stale());
        s.set_balance("1.0000".into());
        assert!(!s.balance_is_stale());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Connecting.to_string(), "Connecting");
    }

    #[test]
    fn test_handles_share_provider() {
        let handles = SessionHandles::new(Arc::new(7u8), Address::new("0xabc"));
        assert_eq!(*handles.provider.get(), 7);
        assert_eq!(*handles.signer.provider(), 7);
        assert_eq!(handles.signer.address().as_str(), "0xabc");
    }
}
