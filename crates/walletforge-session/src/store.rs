//! The session store: single source of truth for the wallet session.
//!
//! The store never talks to the provider. It records outcomes and publishes
//! a fresh [`Session`] snapshot to subscribers after each transition.
//!
//! # Concurrency note
//!
//! Two writers race on the store: the connection controller (user actions)
//! and the event bridge (wallet notifications). Each transition runs under
//! one `std::sync::Mutex` and publishes its snapshot before releasing it, so
//! subscribers see transitions whole and in the order they were applied.
//! The lock is never held across an `.await`.
//!
//! Late results are handled with two counters rather than locks:
//!
//! - the **epoch** moves when a connect starts or the session is torn
//!   down; a connect result carrying an old epoch is dropped.
//! - the **balance sequence** moves on every balance request and every
//!   account/chain change; only the newest request may write.
//!
//! An account change reported while a connect is still `Connecting` has no
//! session to land on yet. The store keeps the newest such account and the
//! connect binds it in place of the one its prompt returned.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use walletforge_provider::{Address, ChainId};

use crate::session::ZERO_BALANCE;
use crate::units::is_decimal;
use crate::{Session, SessionHandles, SessionState};

/// Proof that a connect attempt started at a given epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectTicket {
    epoch: u64,
}

/// A balance request for one account on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceTicket {
    seq: u64,
    account: Address,
    chain_id: ChainId,
}

impl BalanceTicket {
    /// Account the balance is requested for.
    pub fn account(&self) -> &Address {
        &self.account
    }

    /// Chain the balance is requested on.
    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }
}

/// How a guarded connect ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectCompletion {
    /// The session moved on since the ticket was issued; nothing written.
    Stale,
    /// Already bound to this account and chain.
    Unchanged(Address),
    /// Bound to this account, which may differ from the requested one.
    Connected(Address),
}

impl ConnectCompletion {
    /// The bound account, unless the result was dropped.
    pub fn account(&self) -> Option<&Address> {
        match self {
            Self::Stale => None,
            Self::Unchanged(account) | Self::Connected(account) => Some(account),
        }
    }
}

struct StoreInner<P> {
    session: Session,
    handles: Option<SessionHandles<P>>,
    epoch: u64,
    balance_seq: u64,
    /// Newest account the wallet reported while `Connecting`.
    pending_account: Option<Address>,
}

impl<P> StoreInner<P> {
    /// Moves to `Connected`; returns `true` if account or chain changed.
    fn connect(&mut self, account: Address, chain_id: ChainId, handles: SessionHandles<P>) -> bool {
        let next = SessionState::Connected { account, chain_id };
        let changed = *self.session.state() != next;
        if changed {
            if !self.session.is_connected() {
                self.session = Session::disconnected();
            }
            self.session.set_state(next);
            self.session.mark_balance_stale();
            self.balance_seq += 1;
        }
        self.handles = Some(handles);
        changed
    }
}

/// Holds the one wallet session of an application instance.
///
/// Generic over the provider type `P` only because it owns the session's
/// provider/signer handles.
pub struct SessionStore<P> {
    inner: Mutex<StoreInner<P>>,
    snapshots: watch::Sender<Session>,
}

impl<P> SessionStore<P> {
    /// Creates a store holding a disconnected session.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                session: Session::disconnected(),
                handles: None,
                epoch: 0,
                balance_seq: 0,
                pending_account: None,
            }),
            snapshots: watch::Sender::new(Session::disconnected()),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Session {
        self.snapshots.borrow().clone()
    }

    /// Subscribes to snapshots. The receiver always holds the latest one.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.snapshots.subscribe()
    }

    /// Provider and signer handles, present only while connected.
    pub fn handles(&self) -> Option<SessionHandles<P>> {
        self.lock().handles.clone()
    }

    // -- Transitions --------------------------------------------------------

    /// Moves to `Connected` with `account` on `chain_id`, replacing whatever
    /// was there.
    pub fn set_connected(&self, account: Address, chain_id: ChainId, handles: SessionHandles<P>) {
        self.update(|inner| inner.connect(account, chain_id, handles));
    }

    /// Moves to `Disconnected`, dropping account, chain, balance and
    /// handles. Also invalidates every in-flight connect and balance
    /// request.
    ///
    /// Returns `true` if the session was not already disconnected.
    pub fn set_disconnected(&self) -> bool {
        self.update(|inner| {
            inner.epoch += 1;
            inner.balance_seq += 1;
            inner.handles = None;
            inner.pending_account = None;
            let changed = inner.session != Session::disconnected();
            inner.session = Session::disconnected();
            changed
        })
    }

    /// Updates the chain of a connected session. No-op otherwise.
    pub fn set_chain_id(&self, chain_id: ChainId) -> bool {
        self.update(|inner| {
            let SessionState::Connected { account, chain_id: current } = inner.session.state()
            else {
                return false;
            };
            if *current == chain_id {
                return false;
            }
            let account = account.clone();
            inner.session.set_state(SessionState::Connected { account, chain_id });
            inner.session.mark_balance_stale();
            inner.balance_seq += 1;
            true
        })
    }

    /// Switches the active account of a connected session. No-op otherwise.
    pub fn set_account(&self, account: Address) -> bool {
        self.update(|inner| {
            let SessionState::Connected { account: current, chain_id } = inner.session.state()
            else {
                return false;
            };
            if *current == account {
                return false;
            }
            let chain_id = *chain_id;
            inner.session.set_state(SessionState::Connected { account: account.clone(), chain_id });
            inner.session.mark_balance_stale();
            inner.balance_seq += 1;
            if let Some(handles) = inner.handles.as_mut() {
                *handles = SessionHandles::new(handles.provider.shared(), account);
            }
            true
        })
    }

    /// Remembers an account the wallet switched to while a connect is in
    /// flight, so the connect binds it instead of a stale one.
    ///
    /// Returns `false` (and records nothing) outside `Connecting`.
    pub fn note_connecting_account(&self, account: Address) -> bool {
        let mut inner = self.lock();
        if *inner.session.state() != SessionState::Connecting {
            return false;
        }
        inner.pending_account = Some(account);
        true
    }

    /// Overwrites the cached balance of a connected session.
    ///
    /// Anything that isn't a non-negative decimal is stored as `"0.0"`.
    /// Also supersedes in-flight balance requests.
    pub fn set_balance(&self, value: &str) -> bool {
        self.update(|inner| {
            if !inner.session.is_connected() {
                return false;
            }
            inner.balance_seq += 1;
            let before = inner.session.clone();
            inner.session.set_balance(normalize_balance(value));
            inner.session != before
        })
    }

    // -- Guarded connect ----------------------------------------------------

    /// Starts a connect attempt: bumps the epoch and, unless already
    /// connected, shows `Connecting`.
    pub fn begin_connect(&self) -> ConnectTicket {
        let mut epoch = 0;
        self.update(|inner| {
            inner.epoch += 1;
            inner.pending_account = None;
            epoch = inner.epoch;
            if inner.session.is_connected() {
                return false;
            }
            let changed = *inner.session.state() != SessionState::Connecting;
            inner.session = Session::connecting();
            changed
        });
        ConnectTicket { epoch }
    }

    /// A ticket for the current epoch without any visible transition.
    ///
    /// Used by the silent startup probe.
    pub fn connect_ticket(&self) -> ConnectTicket {
        ConnectTicket {
            epoch: self.lock().epoch,
        }
    }

    /// Finishes a connect attempt.
    ///
    /// Binds `account`, or the newest account the wallet reported while the
    /// attempt was in flight. Leaves the session alone and returns
    /// [`ConnectCompletion::Stale`] if anything moved the epoch since
    /// `ticket` was issued.
    pub fn complete_connect(
        &self,
        ticket: ConnectTicket,
        account: Address,
        chain_id: ChainId,
        provider: Arc<P>,
    ) -> ConnectCompletion {
        let mut completion = ConnectCompletion::Stale;
        self.update(|inner| {
            if inner.epoch != ticket.epoch {
                return false;
            }
            let account = inner.pending_account.take().unwrap_or(account);
            let handles = SessionHandles::new(provider, account.clone());
            let changed = inner.connect(account.clone(), chain_id, handles);
            completion = if changed {
                ConnectCompletion::Connected(account)
            } else {
                ConnectCompletion::Unchanged(account)
            };
            changed
        });
        completion
    }

    /// Abandons a failed connect attempt, returning to `Disconnected` if the
    /// attempt is still the current one.
    pub fn abort_connect(&self, ticket: ConnectTicket) -> bool {
        self.update(|inner| {
            if inner.epoch != ticket.epoch || *inner.session.state() != SessionState::Connecting {
                return false;
            }
            inner.pending_account = None;
            inner.session = Session::disconnected();
            true
        })
    }

    // -- Guarded balance ----------------------------------------------------

    /// Starts a balance request for the current account and chain.
    ///
    /// `None` when not connected. Issuing a ticket supersedes all earlier
    /// ones.
    pub fn issue_balance_ticket(&self) -> Option<BalanceTicket> {
        let mut inner = self.lock();
        let SessionState::Connected { account, chain_id } = inner.session.state() else {
            return None;
        };
        let (account, chain_id) = (account.clone(), *chain_id);
        inner.balance_seq += 1;
        Some(BalanceTicket {
            seq: inner.balance_seq,
            account,
            chain_id,
        })
    }

    /// Writes a resolved balance if `ticket` is still the newest request.
    ///
    /// Subscribers are notified even if the value didn't change.
    pub fn apply_balance(&self, ticket: &BalanceTicket, value: &str) -> bool {
        let mut inner = self.lock();
        if inner.balance_seq != ticket.seq || !inner.session.is_connected() {
            return false;
        }
        inner.session.set_balance(normalize_balance(value));
        self.snapshots.send_replace(inner.session.clone());
        true
    }

    /// Ends a failed balance request: the cached value stays, subscribers
    /// are still told the request is over.
    pub fn settle_balance(&self, ticket: &BalanceTicket) -> bool {
        let inner = self.lock();
        if inner.balance_seq != ticket.seq {
            return false;
        }
        self.snapshots.send_replace(inner.session.clone());
        true
    }

    // -- Internals ----------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, StoreInner<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the lock and publishes the snapshot if it reports a
    /// change.
    fn update(&self, f: impl FnOnce(&mut StoreInner<P>) -> bool) -> bool {
        let mut inner = self.lock();
        let changed = f(&mut inner);
        if changed {
            self.snapshots.send_replace(inner.session.clone());
        }
        changed
    }
}

impl<P> Default for SessionStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_balance(value: &str) -> String {
    let value = value.trim();
    if is_decimal(value) {
        value.to_string()
    } else {
        tracing::debug!(value, "unparseable balance, storing zero");
        ZERO_BALANCE.to_string()
    }
}

// =========================================================================
// Tests
// =========================================================================
