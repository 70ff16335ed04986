//! A scripted, in-memory [`WalletProvider`] for tests and demos.
//!
//! [`FakeProvider`] plays the part of a browser wallet: it holds accounts,
//! a current chain, per-chain balances and a set of known networks, records
//! every call, and lets the caller push notifications at any moment.
//!
//! Individual calls can be held open with [`FakeProvider::hold`], which is
//! how tests stage races: the response is computed when the call arrives,
//! but not delivered until the returned [`Gate`] is released.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, Notify};

use crate::{
    Address, ChainDescriptor, ChainId, EventStream, ProviderError, ProviderEvent, WalletProvider,
};

/// Which provider capability a call used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    RequestAccounts,
    AuthorizedAccounts,
    ChainId,
    Balance,
    SwitchChain,
    AddChain,
}

/// One recorded call, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    RequestAccounts,
    AuthorizedAccounts,
    ChainId,
    Balance(Address),
    SwitchChain(ChainId),
    AddChain(ChainDescriptor),
}

impl ProviderCall {
    pub fn method(&self) -> Method {
        match self {
            Self::RequestAccounts => Method::RequestAccounts,
            Self::AuthorizedAccounts => Method::AuthorizedAccounts,
            Self::ChainId => Method::ChainId,
            Self::Balance(_) => Method::Balance,
            Self::SwitchChain(_) => Method::SwitchChain,
            Self::AddChain(_) => Method::AddChain,
        }
    }
}

/// Releases one held call.
#[derive(Debug, Clone)]
pub struct Gate(Arc<Notify>);

impl Gate {
    /// Lets the held call return. Releasing before the call arrives is
    /// fine; the call then returns immediately.
    pub fn release(&self) {
        self.0.notify_one();
    }
}

struct FakeState {
    /// Accounts the user approves when prompted.
    wallet_accounts: Vec<Address>,
    /// Accounts with a standing grant (what `authorized_accounts` returns).
    authorized: Vec<Address>,
    chain_id: ChainId,
    known_chains: BTreeSet<ChainId>,
    balances: HashMap<(ChainId, Address), String>,
    failures: HashMap<Method, ProviderError>,
    gates: VecDeque<(Method, Arc<Notify>)>,
    calls: Vec<ProviderCall>,
    subscribers: Vec<mpsc::UnboundedSender<ProviderEvent>>,
}

/// A scripted wallet.
pub struct FakeProvider {
    state: Mutex<FakeState>,
}

impl FakeProvider {
    /// A wallet on `chain_id` that knows only that chain and holds no
    /// accounts yet.
    pub fn new(chain_id: ChainId) -> Self {
        let state = FakeState {
            wallet_accounts: Vec::new(),
            authorized: Vec::new(),
            chain_id,
            known_chains: BTreeSet::from([chain_id]),
            balances: HashMap::new(),
            failures: HashMap::new(),
            gates: VecDeque::new(),
            calls: Vec::new(),
            subscribers: Vec::new(),
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Sets the accounts the user will approve on the next prompt.
    pub fn with_accounts<I, A>(self, accounts: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.lock().wallet_accounts = accounts.into_iter().map(Into::into).collect();
        self
    }

    /// Grants standing access, as if the user approved in an earlier visit.
    pub fn authorize<I, A>(&self, accounts: I)
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.lock().authorized = accounts.into_iter().map(Into::into).collect();
    }

    /// Sets the raw (smallest-unit) balance of `account` on `chain_id`.
    pub fn set_balance(&self, chain_id: ChainId, account: impl Into<Address>, raw: &str) {
        self.lock()
            .balances
            .insert((chain_id, account.into()), raw.to_string());
    }

    /// Adds a network to the wallet's known list.
    pub fn know_chain(&self, chain_id: ChainId) {
        self.lock().known_chains.insert(chain_id);
    }

    /// Makes every later call of `method` fail with `error`.
    pub fn fail(&self, method: Method, error: ProviderError) {
        self.lock().failures.insert(method, error);
    }

    pub fn clear_failure(&self, method: Method) {
        self.lock().failures.remove(&method);
    }

    /// Holds the next call of `method` open until the gate is released.
    ///
    /// Several holds on one method apply to successive calls, in order.
    pub fn hold(&self, method: Method) -> Gate {
        let notify = Arc::new(Notify::new());
        self.lock().gates.push_back((method, Arc::clone(&notify)));
        Gate(notify)
    }

    /// Pushes a notification to every live subscriber.
    pub fn emit(&self, event: ProviderEvent) {
        let mut state = self.lock();
        if let ProviderEvent::ChainChanged(chain_id) = event {
            state.chain_id = chain_id;
        }
        state.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    /// How many times `method` was called.
    pub fn calls_to(&self, method: Method) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.method() == method)
            .count()
    }

    /// Number of subscriptions whose receiver is still alive.
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }

    /// The chain the wallet is on right now.
    pub fn current_chain(&self) -> ChainId {
        self.lock().chain_id
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `call`, computes its response with `respond`, then waits on
    /// a matching gate (if any) before returning it.
    async fn handle<T>(
        &self,
        call: ProviderCall,
        respond: impl FnOnce(&mut FakeState) -> Result<T, ProviderError>,
    ) -> Result<T, ProviderError> {
        let method = call.method();
        let (result, gate) = {
            let mut state = self.lock();
            state.calls.push(call);
            let failure = state.failures.get(&method).cloned();
            let result = match failure {
                Some(err) => Err(err),
                None => respond(&mut *state),
            };
            let gate = state
                .gates
                .iter()
                .position(|(m, _)| *m == method)
                .and_then(|i| state.gates.remove(i))
                .map(|(_, notify)| notify);
            (result, gate)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        result
    }
}

impl WalletProvider for FakeProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.handle(ProviderCall::RequestAccounts, |state| {
            if state.wallet_accounts.is_empty() {
                return Err(ProviderError::UserRejected);
            }
            state.authorized = state.wallet_accounts.clone();
            Ok(state.wallet_accounts.clone())
        })
        .await
    }

    async fn authorized_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        self.handle(ProviderCall::AuthorizedAccounts, |state| {
            Ok(state.authorized.clone())
        })
        .await
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        self.handle(ProviderCall::ChainId, |state| Ok(state.chain_id))
            .await
    }

    async fn balance(&self, account: &Address) -> Result<String, ProviderError> {
        let key_account = account.clone();
        self.handle(ProviderCall::Balance(account.clone()), move |state| {
            Ok(state
                .balances
                .get(&(state.chain_id, key_account))
                .cloned()
                .unwrap_or_else(|| "0".to_string()))
        })
        .await
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), ProviderError> {
        self.handle(ProviderCall::SwitchChain(chain_id), |state| {
            if !state.known_chains.contains(&chain_id) {
                return Err(ProviderError::UnrecognizedChain(chain_id));
            }
            if state.chain_id != chain_id {
                state.chain_id = chain_id;
                let event = ProviderEvent::ChainChanged(chain_id);
                state.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
            }
            Ok(())
        })
        .await
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError> {
        let chain_id = descriptor.chain_id;
        self.handle(ProviderCall::AddChain(descriptor.clone()), |state| {
            state.known_chains.insert(chain_id);
            Ok(())
        })
        .await
    }

    fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn alice() -> Address {
        Address::new("0xA11CE00000000000000000000000000000000001")
    }

    #[tokio::test]
    async fn test_request_accounts_without_accounts_is_rejected() {
        let fake = FakeProvider::new(ChainId(1));

        assert_eq!(
            fake.request_accounts().await,
            Err(ProviderError::UserRejected)
        );
    }

    #[tokio::test]
    async fn test_request_accounts_grants_authorization() {
        let fake = FakeProvider::new(ChainId(1)).with_accounts([alice()]);

        assert!(fake.authorized_accounts().await.unwrap().is_empty());
        fake.request_accounts().await.unwrap();

        assert_eq!(fake.authorized_accounts().await.unwrap(), vec![alice()]);
    }

    #[tokio::test]
    async fn test_balance_is_chain_scoped() {
        let fake = FakeProvider::new(ChainId(1));
        fake.know_chain(ChainId(137));
        fake.set_balance(ChainId(1), alice(), "100");
        fake.set_balance(ChainId(137), alice(), "200");

        assert_eq!(fake.balance(&alice()).await.unwrap(), "100");
        fake.switch_chain(ChainId(137)).await.unwrap();
        assert_eq!(fake.balance(&alice()).await.unwrap(), "200");
    }

    #[tokio::test]
    async fn test_switch_chain_unknown_is_unrecognized() {
        let fake = FakeProvider::new(ChainId(1));

        assert_eq!(
            fake.switch_chain(ChainId(137)).await,
            Err(ProviderError::UnrecognizedChain(ChainId(137)))
        );
        assert_eq!(fake.current_chain(), ChainId(1));
    }

    #[tokio::test]
    async fn test_switch_chain_emits_chain_changed() {
        let fake = FakeProvider::new(ChainId(1));
        fake.know_chain(ChainId(5));
        let mut events = fake.subscribe();

        fake.switch_chain(ChainId(5)).await.unwrap();

        assert_eq!(
            events.recv().await,
            Some(ProviderEvent::ChainChanged(ChainId(5)))
        );
    }

    #[tokio::test]
    async fn test_fail_applies_until_cleared() {
        let fake = FakeProvider::new(ChainId(1));
        fake.fail(Method::ChainId, ProviderError::Disconnected);

        assert_eq!(fake.chain_id().await, Err(ProviderError::Disconnected));
        fake.clear_failure(Method::ChainId);
        assert_eq!(fake.chain_id().await, Ok(ChainId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_delays_only_the_next_call() {
        let fake = Arc::new(FakeProvider::new(ChainId(1)));
        let gate = fake.hold(Method::ChainId);

        let held = tokio::spawn({
            let fake = Arc::clone(&fake);
            async move { fake.chain_id().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!held.is_finished(), "held call should still be pending");

        // A second call is not held.
        assert_eq!(fake.chain_id().await, Ok(ChainId(1)));

        gate.release();
        assert_eq!(held.await.unwrap(), Ok(ChainId(1)));
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let fake = FakeProvider::new(ChainId(1));
        let events = fake.subscribe();
        assert_eq!(fake.subscriber_count(), 1);

        drop(events);

        assert_eq!(fake.subscriber_count(), 0);
        fake.emit(ProviderEvent::Disconnected);
    }

    #[tokio::test]
    async fn test_calls_are_recorded_in_order() {
        let fake = FakeProvider::new(ChainId(1)).with_accounts([alice()]);

        fake.request_accounts().await.unwrap();
        fake.chain_id().await.unwrap();
        fake.balance(&alice()).await.unwrap();

        assert_eq!(
            fake.calls(),
            vec![
                ProviderCall::RequestAccounts,
                ProviderCall::ChainId,
                ProviderCall::Balance(alice()),
            ]
        );
        assert_eq!(fake.calls_to(Method::Balance), 1);
    }
}
