//! `WalletSession` builder and facade.
//!
//! This is the entry point for a dashboard. It ties the layers together:
//! provider → session store → controller + event bridge.

use std::sync::Arc;

use tokio::sync::watch;
use walletforge_provider::{Address, ChainId, WalletProvider};
use walletforge_session::{
    BalanceOutcome, ChainChangePolicy, ConnectionController, EventBridge, Network, Notifier,
    Phase, Session, SessionConfig, SessionHandles, SessionStore, TracingNotifier, WalletError,
};

struct Inner<P, N> {
    controller: ConnectionController<P, N>,
    bridge: EventBridge<P, N>,
}

/// Builder for a [`WalletSession`].
///
/// # Example
///
/// ```rust,ignore
/// use walletforge::prelude::*;
///
/// let wallet = WalletSessionBuilder::new()
///     .chain_change(ChainChangePolicy::Reload)
///     .build(injected_provider);
/// wallet.mount().await?;
/// ```
pub struct WalletSessionBuilder<N = TracingNotifier> {
    config: SessionConfig,
    notifier: N,
}

impl WalletSessionBuilder<TracingNotifier> {
    /// A builder with default settings that logs notices.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            notifier: TracingNotifier,
        }
    }
}

impl Default for WalletSessionBuilder<TracingNotifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Notifier> WalletSessionBuilder<N> {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// How a wallet chain change is applied. Defaults to
    /// [`ChainChangePolicy::Refresh`].
    pub fn chain_change(mut self, policy: ChainChangePolicy) -> Self {
        self.config.chain_change = policy;
        self
    }

    /// Fraction digits kept in the formatted balance. Defaults to 4.
    pub fn balance_fraction_digits(mut self, digits: usize) -> Self {
        self.config.balance_fraction_digits = digits;
        self
    }

    /// Whether [`WalletSession::mount`] rebinds a standing grant. Defaults
    /// to `true`.
    pub fn probe_on_mount(mut self, probe: bool) -> Self {
        self.config.probe_on_mount = probe;
        self
    }

    /// Adds or replaces a network in the registry.
    pub fn network(mut self, network: Network) -> Self {
        self.config.networks.insert(network);
        self
    }

    /// Sends notices somewhere other than the log.
    pub fn notifier<M: Notifier>(self, notifier: M) -> WalletSessionBuilder<M> {
        WalletSessionBuilder {
            config: self.config,
            notifier,
        }
    }

    /// Builds the session around `provider`, or around nothing if no wallet
    /// is injected. Does not subscribe or probe; see
    /// [`WalletSession::mount`].
    pub fn build<P: WalletProvider>(self, provider: Option<P>) -> WalletSession<P, N> {
        tracing::debug!(
            provider = provider.is_some(),
            networks = self.config.networks.len(),
            "building wallet session"
        );
        let controller = ConnectionController::new(
            Arc::new(SessionStore::new()),
            provider.map(Arc::new),
            Arc::new(self.notifier),
            Arc::new(self.config),
        );
        let bridge = EventBridge::new(controller.clone());
        WalletSession {
            inner: Arc::new(Inner { controller, bridge }),
        }
    }
}

/// One application's wallet session.
///
/// Cheap to clone; clones share everything. Read the session through
/// [`snapshot`](Self::snapshot) or [`subscribe`](Self::subscribe), change
/// it through the operations.
pub struct WalletSession<P, N = TracingNotifier> {
    inner: Arc<Inner<P, N>>,
}

impl<P, N> Clone for WalletSession<P, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: WalletProvider> WalletSession<P> {
    /// A session with default settings.
    pub fn new(provider: Option<P>) -> Self {
        WalletSessionBuilder::new().build(provider)
    }
}

impl<P: WalletProvider, N: Notifier> WalletSession<P, N> {
    // -- Lifecycle ----------------------------------------------------------

    /// Starts following the wallet: subscribes to its notifications, then
    /// runs the passive probe (unless disabled).
    ///
    /// Safe to call more than once; later calls don't subscribe again.
    pub async fn mount(&self) -> Result<Option<Address>, WalletError> {
        self.inner.bridge.register();
        if !self.config().probe_on_mount {
            return Ok(None);
        }
        self.inner.bridge.probe().await
    }

    /// Stops following the wallet and drops the local session.
    pub fn unmount(&self) {
        self.inner.bridge.shutdown();
        self.store().set_disconnected();
        tracing::info!("wallet session unmounted");
    }

    /// `true` while the wallet subscription is live.
    pub fn is_mounted(&self) -> bool {
        self.inner.bridge.is_registered()
    }

    // -- Operations ---------------------------------------------------------

    /// Prompts the wallet for access and binds the first approved account.
    ///
    /// See [`ConnectionController::connect`] for the error cases.
    pub async fn connect(&self) -> Result<Address, WalletError> {
        self.inner.controller.connect().await
    }

    /// Drops the local session. Returns `false` if there was none.
    pub fn disconnect(&self) -> bool {
        self.inner.controller.disconnect()
    }

    /// Asks the wallet to move to `target`, offering it from the registry
    /// if the wallet doesn't know it. The session follows once the wallet
    /// reports the change.
    pub async fn switch_network(&self, target: ChainId) -> Result<(), WalletError> {
        self.inner.controller.switch_network(target).await
    }

    /// Re-reads the native balance of the connected account.
    pub async fn refresh_balance(&self) -> BalanceOutcome {
        self.inner.controller.refresh_balance().await
    }

    // -- Reads --------------------------------------------------------------

    /// The current session.
    pub fn snapshot(&self) -> Session {
        self.store().snapshot()
    }

    /// A receiver that is told about every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store().subscribe()
    }

    /// Connection phase of the current snapshot.
    pub fn phase(&self) -> Phase {
        self.snapshot().phase()
    }

    /// Active account, while connected.
    pub fn account(&self) -> Option<Address> {
        self.snapshot().account().cloned()
    }

    /// Active chain, while connected.
    pub fn chain_id(&self) -> Option<ChainId> {
        self.snapshot().chain_id()
    }

    /// Formatted native balance; `"0.0"` when disconnected.
    pub fn balance(&self) -> String {
        self.snapshot().balance().to_string()
    }

    /// Provider and signer handles, while connected.
    pub fn handles(&self) -> Option<SessionHandles<P>> {
        self.store().handles()
    }

    /// Settings the session was built with.
    pub fn config(&self) -> &SessionConfig {
        self.inner.controller.config()
    }

    /// The underlying controller, for hosts that need the provider or the
    /// store directly.
    pub fn controller(&self) -> &ConnectionController<P, N> {
        &self.inner.controller
    }

    /// Registry entry of the active chain, if connected to a known one.
    pub fn network(&self) -> Option<&Network> {
        let chain_id = self.chain_id()?;
        self.config().networks.get(chain_id)
    }

    /// Display name of the active chain; `"Unknown"` for unlisted chains.
    pub fn network_name(&self) -> Option<&str> {
        let chain_id = self.chain_id()?;
        Some(self.config().networks.display_name(chain_id))
    }

    /// Native currency symbol of the active chain.
    pub fn native_symbol(&self) -> Option<&str> {
        let chain_id = self.chain_id()?;
        Some(self.config().networks.currency_symbol(chain_id))
    }

    /// Block explorer page of the active account.
    pub fn explorer_url(&self) -> Option<String> {
        let snapshot = self.snapshot();
        let network = self.config().networks.get(snapshot.chain_id()?)?;
        Some(network.explorer_address_url(snapshot.account()?))
    }

    fn store(&self) -> &SessionStore<P> {
        self.inner.controller.store()
    }
}

#[cfg(test)]
mod tests {
    use walletforge_provider::fake::FakeProvider;

    use super::*;

    #[test]
    fn test_builder_applies_settings() {
        let wallet = WalletSessionBuilder::new()
            .chain_change(ChainChangePolicy::Reload)
            .balance_fraction_digits(2)
            .probe_on_mount(false)
            .build(Some(FakeProvider::new(ChainId(1))));

        let config = wallet.config();
        assert_eq!(config.chain_change, ChainChangePolicy::Reload);
        assert_eq!(config.balance_fraction_digits, 2);
        assert!(!config.probe_on_mount);
    }

    #[test]
    fn test_builder_network_replaces_entry() {
        let mut polygon = SessionConfig::default()
            .networks
            .get(ChainId(137))
            .cloned()
            .unwrap();
        polygon.name = "Polygon PoS".into();

        let wallet = WalletSessionBuilder::new()
            .network(polygon)
            .build(Some(FakeProvider::new(ChainId(1))));

        assert_eq!(wallet.config().networks.len(), 4);
        assert_eq!(wallet.config().networks.display_name(ChainId(137)), "Polygon PoS");
    }

    #[test]
    fn test_new_session_is_disconnected() {
        let wallet = WalletSession::new(Some(FakeProvider::new(ChainId(1))));

        assert_eq!(wallet.phase(), Phase::Disconnected);
        assert_eq!(wallet.balance(), "0.0");
        assert!(wallet.account().is_none());
        assert!(wallet.network().is_none());
        assert!(wallet.explorer_url().is_none());
    }
}
