//! The connection controller: user-initiated session operations.
//!
//! Every operation talks to the provider, records the outcome in the
//! store, and turns failures into a [`Notice`] before returning them.
//! Nothing here panics or retries.

use std::sync::Arc;

use tokio::task::JoinHandle;
use walletforge_provider::{Address, ChainId, ProviderError, WalletProvider};

use crate::store::ConnectTicket;
use crate::{
    BalanceOutcome, BalanceResolver, ConnectCompletion, Notice, Notifier, SessionConfig,
    SessionStore, WalletError,
};

/// Drives connect, disconnect, network switching and balance refreshes.
///
/// Cheap to clone; clones share the store, provider and notifier.
pub struct ConnectionController<P, N> {
    store: Arc<SessionStore<P>>,
    provider: Option<Arc<P>>,
    notifier: Arc<N>,
    config: Arc<SessionConfig>,
}

impl<P, N> Clone for ConnectionController<P, N> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            provider: self.provider.clone(),
            notifier: Arc::clone(&self.notifier),
            config: Arc::clone(&self.config),
        }
    }
}

impl<P: WalletProvider, N: Notifier> ConnectionController<P, N> {
    /// `provider` is `None` when no wallet is injected; every operation
    /// then fails with [`WalletError::ProviderUnavailable`].
    pub fn new(
        store: Arc<SessionStore<P>>,
        provider: Option<Arc<P>>,
        notifier: Arc<N>,
        config: Arc<SessionConfig>,
    ) -> Self {
        Self {
            store,
            provider,
            notifier,
            config,
        }
    }

    /// The store this controller writes to.
    pub fn store(&self) -> &Arc<SessionStore<P>> {
        &self.store
    }

    /// The injected wallet, if any.
    pub fn provider(&self) -> Option<&Arc<P>> {
        self.provider.as_ref()
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Where user-facing notices go.
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// A resolver for the connected account's balance; `None` without a
    /// wallet.
    pub fn balance_resolver(&self) -> Option<BalanceResolver<P>> {
        let provider = self.provider.as_ref()?;
        Some(BalanceResolver::new(
            Arc::clone(&self.store),
            Arc::clone(provider),
            Arc::clone(&self.config),
        ))
    }

    // -- Connect ------------------------------------------------------------

    /// Asks the wallet for account access and binds the session to the
    /// first account.
    ///
    /// While already connected this only re-prompts the wallet: the
    /// session is left as it is and subscribers hear nothing.
    ///
    /// # Errors
    /// [`WalletError::ProviderUnavailable`] without a wallet,
    /// [`WalletError::UserRejected`] if the prompt is declined,
    /// [`WalletError::Superseded`] if a disconnect landed first, and
    /// [`WalletError::Transient`] for anything else.
    pub async fn connect(&self) -> Result<Address, WalletError> {
        let Some(provider) = self.provider.clone() else {
            return Err(self.fail(WalletError::ProviderUnavailable));
        };

        if self.store.snapshot().is_connected() {
            if let Err(e) = provider.request_accounts().await {
                return Err(self.fail(e.into()));
            }
            return self
                .store
                .snapshot()
                .account()
                .cloned()
                .ok_or(WalletError::Superseded);
        }

        let ticket = self.store.begin_connect();
        tracing::debug!("requesting wallet accounts");

        let approved = async {
            let account = first_account(provider.request_accounts().await?)?;
            let chain_id = provider.chain_id().await?;
            Ok::<_, ProviderError>((account, chain_id))
        }
        .await;

        match approved {
            Ok((account, chain_id)) => {
                self.finish_connect(ticket, &provider, account, chain_id)
                    .await
            }
            Err(e) => {
                self.store.abort_connect(ticket);
                Err(self.fail(e.into()))
            }
        }
    }

    /// Rebinds the session to an account the wallet already authorized,
    /// without prompting.
    ///
    /// Returns `Ok(None)` when there is no standing grant or no wallet.
    /// Failures are logged but not surfaced as notices; nobody asked for
    /// this.
    pub async fn resume(&self) -> Result<Option<Address>, WalletError> {
        let Some(provider) = self.provider.clone() else {
            return Ok(None);
        };
        let ticket = self.store.connect_ticket();

        let authorized = async {
            let Some(account) = provider.authorized_accounts().await?.into_iter().next() else {
                return Ok(None);
            };
            let chain_id = provider.chain_id().await?;
            Ok::<_, ProviderError>(Some((account, chain_id)))
        }
        .await;

        match authorized {
            Ok(Some((account, chain_id))) => self
                .finish_connect(ticket, &provider, account, chain_id)
                .await
                .map(Some),
            Ok(None) => {
                tracing::debug!("no standing wallet authorization");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "wallet probe failed");
                Err(e.into())
            }
        }
    }

    async fn finish_connect(
        &self,
        ticket: ConnectTicket,
        provider: &Arc<P>,
        account: Address,
        chain_id: ChainId,
    ) -> Result<Address, WalletError> {
        match self
            .store
            .complete_connect(ticket, account.clone(), chain_id, Arc::clone(provider))
        {
            ConnectCompletion::Stale => {
                tracing::debug!(%account, "connect result discarded, session moved on");
                Err(WalletError::Superseded)
            }
            ConnectCompletion::Unchanged(account) => {
                tracing::debug!(%account, %chain_id, "wallet already bound");
                Ok(account)
            }
            ConnectCompletion::Connected(bound) => {
                if bound != account {
                    tracing::info!(requested = %account, %bound, "wallet switched account during connect");
                }
                tracing::info!(account = %bound, %chain_id, "wallet connected");
                self.notifier
                    .notify(Notice::success("Wallet connected successfully!"));
                self.refresh_balance().await;
                Ok(bound)
            }
        }
    }

    // -- Disconnect ---------------------------------------------------------

    /// Forgets the session locally. The wallet keeps its grant.
    ///
    /// Returns `false` if the session was already disconnected, in which
    /// case no notice is shown.
    pub fn disconnect(&self) -> bool {
        if !self.store.set_disconnected() {
            return false;
        }
        tracing::info!("wallet disconnected");
        self.notifier.notify(Notice::info("Wallet disconnected"));
        true
    }

    // -- Network switching --------------------------------------------------

    /// Asks the wallet to move to `target`.
    ///
    /// Success changes nothing here; the wallet's chain-changed
    /// notification does. If the wallet doesn't know `target` and the
    /// registry does, the network is offered to the wallet once.
    pub async fn switch_network(&self, target: ChainId) -> Result<(), WalletError> {
        let Some(provider) = self.provider.clone() else {
            return Err(self.fail(WalletError::ProviderUnavailable));
        };

        match provider.switch_chain(target).await {
            Ok(()) => {
                tracing::info!(chain_id = %target, "network switch accepted");
                Ok(())
            }
            Err(ProviderError::UnrecognizedChain(_)) => self.add_network(&provider, target).await,
            Err(e) => {
                tracing::warn!(chain_id = %target, error = %e, "network switch failed");
                self.notifier.notify(Notice::error("Failed to switch network"));
                Err(e.into())
            }
        }
    }

    async fn add_network(&self, provider: &P, target: ChainId) -> Result<(), WalletError> {
        let Some(descriptor) = self.config.networks.descriptor(target) else {
            return Err(self.fail(WalletError::UnrecognizedChain(target)));
        };

        tracing::info!(chain_id = %target, name = %descriptor.name, "offering network to wallet");
        match provider.add_chain(&descriptor).await {
            Ok(()) => {
                self.notifier
                    .notify(Notice::success(format!("{} added to your wallet", descriptor.name)));
                Ok(())
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    // -- Balance ------------------------------------------------------------

    /// Re-resolves the balance of the connected account.
    pub async fn refresh_balance(&self) -> BalanceOutcome {
        match self.balance_resolver() {
            Some(resolver) => resolver.refresh().await,
            None => BalanceOutcome::Skipped,
        }
    }

    pub(crate) fn spawn_balance_refresh(&self) -> Option<JoinHandle<BalanceOutcome>> {
        self.balance_resolver().map(|r| r.spawn_refresh())
    }

    /// Logs `err`, shows its notice and hands it back.
    fn fail(&self, err: WalletError) -> WalletError {
        tracing::warn!(error = %err, "wallet operation failed");
        self.notifier.notify(err.notice());
        err
    }
}

fn first_account(accounts: Vec<Address>) -> Result<Address, ProviderError> {
    accounts
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Malformed("wallet returned no accounts".into()))
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;
    use walletforge_provider::fake::{FakeProvider, Method, ProviderCall};

    use super::*;
    use crate::{NoticeLevel, Phase};

    const ALICE: &str = "0xA11CE00000000000000000000000000000000001";

    type Controller = ConnectionController<FakeProvider, mpsc::UnboundedSender<Notice>>;

    fn controller(fake: FakeProvider) -> (Controller, Arc<FakeProvider>, mpsc::UnboundedReceiver<Notice>) {
        let fake = Arc::new(fake);
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = ConnectionController::new(
            Arc::new(SessionStore::new()),
            Some(Arc::clone(&fake)),
            Arc::new(tx),
            Arc::new(SessionConfig::default()),
        );
        (controller, fake, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(n) = rx.try_recv() {
            notices.push(n);
        }
        notices
    }

    #[tokio::test]
    async fn test_connect_without_provider_fails_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let controller: Controller = ConnectionController::new(
            Arc::new(SessionStore::new()),
            None,
            Arc::new(tx),
            Arc::new(SessionConfig::default()),
        );

        assert_eq!(controller.connect().await, Err(WalletError::ProviderUnavailable));
        assert_eq!(controller.store().snapshot().phase(), Phase::Disconnected);
        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        assert!(notices[0].message.contains("install"));
    }

    #[tokio::test]
    async fn test_connect_success_binds_first_account_and_balance() {
        let fake = FakeProvider::new(ChainId(137)).with_accounts([ALICE, "0x2"]);
        fake.set_balance(ChainId(137), ALICE, "2500000000000000000");
        let (controller, _fake, mut rx) = controller(fake);

        let account = controller.connect().await.unwrap();

        assert_eq!(account.as_str(), ALICE);
        let snap = controller.store().snapshot();
        assert_eq!(snap.chain_id(), Some(ChainId(137)));
        assert_eq!(snap.balance(), "2.5000");
        assert!(controller.store().handles().is_some());
        assert_eq!(drain(&mut rx), vec![Notice::success("Wallet connected successfully!")]);
    }

    #[tokio::test]
    async fn test_connect_rejected_returns_to_disconnected() {
        let (controller, _fake, mut rx) = controller(FakeProvider::new(ChainId(1)));

        assert_eq!(controller.connect().await, Err(WalletError::UserRejected));
        assert_eq!(controller.store().snapshot().phase(), Phase::Disconnected);
        assert_eq!(drain(&mut rx)[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_connect_chain_id_failure_is_transient() {
        let fake = FakeProvider::new(ChainId(1)).with_accounts([ALICE]);
        fake.fail(Method::ChainId, ProviderError::Disconnected);
        let (controller, _fake, _rx) = controller(fake);

        let err = controller.connect().await.unwrap_err();
        assert_eq!(err, WalletError::Transient(ProviderError::Disconnected));
        assert_eq!(controller.store().snapshot().phase(), Phase::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_while_connected_only_reprompts() {
        let fake = FakeProvider::new(ChainId(1)).with_accounts([ALICE]);
        let (controller, fake, mut rx) = controller(fake);
        controller.connect().await.unwrap();
        drain(&mut rx);
        let mut snapshots = controller.store().subscribe();

        assert_eq!(controller.connect().await.unwrap().as_str(), ALICE);

        assert_eq!(fake.calls_to(Method::RequestAccounts), 2);
        assert_eq!(fake.calls_to(Method::ChainId), 1);
        assert!(!snapshots.has_changed().unwrap());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_resume_with_grant_connects_without_prompt() {
        let fake = FakeProvider::new(ChainId(1));
        fake.authorize([ALICE]);
        let (controller, fake, _rx) = controller(fake);

        assert_eq!(controller.resume().await.unwrap(), Some(Address::new(ALICE)));
        assert_eq!(fake.calls_to(Method::RequestAccounts), 0);
        assert!(controller.store().snapshot().is_connected());
    }

    #[tokio::test]
    async fn test_resume_without_grant_stays_silent() {
        let (controller, _fake, mut rx) = controller(FakeProvider::new(ChainId(1)));

        assert_eq!(controller.resume().await.unwrap(), None);
        assert_eq!(controller.store().snapshot().phase(), Phase::Disconnected);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_resume_while_bound_is_silent() {
        let fake = FakeProvider::new(ChainId(1));
        fake.authorize([ALICE]);
        let (controller, fake, mut rx) = controller(fake);
        controller.resume().await.unwrap();
        drain(&mut rx);

        assert_eq!(controller.resume().await.unwrap(), Some(Address::new(ALICE)));

        assert!(drain(&mut rx).is_empty());
        assert_eq!(fake.calls_to(Method::Balance), 1);
    }

    #[tokio::test]
    async fn test_disconnect_twice_notifies_once() {
        let fake = FakeProvider::new(ChainId(1)).with_accounts([ALICE]);
        let (controller, _fake, mut rx) = controller(fake);
        controller.connect().await.unwrap();
        drain(&mut rx);

        assert!(controller.disconnect());
        assert!(!controller.disconnect());
        assert_eq!(drain(&mut rx), vec![Notice::info("Wallet disconnected")]);
        assert!(controller.store().handles().is_none());
    }

    #[tokio::test]
    async fn test_switch_network_success_leaves_state_alone() {
        let fake = FakeProvider::new(ChainId(1)).with_accounts([ALICE]);
        fake.know_chain(ChainId(5));
        let (controller, fake, _rx) = controller(fake);
        controller.connect().await.unwrap();

        controller.switch_network(ChainId(5)).await.unwrap();

        assert_eq!(fake.current_chain(), ChainId(5));
        assert_eq!(controller.store().snapshot().chain_id(), Some(ChainId(1)));
    }

    #[tokio::test]
    async fn test_switch_network_unknown_to_wallet_adds_registry_chain() {
        let (controller, fake, mut rx) = controller(FakeProvider::new(ChainId(1)));

        controller.switch_network(ChainId(137)).await.unwrap();

        let adds: Vec<_> = fake
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                ProviderCall::AddChain(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(adds.len(), 1);
        assert_eq!(adds[0].name, "Polygon");
        assert_eq!(adds[0].native_currency_symbol, "MATIC");
        assert_eq!(adds[0].decimals, 18);
        assert_eq!(drain(&mut rx)[0].level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn test_switch_network_unknown_everywhere_notifies() {
        let (controller, fake, mut rx) = controller(FakeProvider::new(ChainId(1)));

        let err = controller.switch_network(ChainId(42161)).await.unwrap_err();

        assert_eq!(err, WalletError::UnrecognizedChain(ChainId(42161)));
        assert_eq!(fake.calls_to(Method::AddChain), 0);
        assert_eq!(
            drain(&mut rx)[0].message,
            "Please add this network to your wallet first"
        );
    }

    #[tokio::test]
    async fn test_switch_network_other_failure_notifies() {
        let fake = FakeProvider::new(ChainId(1));
        fake.fail(Method::SwitchChain, ProviderError::UserRejected);
        let (controller, fake, mut rx) = controller(fake);

        let err = controller.switch_network(ChainId(137)).await.unwrap_err();

        assert_eq!(err, WalletError::UserRejected);
        assert_eq!(fake.calls_to(Method::AddChain), 0);
        assert_eq!(drain(&mut rx)[0].message, "Failed to switch network");
    }

    #[tokio::test]
    async fn test_refresh_balance_disconnected_is_skipped() {
        let (controller, fake, _rx) = controller(FakeProvider::new(ChainId(1)));

        assert_eq!(controller.refresh_balance().await, BalanceOutcome::Skipped);
        assert_eq!(fake.calls_to(Method::Balance), 0);
    }
}
