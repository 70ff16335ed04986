//! The provider event bridge: applies wallet notifications to the store.
//!
//! One subscription task per bridge. It drains a single event channel, so
//! account, chain and disconnect notifications are applied in exactly the
//! order the wallet sent them. Each event is applied in full before the
//! next one is read.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use walletforge_provider::{Address, ProviderEvent, WalletProvider};

use crate::{ChainChangePolicy, ConnectionController, Notifier, WalletError};

/// Keeps the session in step with the wallet.
pub struct EventBridge<P, N> {
    controller: ConnectionController<P, N>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<P: WalletProvider, N: Notifier> EventBridge<P, N> {
    /// A bridge writing through `controller`. Nothing is subscribed until
    /// [`register`](Self::register).
    pub fn new(controller: ConnectionController<P, N>) -> Self {
        Self {
            controller,
            task: Mutex::new(None),
        }
    }

    /// Subscribes to the wallet and starts applying its notifications.
    ///
    /// Returns `false` without doing anything if the subscription is
    /// already running or there is no wallet.
    pub fn register(&self) -> bool {
        let Some(provider) = self.controller.provider() else {
            tracing::debug!("no wallet provider, event bridge not registered");
            return false;
        };

        let mut task = self.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return false;
        }

        let mut events = provider.subscribe();
        let controller = self.controller.clone();
        *task = Some(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                apply_event(&controller, event).await;
            }
            tracing::debug!("provider event stream closed");
        }));

        tracing::info!("provider event bridge registered");
        true
    }

    /// Applies one notification directly, bypassing the subscription.
    pub async fn apply(&self, event: ProviderEvent) {
        apply_event(&self.controller, event).await;
    }

    /// The passive startup probe: rebinds to an already-authorized account
    /// without prompting.
    pub async fn probe(&self) -> Result<Option<Address>, WalletError> {
        self.controller.resume().await
    }

    /// `true` while the subscription task is running.
    pub fn is_registered(&self) -> bool {
        self.lock().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stops the subscription task. Dropping its receiver unsubscribes
    /// from the wallet.
    pub fn shutdown(&self) {
        if let Some(task) = self.lock().take() {
            task.abort();
            tracing::debug!("provider event bridge stopped");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P, N> Drop for EventBridge<P, N> {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = task.take() {
            task.abort();
        }
    }
}

async fn apply_event<P: WalletProvider, N: Notifier>(
    controller: &ConnectionController<P, N>,
    event: ProviderEvent,
) {
    let store = controller.store();
    tracing::debug!(kind = %event.kind(), "provider event");

    match event {
        ProviderEvent::AccountsChanged(accounts) => match accounts.into_iter().next() {
            // A session that never connected has nothing to announce.
            None if !store.snapshot().is_connected() => {
                store.set_disconnected();
            }
            None => {
                controller.disconnect();
            }
            Some(account) => {
                if store.set_account(account.clone()) {
                    tracing::info!(%account, "active account changed");
                    controller.spawn_balance_refresh();
                } else if store.note_connecting_account(account.clone()) {
                    tracing::debug!(%account, "account changed while connecting");
                }
            }
        },
        ProviderEvent::ChainChanged(chain_id) => match controller.config().chain_change {
            ChainChangePolicy::Refresh => {
                if store.set_chain_id(chain_id) {
                    tracing::info!(%chain_id, "chain changed");
                    controller.spawn_balance_refresh();
                }
            }
            ChainChangePolicy::Reload => {
                tracing::info!(%chain_id, "chain changed, reloading session");
                store.set_disconnected();
                if let Err(e) = controller.resume().await {
                    tracing::debug!(error = %e, "session reload did not reconnect");
                }
            }
        },
        ProviderEvent::Disconnected => {
            controller.disconnect();
        }
    }
}
