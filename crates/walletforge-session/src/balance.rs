//! Balance resolution: provider lookup, unit conversion and the guarded
//! write back into the store.

use std::sync::Arc;

use tokio::task::JoinHandle;
use walletforge_provider::{Address, ChainId, ProviderError, WalletProvider};

use crate::units::format_units;
use crate::{SessionConfig, SessionStore, WalletError};

/// How a balance refresh ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceOutcome {
    /// Nothing to resolve: the session isn't connected.
    Skipped,
    /// The resolved value was written to the store.
    Applied(String),
    /// A newer request or session change made this result stale; it was
    /// dropped.
    Superseded,
    /// The lookup failed. The store kept its previous value.
    Failed(WalletError),
}

/// Resolves the native balance of the connected account.
pub struct BalanceResolver<P> {
    store: Arc<SessionStore<P>>,
    provider: Arc<P>,
    config: Arc<SessionConfig>,
}

impl<P> Clone for BalanceResolver<P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            provider: Arc::clone(&self.provider),
            config: Arc::clone(&self.config),
        }
    }
}

impl<P: WalletProvider> BalanceResolver<P> {
    pub fn new(store: Arc<SessionStore<P>>, provider: Arc<P>, config: Arc<SessionConfig>) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// Looks up `account`'s balance and formats it with the chain's
    /// decimals. Does not touch the store.
    pub async fn resolve(&self, account: &Address, chain_id: ChainId) -> Result<String, WalletError> {
        let raw = self.provider.balance(account).await?;
        let decimals = self.config.networks.decimals(chain_id);
        format_units(&raw, decimals, self.config.balance_fraction_digits)
            .map_err(|e| WalletError::Transient(ProviderError::Malformed(e.to_string())))
    }

    /// Resolves the balance of the current account and writes it, unless
    /// something newer got there first.
    ///
    /// Failures are logged and swallowed; subscribers are notified either
    /// way so a UI can drop its loading state.
    pub async fn refresh(&self) -> BalanceOutcome {
        let Some(ticket) = self.store.issue_balance_ticket() else {
            return BalanceOutcome::Skipped;
        };
        let account = ticket.account();
        let chain_id = ticket.chain_id();

        match self.resolve(account, chain_id).await {
            Ok(value) => {
                if self.store.apply_balance(&ticket, &value) {
                    tracing::debug!(%account, %chain_id, balance = %value, "balance updated");
                    BalanceOutcome::Applied(value)
                } else {
                    tracing::debug!(%account, %chain_id, "stale balance discarded");
                    BalanceOutcome::Superseded
                }
            }
            Err(e) => {
                tracing::warn!(%account, %chain_id, error = %e, "balance lookup failed");
                if self.store.settle_balance(&ticket) {
                    BalanceOutcome::Failed(e)
                } else {
                    BalanceOutcome::Superseded
                }
            }
        }
    }

    /// Runs [`refresh`](Self::refresh) on its own task.
    pub fn spawn_refresh(&self) -> JoinHandle<BalanceOutcome> {
        let resolver = self.clone();
        tokio::spawn(async move { resolver.refresh().await })
    }
}
