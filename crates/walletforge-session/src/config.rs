//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::NetworkRegistry;

/// How the bridge reacts when the wallet switches chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainChangePolicy {
    /// Update the chain in place, flag the balance stale and re-resolve it.
    #[default]
    Refresh,

    /// Tear the session down and run the passive probe again, the way a
    /// page reload would.
    Reload,
}

/// Configuration for a wallet session.
///
/// Every field has a default, so a host only overrides what it cares
/// about, in code or in its own config file:
///
/// ```
/// use walletforge_session::{ChainChangePolicy, SessionConfig};
///
/// let config = SessionConfig {
///     chain_change: ChainChangePolicy::Reload,
///     ..SessionConfig::default()
/// };
/// assert_eq!(config.balance_fraction_digits, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Fractional digits kept when formatting balances. Default: 4.
    pub balance_fraction_digits: usize,

    /// Reaction to chain-changed notifications. Default: refresh.
    pub chain_change: ChainChangePolicy,

    /// Whether mounting runs the passive probe. Default: true.
    pub probe_on_mount: bool,

    /// Networks available for display and the add-chain fallback.
    pub networks: NetworkRegistry,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            balance_fraction_digits: 4,
            chain_change: ChainChangePolicy::default(),
            probe_on_mount: true,
            networks: NetworkRegistry::known(),
        }
    }
}

#[cfg(test)]
mod tests {
    use walletforge_provider::ChainId;

    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.balance_fraction_digits, 4);
        assert_eq!(config.chain_change, ChainChangePolicy::Refresh);
        assert!(config.probe_on_mount);
        assert_eq!(config.networks.len(), 4);
    }

    #[test]
    fn test_session_config_partial_json_keeps_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "chain_change": "reload" }"#).unwrap();
        assert_eq!(config.chain_change, ChainChangePolicy::Reload);
        assert_eq!(config.balance_fraction_digits, 4);
        assert!(config.networks.get(ChainId(137)).is_some());
    }

    #[test]
    fn test_session_config_custom_networks_from_json() {
        let config: SessionConfig = serde_json::from_str(
            r#"{
                "networks": [{
                    "chain_id": 10,
                    "name": "Optimism",
                    "rpc_url": "https://mainnet.optimism.io",
                    "currency_symbol": "ETH",
                    "decimals": 18,
                    "explorer_url": "https://optimistic.etherscan.io"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(config.networks.len(), 1);
        assert_eq!(config.networks.display_name(ChainId(10)), "Optimism");
    }
}
