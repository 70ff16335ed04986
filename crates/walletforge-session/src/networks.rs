//! Static metadata for the networks the dashboard knows about.
//!
//! Used in two places: the add-chain fallback when a wallet doesn't know a
//! requested network, and display (name, currency symbol, explorer link).

use serde::{Deserialize, Serialize};
use walletforge_provider::{Address, ChainDescriptor, ChainId};

/// Native currency decimals assumed for chains missing from the registry.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Display name for chains missing from the registry.
pub const UNKNOWN_NETWORK: &str = "Unknown";

/// One known network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: String,
    pub currency_symbol: String,
    pub decimals: u8,
    pub explorer_url: String,
}

impl Network {
    fn new(chain_id: u64, name: &str, rpc_url: &str, currency_symbol: &str, explorer_url: &str) -> Self {
        Self {
            chain_id: ChainId(chain_id),
            name: name.to_string(),
            rpc_url: rpc_url.to_string(),
            currency_symbol: currency_symbol.to_string(),
            decimals: DEFAULT_DECIMALS,
            explorer_url: explorer_url.to_string(),
        }
    }

    /// The add-chain request body for this network.
    pub fn descriptor(&self) -> ChainDescriptor {
        ChainDescriptor {
            chain_id: self.chain_id,
            name: self.name.clone(),
            rpc_url: self.rpc_url.clone(),
            native_currency_symbol: self.currency_symbol.clone(),
            decimals: self.decimals,
        }
    }

    /// Block explorer page for `address`.
    pub fn explorer_address_url(&self, address: &Address) -> String {
        format!("{}/address/{}", self.explorer_url.trim_end_matches('/'), address)
    }
}

/// A lookup table of [`Network`]s keyed by chain id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkRegistry {
    networks: Vec<Network>,
}

impl NetworkRegistry {
    /// A registry of `networks`; later entries win on duplicate chain ids.
    pub fn new(networks: Vec<Network>) -> Self {
        let mut registry = Self::empty();
        for network in networks {
            registry.insert(network);
        }
        registry
    }

    /// A registry that knows nothing; every switch to an unknown chain then
    /// fails without offering it to the wallet.
    pub fn empty() -> Self {
        Self {
            networks: Vec::new(),
        }
    }

    /// Ethereum, Goerli, Polygon and Mumbai.
    pub fn known() -> Self {
        Self::new(vec![
            Network::new(1, "Ethereum", "https://cloudflare-eth.com", "ETH", "https://etherscan.io"),
            Network::new(5, "Goerli", "https://rpc.ankr.com/eth_goerli", "ETH", "https://goerli.etherscan.io"),
            Network::new(137, "Polygon", "https://polygon-rpc.com", "MATIC", "https://polygonscan.com"),
            Network::new(80001, "Mumbai", "https://rpc-mumbai.maticvigil.com", "MATIC", "https://mumbai.polygonscan.com"),
        ])
    }

    /// Adds `network`, replacing any entry with the same chain id.
    pub fn insert(&mut self, network: Network) {
        self.remove(network.chain_id);
        self.networks.push(network);
    }

    /// Drops the entry for `chain_id`, returning it.
    pub fn remove(&mut self, chain_id: ChainId) -> Option<Network> {
        let index = self.networks.iter().position(|n| n.chain_id == chain_id)?;
        Some(self.networks.remove(index))
    }

    /// The entry for `chain_id`, if listed.
    pub fn get(&self, chain_id: ChainId) -> Option<&Network> {
        self.networks.iter().find(|n| n.chain_id == chain_id)
    }

    /// What to send the wallet when offering `chain_id`.
    pub fn descriptor(&self, chain_id: ChainId) -> Option<ChainDescriptor> {
        self.get(chain_id).map(Network::descriptor)
    }

    /// Native currency decimals, [`DEFAULT_DECIMALS`] if unknown.
    pub fn decimals(&self, chain_id: ChainId) -> u8 {
        self.get(chain_id).map_or(DEFAULT_DECIMALS, |n| n.decimals)
    }

    /// Native currency symbol, `"ETH"` if unknown.
    pub fn currency_symbol(&self, chain_id: ChainId) -> &str {
        self.get(chain_id).map_or("ETH", |n| n.currency_symbol.as_str())
    }

    /// Display name, [`UNKNOWN_NETWORK`] if unknown.
    pub fn display_name(&self, chain_id: ChainId) -> &str {
        self.get(chain_id).map_or(UNKNOWN_NETWORK, |n| n.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Network> {
        self.networks.iter()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::known()
    }
}
