//! Identity types shared by the provider boundary and the session layer.
//!
//! Accounts and chains are newtypes rather than bare `String`/`u64`, for the
//! same reason the rest of the workspace wraps its ids: a function taking
//! `(Address, ChainId)` cannot be called with the arguments swapped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProviderError;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// An account identifier exposed by the wallet provider.
///
/// The provider owns the format (for EVM wallets, a `0x`-prefixed 20-byte
/// hex string). We keep it opaque and compare it byte-for-byte; the provider
/// is expected to report the same casing every time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wraps a raw account string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the account as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form for compact display: `0x1234...abcd`.
    ///
    /// Addresses too short to abbreviate are returned unchanged.
    pub fn short(&self) -> String {
        let raw = self.0.as_str();
        let chars: Vec<char> = raw.chars().collect();
        if chars.len() <= 10 {
            return raw.to_string();
        }
        let head: String = chars[..6].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// ---------------------------------------------------------------------------
// ChainId
// ---------------------------------------------------------------------------

/// A network identifier (EIP-155 chain id).
///
/// Providers report chain ids as `0x`-prefixed hex quantities on the wire;
/// inside the workspace they are plain positive integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Parses a hex quantity such as `"0x89"`.
    ///
    /// A bare decimal string is accepted too; some providers emit one.
    /// Zero is rejected because no network uses it.
    pub fn parse(raw: &str) -> Result<Self, ProviderError> {
        let raw = raw.trim();
        let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => raw.parse::<u64>(),
        };
        match parsed {
            Ok(0) => Err(ProviderError::Malformed("chain id must be positive".into())),
            Ok(id) => Ok(Self(id)),
            Err(_) => Err(ProviderError::Malformed(format!("invalid chain id {raw:?}"))),
        }
    }

    /// Hex quantity encoding used by the provider RPC methods.
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ChainDescriptor
// ---------------------------------------------------------------------------

/// Metadata needed to ask a provider to add a network it doesn't know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainDescriptor {
    pub chain_id: ChainId,
    pub name: String,
    pub rpc_url: String,
    pub native_currency_symbol: String,
    pub decimals: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_short_abbreviates_long_address() {
        let addr = Address::new("0x71C7656EC7ab88b098defB751B7401B5f6d8976F");
        assert_eq!(addr.short(), "0x71C7...976F");
    }

    #[test]
    fn test_address_short_keeps_short_input() {
        assert_eq!(Address::new("0xabc").short(), "0xabc");
    }

    #[test]
    fn test_chain_id_parse_hex() {
        assert_eq!(ChainId::parse("0x89").unwrap(), ChainId(137));
        assert_eq!(ChainId::parse("0X1").unwrap(), ChainId(1));
    }

    #[test]
    fn test_chain_id_parse_decimal() {
        assert_eq!(ChainId::parse("80001").unwrap(), ChainId(80001));
    }

    #[test]
    fn test_chain_id_parse_zero_rejected() {
        assert!(matches!(
            ChainId::parse("0x0"),
            Err(ProviderError::Malformed(_))
        ));
    }

    #[test]
    fn test_chain_id_parse_garbage_rejected() {
        assert!(ChainId::parse("0xzz").is_err());
        assert!(ChainId::parse("").is_err());
    }

    #[test]
    fn test_chain_id_to_hex() {
        assert_eq!(ChainId(137).to_hex(), "0x89");
        assert_eq!(ChainId(1).to_hex(), "0x1");
    }
}
