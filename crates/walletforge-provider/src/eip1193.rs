//! EIP-1193 adapter: [`WalletProvider`] on top of a raw `request` function.
//!
//! Injected wallets expose a single `request({ method, params })` entry
//! point plus named events. [`RpcTransport`] is that surface; whatever
//! bridges to the wallet (a wasm binding, a test script) implements it and
//! [`Eip1193Provider`] does the method mapping and payload decoding.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::{
    codes, Address, ChainDescriptor, ChainId, EventKind, EventStream, ProviderError,
    ProviderEvent, WalletProvider,
};

/// An error object returned by a provider `request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Some wallets wrap the real code in `data.originalError.code`
    /// (notably 4902 on mobile). Prefer that one when present.
    fn effective_code(&self) -> i64 {
        self.data
            .as_ref()
            .and_then(|d| d.pointer("/originalError/code"))
            .and_then(Value::as_i64)
            .unwrap_or(self.code)
    }
}

impl From<RpcError> for ProviderError {
    fn from(err: RpcError) -> Self {
        ProviderError::from_code(err.effective_code(), err.message)
    }
}

/// A named event exactly as the wallet emitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub name: String,
    pub payload: Value,
}

/// The raw request/event surface of an injected wallet.
pub trait RpcTransport: Send + Sync + 'static {
    /// Performs one JSON-RPC request.
    fn request(
        &self,
        method: &str,
        params: Value,
    ) -> impl Future<Output = Result<Value, RpcError>> + Send;

    /// Opens a stream of every event the wallet emits, in order.
    fn events(&self) -> mpsc::UnboundedReceiver<RawEvent>;
}

/// `wallet_addEthereumChain` parameter (EIP-3085).
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddEthereumChainParameter<'a> {
    chain_id: String,
    chain_name: &'a str,
    rpc_urls: [&'a str; 1],
    native_currency: NativeCurrency<'a>,
}

#[derive(Serialize)]
struct NativeCurrency<'a> {
    name: &'a str,
    symbol: &'a str,
    decimals: u8,
}

impl<'a> From<&'a ChainDescriptor> for AddEthereumChainParameter<'a> {
    fn from(d: &'a ChainDescriptor) -> Self {
        Self {
            chain_id: d.chain_id.to_hex(),
            chain_name: &d.name,
            rpc_urls: [&d.rpc_url],
            native_currency: NativeCurrency {
                name: &d.native_currency_symbol,
                symbol: &d.native_currency_symbol,
                decimals: d.decimals,
            },
        }
    }
}

/// [`WalletProvider`] implementation for EIP-1193 wallets.
pub struct Eip1193Provider<T> {
    transport: T,
}

impl<T: RpcTransport> Eip1193Provider<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        tracing::trace!(method, "provider request");
        self.transport
            .request(method, params)
            .await
            .map_err(ProviderError::from)
    }
}

impl<T: RpcTransport> WalletProvider for Eip1193Provider<T> {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let value = self.call("eth_requestAccounts", json!([])).await?;
        decode_accounts(&value)
    }

    async fn authorized_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let value = self.call("eth_accounts", json!([])).await?;
        decode_accounts(&value)
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let value = self.call("eth_chainId", json!([])).await?;
        decode_chain_id(&value)
    }

    async fn balance(&self, account: &Address) -> Result<String, ProviderError> {
        let value = self
            .call("eth_getBalance", json!([account.as_str(), "latest"]))
            .await?;
        decode_quantity(&value)
    }

    async fn switch_chain(&self, chain_id: ChainId) -> Result<(), ProviderError> {
        let params = json!([{ "chainId": chain_id.to_hex() }]);
        match self
            .transport
            .request("wallet_switchEthereumChain", params)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.effective_code() == codes::UNRECOGNIZED_CHAIN => {
                Err(ProviderError::UnrecognizedChain(chain_id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn add_chain(&self, descriptor: &ChainDescriptor) -> Result<(), ProviderError> {
        let param = AddEthereumChainParameter::from(descriptor);
        self.call("wallet_addEthereumChain", json!([param])).await?;
        Ok(())
    }

    fn subscribe(&self) -> EventStream {
        let mut raw = self.transport.events();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                // Stop as soon as the subscriber is gone, not on the next event.
                let event = tokio::select! {
                    _ = tx.closed() => break,
                    event = raw.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                match decode_event(&event) {
                    Ok(Some(decoded)) => {
                        if tx.send(decoded).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(event = %event.name, error = %e, "dropping undecodable provider event");
                    }
                }
            }
            tracing::debug!("provider event decoder stopped");
        });
        rx
    }
}

/// Decodes a raw wallet event. `Ok(None)` for events we don't track.
pub(crate) fn decode_event(event: &RawEvent) -> Result<Option<ProviderEvent>, ProviderError> {
    let Some(kind) = EventKind::from_name(&event.name) else {
        return Ok(None);
    };
    let decoded = match kind {
        EventKind::AccountsChanged => ProviderEvent::AccountsChanged(decode_accounts(&event.payload)?),
        EventKind::ChainChanged => ProviderEvent::ChainChanged(decode_chain_id(&event.payload)?),
        EventKind::Disconnected => ProviderEvent::Disconnected,
    };
    Ok(Some(decoded))
}

fn decode_accounts(value: &Value) -> Result<Vec<Address>, ProviderError> {
    let items = value
        .as_array()
        .ok_or_else(|| ProviderError::Malformed(format!("expected account list, got {value}")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(Address::new)
                .ok_or_else(|| ProviderError::Malformed(format!("expected account string, got {item}")))
        })
        .collect()
}

fn decode_chain_id(value: &Value) -> Result<ChainId, ProviderError> {
    match value {
        Value::String(s) => ChainId::parse(s),
        Value::Number(n) => n
            .as_u64()
            .filter(|id| *id > 0)
            .map(ChainId)
            .ok_or_else(|| ProviderError::Malformed(format!("invalid chain id {n}"))),
        other => Err(ProviderError::Malformed(format!("expected chain id, got {other}"))),
    }
}

/// Decodes a quantity (`"0x22b1c8c1227a0000"`, or plain decimal) into a
/// decimal string. No width limit.
fn decode_quantity(value: &Value) -> Result<String, ProviderError> {
    const LIMB: u64 = 1_000_000_000;

    let raw = value
        .as_str()
        .ok_or_else(|| ProviderError::Malformed(format!("expected quantity, got {value}")))?;
    let invalid = || ProviderError::Malformed(format!("invalid quantity {raw:?}"));

    let Some(hex) = raw.strip_prefix("0x") else {
        if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let digits = raw.trim_start_matches('0');
        return Ok(if digits.is_empty() { "0" } else { digits }.to_string());
    };

    // Little-endian base-10^9 limbs.
    let mut limbs: Vec<u64> = Vec::new();
    for c in hex.chars() {
        let mut carry = u64::from(c.to_digit(16).ok_or_else(invalid)?);
        for limb in &mut limbs {
            let v = *limb * 16 + carry;
            *limb = v % LIMB;
            carry = v / LIMB;
        }
        if carry > 0 {
            limbs.push(carry);
        }
    }

    let Some((top, rest)) = limbs.split_last() else {
        return Ok("0".to_string());
    };
    let mut out = top.to_string();
    for limb in rest.iter().rev() {
        out.push_str(&format!("{limb:09}"));
    }
    Ok(out)
}
