//! JSON-RPC [`ChainProvider`] implementation over HTTP.
//!
//! Transactions are signed locally with the agent's key as EIP-155 legacy
//! transactions and broadcast via `eth_sendRawTransaction`, so the endpoint
//! never needs an unlocked account.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Encodable, Header};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use verdict_crypto::Signer;

use crate::provider::{ChainProvider, ProviderError, TransactionReceipt};

/// The default public endpoint that rejects bursts of requests; callers
/// throttle before hitting it.
pub const RATE_LIMITED_ENDPOINT: &str = "https://rpc.gnosischain.com";

/// Delay applied before requests to [`RATE_LIMITED_ENDPOINT`].
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(1);

/// Sleep briefly when `url` is the known rate-limited public endpoint;
/// a no-op for every other endpoint.
pub async fn throttle_public_endpoint(url: &str) {
    if url.trim_end_matches('/') == RATE_LIMITED_ENDPOINT {
        tokio::time::sleep(RATE_LIMIT_DELAY).await;
    }
}

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const RECEIPT_POLL_ATTEMPTS: u32 = 60;

pub struct HttpProvider {
    url: String,
    client: reqwest::Client,
    signer: Arc<Signer>,
    request_id: AtomicU64,
    cached_chain_id: tokio::sync::OnceCell<u64>,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>, signer: Arc<Signer>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            signer,
            request_id: AtomicU64::new(1),
            cached_chain_id: tokio::sync::OnceCell::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, url = %self.url, "rpc request");
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        if let Some(error) = payload.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error");
            return Err(ProviderError::Rpc(format!("{method}: {message}")));
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| ProviderError::InvalidResponse(format!("{method}: missing result")))
    }

    async fn transaction_count(&self, address: Address) -> Result<u64, ProviderError> {
        let result = self
            .request(
                "eth_getTransactionCount",
                json!([format!("{address:#x}"), "pending"]),
            )
            .await?;
        parse_quantity_u64(&result)
    }

    async fn gas_price(&self) -> Result<U256, ProviderError> {
        let result = self.request("eth_gasPrice", json!([])).await?;
        parse_quantity_u256(&result)
    }

    async fn estimate_gas(
        &self,
        to: Address,
        value: U256,
        data: &Bytes,
    ) -> Result<u64, ProviderError> {
        let result = self
            .request(
                "eth_estimateGas",
                json!([{
                    "from": format!("{:#x}", self.signer.address()),
                    "to": format!("{to:#x}"),
                    "value": format!("{value:#x}"),
                    "data": format!("{data}"),
                }]),
            )
            .await?;
        parse_quantity_u64(&result)
    }
}

#[async_trait]
impl ChainProvider for HttpProvider {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.cached_chain_id
            .get_or_try_init(|| async {
                let result = self.request("eth_chainId", json!([])).await?;
                parse_quantity_u64(&result)
            })
            .await
            .copied()
    }

    async fn block_timestamp(&self) -> Result<u64, ProviderError> {
        let result = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        let timestamp = result
            .get("timestamp")
            .ok_or_else(|| ProviderError::InvalidResponse("block without timestamp".into()))?;
        parse_quantity_u64(timestamp)
    }

    async fn call(
        &self,
        from: Option<Address>,
        to: Address,
        data: Bytes,
    ) -> Result<Bytes, ProviderError> {
        let mut call = json!({
            "to": format!("{to:#x}"),
            "data": format!("{data}"),
        });
        if let Some(from) = from {
            call["from"] = json!(format!("{from:#x}"));
        }
        let result = self.request("eth_call", json!([call, "latest"])).await?;
        parse_hex_bytes(&result)
    }

    async fn send_transaction(
        &self,
        to: Address,
        value: U256,
        data: Bytes,
        gas: Option<u64>,
    ) -> Result<B256, ProviderError> {
        let chain_id = self.chain_id().await?;
        let nonce = self.transaction_count(self.signer.address()).await?;
        let gas_price = self.gas_price().await?;
        let gas = match gas {
            Some(gas) => gas,
            None => self.estimate_gas(to, value, &data).await?,
        };

        let signing_payload =
            rlp_legacy_tx(nonce, gas_price, gas, to, value, &data, chain_id, None);
        let digest = keccak256(&signing_payload);
        let signature = self
            .signer
            .sign_hash(digest)
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        // EIP-155 recovery encoding.
        let v = u64::from(signature.v) - 27 + 35 + 2 * chain_id;
        let raw = rlp_legacy_tx(
            nonce,
            gas_price,
            gas,
            to,
            value,
            &data,
            v,
            Some((signature.r, signature.s)),
        );

        let result = self
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(&raw))]),
            )
            .await?;
        parse_b256(&result)
    }

    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt, ProviderError> {
        for _ in 0..RECEIPT_POLL_ATTEMPTS {
            let result = self
                .request("eth_getTransactionReceipt", json!([format!("{tx_hash:#x}")]))
                .await?;
            if !result.is_null() {
                let block_number = result
                    .get("blockNumber")
                    .map(parse_quantity_u64)
                    .transpose()?
                    .unwrap_or_default();
                let gas_used = result
                    .get("gasUsed")
                    .map(parse_quantity_u64)
                    .transpose()?
                    .unwrap_or_default();
                let status = result
                    .get("status")
                    .map(parse_quantity_u64)
                    .transpose()?
                    .unwrap_or_default()
                    == 1;
                return Ok(TransactionReceipt {
                    tx_hash,
                    block_number,
                    gas_used,
                    status,
                });
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
        Err(ProviderError::ReceiptTimeout(tx_hash))
    }
}

/// RLP-encode a legacy transaction.
///
/// Without a signature the trailing items are `(chain_id, 0, 0)`, the
/// EIP-155 signing layout; with one they are `(v, r, s)` and `v_or_chain_id`
/// carries the recovery value.
#[allow(clippy::too_many_arguments)]
fn rlp_legacy_tx(
    nonce: u64,
    gas_price: U256,
    gas: u64,
    to: Address,
    value: U256,
    data: &Bytes,
    v_or_chain_id: u64,
    signature: Option<(B256, B256)>,
) -> Vec<u8> {
    let mut payload = Vec::new();
    nonce.encode(&mut payload);
    gas_price.encode(&mut payload);
    gas.encode(&mut payload);
    to.encode(&mut payload);
    value.encode(&mut payload);
    data.encode(&mut payload);
    v_or_chain_id.encode(&mut payload);
    match signature {
        Some((r, s)) => {
            U256::from_be_bytes(r.0).encode(&mut payload);
            U256::from_be_bytes(s.0).encode(&mut payload);
        }
        None => {
            0u64.encode(&mut payload);
            0u64.encode(&mut payload);
        }
    }

    let mut out = Vec::with_capacity(payload.len() + 4);
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut out);
    out.extend_from_slice(&payload);
    out
}

fn parse_quantity_u64(value: &Value) -> Result<u64, ProviderError> {
    let s = value
        .as_str()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("expected quantity, got {value}")))?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ProviderError::InvalidResponse(format!("bad quantity {s}: {e}")))
}

fn parse_quantity_u256(value: &Value) -> Result<U256, ProviderError> {
    let s = value
        .as_str()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("expected quantity, got {value}")))?;
    U256::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ProviderError::InvalidResponse(format!("bad quantity {s}: {e}")))
}

fn parse_hex_bytes(value: &Value) -> Result<Bytes, ProviderError> {
    let s = value
        .as_str()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("expected hex data, got {value}")))?;
    hex::decode(s.trim_start_matches("0x"))
        .map(Bytes::from)
        .map_err(|e| ProviderError::InvalidResponse(format!("bad hex data: {e}")))
}

fn parse_b256(value: &Value) -> Result<B256, ProviderError> {
    let s = value
        .as_str()
        .ok_or_else(|| ProviderError::InvalidResponse(format!("expected hash, got {value}")))?;
    s.parse()
        .map_err(|e| ProviderError::InvalidResponse(format!("bad hash {s}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_tx_rlp_is_a_well_formed_list() {
        let to: Address = "0x1111111111111111111111111111111111111111".parse().unwrap();
        let data = Bytes::from(vec![0xab; 10]);
        let unsigned = rlp_legacy_tx(
            1,
            U256::from(1_000_000_000u64),
            21_000,
            to,
            U256::ZERO,
            &data,
            100,
            None,
        );
        // First byte announces a list; a short one here.
        assert!(unsigned[0] >= 0xc0);

        let signed = rlp_legacy_tx(
            1,
            U256::from(1_000_000_000u64),
            21_000,
            to,
            U256::ZERO,
            &data,
            235,
            Some((B256::repeat_byte(0x11), B256::repeat_byte(0x22))),
        );
        assert!(signed.len() > unsigned.len());
    }

    #[test]
    fn quantity_parsing_handles_prefixes() {
        assert_eq!(parse_quantity_u64(&json!("0x1")).unwrap(), 1);
        assert_eq!(parse_quantity_u64(&json!("0xde")).unwrap(), 222);
        assert!(parse_quantity_u64(&json!(12)).is_err());
        assert!(parse_quantity_u64(&json!("0xzz")).is_err());
    }

    #[tokio::test]
    async fn throttle_is_noop_for_other_endpoints() {
        let started = std::time::Instant::now();
        throttle_public_endpoint("https://base.example/rpc").await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
