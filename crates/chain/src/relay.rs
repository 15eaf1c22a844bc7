//! Relay (transaction service) client.
//!
//! Proposing a transaction to the relay service publishes it to the
//! multisig's transaction history UI and co-signers. It is advisory
//! metadata only; execution happens on-chain regardless.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Errors from relay service operations
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay transport error: {0}")]
    Transport(String),

    #[error("relay service rejected proposal: status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// The proposal payload the relay service expects.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionProposal {
    #[serde(skip)]
    pub safe: Address,
    pub to: Address,
    pub value: String,
    pub data: String,
    pub operation: u8,
    pub safe_tx_gas: String,
    pub base_gas: String,
    pub gas_price: String,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: String,
    /// The multisig-domain transaction hash
    pub contract_transaction_hash: B256,
    /// The proposing owner
    pub sender: Address,
    /// Hex-encoded 65-byte owner signature
    pub signature: String,
}

#[async_trait]
pub trait RelayService: Send + Sync {
    /// Propose a transaction to the service. Does not execute anything.
    async fn propose(&self, proposal: &TransactionProposal) -> Result<(), RelayError>;
}

/// HTTP client for the hosted relay service.
pub struct HttpRelayService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRelayService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RelayService for HttpRelayService {
    async fn propose(&self, proposal: &TransactionProposal) -> Result<(), RelayError> {
        let url = format!(
            "{}/api/v1/safes/{:#x}/multisig-transactions/",
            self.base_url.trim_end_matches('/'),
            proposal.safe
        );
        let response = self
            .client
            .post(&url)
            .json(proposal)
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!(
            safe = %proposal.safe,
            tx_hash = %proposal.contract_transaction_hash,
            "proposed transaction to relay service"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proposal_serializes_in_service_format() {
        let proposal = TransactionProposal {
            safe: "0x1111111111111111111111111111111111111111".parse().unwrap(),
            to: "0x2222222222222222222222222222222222222222".parse().unwrap(),
            value: "0".to_string(),
            data: "0x".to_string(),
            operation: 0,
            safe_tx_gas: "100000".to_string(),
            base_gas: "0".to_string(),
            gas_price: "0".to_string(),
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce: "7".to_string(),
            contract_transaction_hash: B256::repeat_byte(0xaa),
            sender: "0x3333333333333333333333333333333333333333".parse().unwrap(),
            signature: "0xdead".to_string(),
        };

        let json = serde_json::to_value(&proposal).unwrap();
        assert!(json.get("safe").is_none());
        assert_eq!(json["safeTxGas"], "100000");
        assert_eq!(json["refundReceiver"], "0x0000000000000000000000000000000000000000");
        assert_eq!(json["nonce"], "7");
        assert!(json["contractTransactionHash"]
            .as_str()
            .unwrap()
            .starts_with("0x"));
    }
}
