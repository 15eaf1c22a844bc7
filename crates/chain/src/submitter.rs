//! Multisig transaction submission.
//!
//! One submission attempt runs build → owner-sign → propose → simulate →
//! execute → confirm, strictly in that order. The simulation gate means a
//! call that would revert is caught by a read-only `eth_call` before any
//! state-changing transaction is broadcast.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use verdict_config::{Chain, Settings};
use verdict_crypto::safe::{multisig_tx_hash, MultisigTxParams};
use verdict_crypto::Signer;

use crate::multisig::{
    decode_nonce, nonce_calldata, BuiltMultisigTransaction, MultisigTransactionRequest,
};
use crate::provider::ChainProvider;
use crate::relay::{HttpRelayService, RelayService, TransactionProposal};
use crate::rpc::{throttle_public_endpoint, HttpProvider};
use crate::{SubmissionError, SubmissionResult};

/// Conservative fixed gas allowance for the inner multisig call, avoiding
/// estimation-related execution failures.
pub const INTERNAL_GAS_ALLOWANCE: u64 = 100_000;

/// Per-chain access to a provider and a relay service.
///
/// Implementations own the connection cache; the submitter never creates
/// network clients itself.
#[async_trait]
pub trait ChainConnections: Send + Sync {
    async fn provider(&self, chain: Chain) -> SubmissionResult<Arc<dyn ChainProvider>>;

    fn relay(&self, chain: Chain) -> SubmissionResult<Arc<dyn RelayService>>;
}

/// Production [`ChainConnections`]: lazily created HTTP clients, cached per
/// chain for the process lifetime.
pub struct HttpConnections {
    settings: Arc<Settings>,
    signer: Arc<Signer>,
    providers: Mutex<HashMap<Chain, Arc<HttpProvider>>>,
    relays: Mutex<HashMap<Chain, Arc<HttpRelayService>>>,
}

impl HttpConnections {
    pub fn new(settings: Arc<Settings>, signer: Arc<Signer>) -> Self {
        Self {
            settings,
            signer,
            providers: Mutex::new(HashMap::new()),
            relays: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ChainConnections for HttpConnections {
    async fn provider(&self, chain: Chain) -> SubmissionResult<Arc<dyn ChainProvider>> {
        let mut providers = self.providers.lock().await;
        if let Some(provider) = providers.get(&chain) {
            return Ok(provider.clone());
        }
        let url = self
            .settings
            .rpc_endpoint(chain)
            .ok_or_else(|| {
                SubmissionError::Config(format!("no RPC endpoint configured for chain: {chain}"))
            })?
            .to_string();
        throttle_public_endpoint(&url).await;
        let provider = Arc::new(HttpProvider::new(url, self.signer.clone()));
        providers.insert(chain, provider.clone());
        Ok(provider)
    }

    fn relay(&self, chain: Chain) -> SubmissionResult<Arc<dyn RelayService>> {
        let mut relays = self
            .relays
            .try_lock()
            .map_err(|_| SubmissionError::Network("relay cache contended".to_string()))?;
        if let Some(relay) = relays.get(&chain) {
            return Ok(relay.clone());
        }
        let url = self.settings.relay_url(chain).ok_or_else(|| {
            SubmissionError::Config(format!("no relay service known for chain: {chain}"))
        })?;
        let relay = Arc::new(HttpRelayService::new(url));
        relays.insert(chain, relay.clone());
        Ok(relay)
    }
}

/// Result of a successful on-chain execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub tx_hash: alloy_primitives::B256,
    pub chain: Chain,
    pub block_number: u64,
    pub gas_used: u64,
}

/// Builds, signs, proposes, simulates and executes multisig transactions.
pub struct MultisigSubmitter {
    settings: Arc<Settings>,
    signer: Arc<Signer>,
    connections: Arc<dyn ChainConnections>,
}

impl MultisigSubmitter {
    pub fn new(
        settings: Arc<Settings>,
        signer: Arc<Signer>,
        connections: Arc<dyn ChainConnections>,
    ) -> Self {
        Self {
            settings,
            signer,
            connections,
        }
    }

    /// The provider for a chain, for callers that need reads (block
    /// timestamps) outside a submission.
    pub async fn provider(&self, chain: Chain) -> SubmissionResult<Arc<dyn ChainProvider>> {
        self.connections.provider(chain).await
    }

    /// Submit a transaction through the multisig wallet and wait for its
    /// on-chain result.
    pub async fn submit(
        &self,
        request: &MultisigTransactionRequest,
    ) -> SubmissionResult<SubmissionReceipt> {
        let chain = request.chain;

        // Precondition checks: fail fast before any network I/O.
        let wallet = self.settings.multisig_address(chain).ok_or_else(|| {
            SubmissionError::Config(format!("no multisig address configured for chain: {chain}"))
        })?;
        if !self.settings.is_chain_fully_configured(chain) {
            return Err(SubmissionError::Config(format!(
                "chain is not fully configured: {chain}"
            )));
        }
        if request.to == Address::ZERO {
            return Err(SubmissionError::Config(
                "transaction recipient must be a non-zero address".to_string(),
            ));
        }
        let rpc_url = self
            .settings
            .rpc_endpoint(chain)
            .map(str::to_string)
            .unwrap_or_default();

        info!(%chain, to = %request.to, value = %request.value, "creating multisig transaction");

        let provider = self.connections.provider(chain).await?;

        // Resolve the wallet's current nonce.
        throttle_public_endpoint(&rpc_url).await;
        let nonce_ret = provider
            .call(None, wallet, nonce_calldata())
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;
        let nonce = decode_nonce(&nonce_ret).ok_or_else(|| {
            SubmissionError::Network("could not decode multisig nonce".to_string())
        })?;

        // Build and owner-sign the multisig-domain transaction.
        let params = MultisigTxParams {
            to: request.to,
            value: request.value,
            data: request.data.to_vec(),
            operation: request.operation as u8,
            safe_tx_gas: U256::from(INTERNAL_GAS_ALLOWANCE),
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce,
        };
        let tx_hash = multisig_tx_hash(chain.chain_id(), wallet, &params);
        let signature = self
            .signer
            .sign_hash(tx_hash)
            .map_err(|e| SubmissionError::Signing(e.to_string()))?;
        let built = BuiltMultisigTransaction {
            wallet,
            params,
            tx_hash,
            signatures: signature.to_bytes().to_vec(),
        };

        info!(
            %chain,
            wallet = %wallet,
            to = %request.to,
            data_length = request.data.len(),
            nonce = %nonce,
            multisig_tx_hash = %tx_hash,
            "built multisig transaction"
        );

        // Propose to the relay service. Advisory, but ordered before the
        // simulate/execute steps.
        let relay = self.connections.relay(chain)?;
        relay
            .propose(&self.proposal_for(&built))
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        // Simulate the exact execution call before broadcasting anything.
        let exec_calldata = built.exec_calldata();
        if let Err(e) = provider
            .call(Some(self.signer.address()), wallet, exec_calldata.clone())
            .await
        {
            warn!(%chain, wallet = %wallet, reason = %e, "simulation failed; not broadcasting");
            return Err(SubmissionError::Simulation {
                reason: e.to_string(),
            });
        }

        // Broadcast and wait for the receipt.
        throttle_public_endpoint(&rpc_url).await;
        let sent_hash = provider
            .send_transaction(wallet, U256::ZERO, exec_calldata, request.gas)
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;
        info!(tx_hash = %sent_hash, "executed multisig transaction on-chain");

        let receipt = provider
            .wait_for_receipt(sent_hash)
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        if receipt.status {
            info!(
                tx_hash = %receipt.tx_hash,
                block_number = receipt.block_number,
                gas_used = receipt.gas_used,
                "transaction successful"
            );
            Ok(SubmissionReceipt {
                tx_hash: receipt.tx_hash,
                chain,
                block_number: receipt.block_number,
                gas_used: receipt.gas_used,
            })
        } else {
            error!(tx_hash = %receipt.tx_hash, "transaction reverted");
            Err(SubmissionError::Reverted {
                tx_hash: receipt.tx_hash,
            })
        }
    }

    fn proposal_for(&self, built: &BuiltMultisigTransaction) -> TransactionProposal {
        TransactionProposal {
            safe: built.wallet,
            to: built.params.to,
            value: built.params.value.to_string(),
            data: format!("0x{}", hex::encode(&built.params.data)),
            operation: built.params.operation,
            safe_tx_gas: built.params.safe_tx_gas.to_string(),
            base_gas: built.params.base_gas.to_string(),
            gas_price: built.params.gas_price.to_string(),
            gas_token: built.params.gas_token,
            refund_receiver: built.params.refund_receiver,
            nonce: built.params.nonce.to_string(),
            contract_transaction_hash: built.tx_hash,
            sender: self.signer.address(),
            signature: format!("0x{}", hex::encode(built.signatures.clone())),
        }
    }
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use alloy_primitives::Bytes;

    use verdict_config::ChainEndpoint;

    use super::testing::{MockBehavior, MockConnections};
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn settings_with_gnosis() -> Arc<Settings> {
        let mut settings = Settings::default();
        settings.chains.insert(
            Chain::Gnosis,
            ChainEndpoint {
                multisig_address: Some(
                    "0x1111111111111111111111111111111111111111".parse().unwrap(),
                ),
                rpc_endpoint: Some("https://rpc.example".to_string()),
                relay_service_url: Some("https://relay.example".to_string()),
            },
        );
        Arc::new(settings)
    }

    fn submitter(connections: Arc<MockConnections>) -> MultisigSubmitter {
        MultisigSubmitter::new(
            settings_with_gnosis(),
            Arc::new(Signer::from_hex(TEST_KEY).unwrap()),
            connections,
        )
    }

    fn request() -> MultisigTransactionRequest {
        MultisigTransactionRequest::call(
            Chain::Gnosis,
            "0x2222222222222222222222222222222222222222".parse().unwrap(),
            Bytes::new(),
        )
    }

    #[tokio::test]
    async fn successful_submission_returns_receipt() {
        let connections = Arc::new(MockConnections::new(MockBehavior::default()));
        let receipt = submitter(connections.clone())
            .submit(&request())
            .await
            .unwrap();
        assert_eq!(receipt.chain, Chain::Gnosis);
        assert_eq!(receipt.block_number, 123);
        assert_eq!(connections.relay.propose_count.load(Ordering::SeqCst), 1);
        assert_eq!(connections.provider.send_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn simulation_failure_aborts_before_broadcast() {
        let connections = Arc::new(MockConnections::new(MockBehavior {
            fail_simulation: Some("execution reverted: NotAuthorized".to_string()),
            ..MockBehavior::default()
        }));
        let err = submitter(connections.clone())
            .submit(&request())
            .await
            .unwrap_err();
        assert!(err.is_simulation_failure());
        assert!(!err.is_retryable());
        // The broadcast step must never run.
        assert_eq!(connections.provider.send_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn on_chain_revert_is_terminal_with_tx_hash() {
        let connections = Arc::new(MockConnections::new(MockBehavior {
            revert_on_chain: true,
            ..MockBehavior::default()
        }));
        let err = submitter(connections).submit(&request()).await.unwrap_err();
        match err {
            SubmissionError::Reverted { tx_hash } => {
                assert_eq!(tx_hash, alloy_primitives::B256::repeat_byte(0x42));
            }
            other => panic!("expected Reverted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn broadcast_failure_is_retryable() {
        let connections = Arc::new(MockConnections::new(MockBehavior {
            fail_send: Some("connection reset".to_string()),
            ..MockBehavior::default()
        }));
        let err = submitter(connections).submit(&request()).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unconfigured_chain_fails_without_network_io() {
        let connections = Arc::new(MockConnections::new(MockBehavior::default()));
        let mut req = request();
        req.chain = Chain::Mode;
        let err = submitter(connections.clone()).submit(&req).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Config(_)));
        assert_eq!(connections.provider_requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_recipient_is_rejected() {
        let connections = Arc::new(MockConnections::new(MockBehavior::default()));
        let mut req = request();
        req.to = Address::ZERO;
        let err = submitter(connections).submit(&req).await.unwrap_err();
        assert!(matches!(err, SubmissionError::Config(_)));
    }
}
