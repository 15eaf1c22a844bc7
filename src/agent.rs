//! The top-level agent service.
//!
//! [`VerdictAgent`] wires the signer, chain connections and checkpoint
//! store together and exposes the three operations the run orchestrator
//! calls: recording a vote attestation, marking daily liveness, and
//! draining the attestation retry queue.

use std::sync::Arc;

use alloy_primitives::{Bytes, B256};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use verdict_attestation::{
    encode_vote_attestation, flush, load_checkpoint, persist_checkpoint,
    sign_delegated_attestation, route, AttestationError, AttestationQueueEntry,
    AttestationResult, AttestationSubmitter, DelegatedAttestationRequest, QueueCheckpoint,
    RoutingTarget, VoteOutcome,
};
use verdict_chain::{
    select_optimal_chain, ChainConnections, HttpConnections, MultisigSubmitter,
    MultisigTransactionRequest, NoValidChainError, SubmissionError, SubmissionReceipt,
};
use verdict_config::{Chain, ConfigError, Settings};
use verdict_crypto::{CryptoError, Signer};
use verdict_storage::{CheckpointStore, FileCheckpointStore, StorageError};

/// How long a delegated-attestation signature stays valid, measured from
/// the chain's block timestamp at build time.
pub const SIGNATURE_VALIDITY_WINDOW_SECS: u64 = 3600;

/// Top-level agent errors.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error(transparent)]
    NoValidChain(#[from] NoValidChainError),
}

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// What the vote-submission flow learns about an attestation attempt.
///
/// Failures are reported, never raised: the entry is queued for retry and
/// the voting flow continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationOutcome {
    pub success: bool,
    pub tx_hash: Option<B256>,
    pub error: Option<String>,
}

impl AttestationOutcome {
    fn confirmed(tx_hash: B256) -> Self {
        Self {
            success: true,
            tx_hash: Some(tx_hash),
            error: None,
        }
    }

    fn queued(error: &AgentError) -> Self {
        Self {
            success: false,
            tx_hash: None,
            error: Some(error.to_string()),
        }
    }
}

/// The agent service.
pub struct VerdictAgent {
    settings: Arc<Settings>,
    signer: Arc<Signer>,
    submitter: MultisigSubmitter,
    store: Arc<dyn CheckpointStore>,
}

impl VerdictAgent {
    /// Build the agent from settings: load the signing key, open the
    /// checkpoint store and prepare lazy per-chain connections.
    pub fn new(settings: Settings) -> AgentResult<Self> {
        let settings = Arc::new(settings);
        let signer = Arc::new(Signer::load(&settings.key_dir)?);
        let connections = Arc::new(HttpConnections::new(settings.clone(), signer.clone()));
        let store: Arc<dyn CheckpointStore> =
            Arc::new(FileCheckpointStore::new(&settings.store_dir)?);
        Ok(Self::from_parts(settings, signer, connections, store))
    }

    /// Assemble the agent from explicit parts. Used by tests to substitute
    /// in-memory connections and storage.
    pub fn from_parts(
        settings: Arc<Settings>,
        signer: Arc<Signer>,
        connections: Arc<dyn ChainConnections>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        let submitter = MultisigSubmitter::new(settings.clone(), signer.clone(), connections);
        Self {
            settings,
            signer,
            submitter,
            store,
        }
    }

    /// The agent's signing (owner) address.
    pub fn address(&self) -> alloy_primitives::Address {
        self.signer.address()
    }

    /// Record a completed vote as an on-chain attestation.
    ///
    /// On any failure the vote is enqueued into the retry queue and the
    /// outcome reports the error; nothing propagates to the caller.
    pub async fn create_attestation(
        &self,
        vote: &VoteOutcome,
        run_id: &str,
        confidence: u8,
    ) -> AttestationOutcome {
        let entry = AttestationQueueEntry::from_vote(vote, run_id, confidence);
        match self.attest_once(&entry).await {
            Ok(receipt) => {
                info!(
                    proposal_id = %entry.proposal_id,
                    tx_hash = %receipt.tx_hash,
                    chain = %receipt.chain,
                    "vote attestation confirmed"
                );
                AttestationOutcome::confirmed(receipt.tx_hash)
            }
            Err(e) => {
                warn!(
                    proposal_id = %entry.proposal_id,
                    error = %e,
                    "attestation failed; queueing for retry"
                );
                let outcome = AttestationOutcome::queued(&e);
                self.enqueue(entry).await;
                outcome
            }
        }
    }

    /// Zero-value self-transfer from the multisig to itself, used as a
    /// daily liveness marker. Defaults to the cheapest configured chain.
    pub async fn submit_activity_transaction(
        &self,
        chain: Option<Chain>,
    ) -> AgentResult<SubmissionReceipt> {
        let chain = match chain {
            Some(chain) => chain,
            None => select_optimal_chain(&self.settings)?,
        };
        let wallet = self.settings.multisig_address(chain).ok_or_else(|| {
            SubmissionError::Config(format!("no multisig address configured for chain: {chain}"))
        })?;
        let request = MultisigTransactionRequest::call(chain, wallet, Bytes::new());
        Ok(self.submitter.submit(&request).await?)
    }

    /// Drain the retry queue for a space through the regular attestation
    /// pipeline and persist what remains. Returns the number of entries
    /// still pending.
    pub async fn process_pending_attestations(&self, space_id: &str) -> usize {
        let checkpoint = load_checkpoint(self.store.as_ref(), space_id).await;
        if checkpoint.pending.is_empty() {
            return 0;
        }
        info!(
            space_id,
            pending = checkpoint.pending.len(),
            "processing pending attestations"
        );

        let remaining = flush(self, checkpoint.pending).await;
        let updated = QueueCheckpoint {
            version: checkpoint.version,
            space_id: space_id.to_string(),
            pending: remaining,
        };
        persist_checkpoint(self.store.as_ref(), &updated).await;
        updated.pending.len()
    }

    /// One full attestation attempt: encode, sign, route, submit.
    async fn attest_once(&self, entry: &AttestationQueueEntry) -> AgentResult<SubmissionReceipt> {
        let config = &self.settings.attestation;
        let chain = config.chain;
        let schema = config.schema_uid.ok_or_else(|| {
            AttestationError::Config("no attestation schema id configured".to_string())
        })?;
        let registry = config.registry_address.ok_or_else(|| {
            AttestationError::Config("no attestation registry address configured".to_string())
        })?;
        let target = RoutingTarget::from_config(config)?;

        let provider = self.submitter.provider(chain).await?;
        let now = provider
            .block_timestamp()
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;
        let deadline = now + SIGNATURE_VALIDITY_WINDOW_SECS;

        let payload = entry.to_attestation(self.signer.address());
        let data = encode_vote_attestation(&payload);
        let request =
            DelegatedAttestationRequest::for_vote(schema, entry.voter_address, data, deadline);
        request.validate(now).map_err(AgentError::Attestation)?;

        // The registry verifies the signature against its own domain even
        // when the call goes through the wrapper.
        let signature =
            sign_delegated_attestation(&self.signer, &request, chain.chain_id(), registry)?;
        let routed = route(
            target,
            &request,
            &signature,
            self.signer.address(),
            config.gas_limit,
        );

        let tx = MultisigTransactionRequest::call(chain, routed.to, routed.calldata)
            .with_gas(routed.gas);
        Ok(self.submitter.submit(&tx).await?)
    }

    /// Append an entry to its space's checkpoint; persistence errors are
    /// logged inside and swallowed.
    async fn enqueue(&self, entry: AttestationQueueEntry) {
        let mut checkpoint = load_checkpoint(self.store.as_ref(), &entry.space_id).await;
        checkpoint.pending.push(entry);
        persist_checkpoint(self.store.as_ref(), &checkpoint).await;
    }
}

#[async_trait]
impl AttestationSubmitter for VerdictAgent {
    async fn submit_attestation(&self, entry: &AttestationQueueEntry) -> AttestationResult<B256> {
        match self.attest_once(entry).await {
            Ok(receipt) => Ok(receipt.tx_hash),
            Err(AgentError::Attestation(e)) => Err(e),
            Err(e) => Err(AttestationError::Submission(e.to_string())),
        }
    }
}
