//! Delegated vote attestations.
//!
//! After the agent casts a governance vote, it records the vote on-chain as
//! a delegated attestation: the payload is ABI-encoded against the
//! registered schema, signed under the attestation registry's EIP-712
//! domain, routed to either the registry or a tracking-wrapper contract,
//! and submitted through the multisig. Failed attestations land in a
//! durable retry queue so the vote itself is never blocked on them.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use verdict_crypto::CryptoError;

pub mod delegated;
pub mod encoder;
pub mod queue;
pub mod router;

pub use delegated::{sign_delegated_attestation, DelegatedAttestationRequest};
pub use encoder::{decode_vote_attestation, encode_vote_attestation};
pub use queue::{
    flush, load_checkpoint, persist_checkpoint, AttestationSubmitter, QueueCheckpoint,
    MAX_ATTESTATION_RETRIES,
};
pub use router::{route, RoutedCall, RoutingTarget};

/// Attestation pipeline errors.
#[derive(Debug, Error)]
pub enum AttestationError {
    /// Missing registry, schema or wrapper configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed request fields, caught before any network call
    #[error("invalid attestation request: {0}")]
    InvalidRequest(String),

    /// Payload could not be decoded against the schema
    #[error("encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// On-chain submission of a routed attestation failed
    #[error("submission failed: {0}")]
    Submission(String),
}

/// Result type for attestation operations
pub type AttestationResult<T> = Result<T, AttestationError>;

/// Vote choice, numbered per the governance-platform convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteChoice {
    For,
    Against,
    Abstain,
}

impl VoteChoice {
    pub fn as_u8(self) -> u8 {
        match self {
            VoteChoice::For => 1,
            VoteChoice::Against => 2,
            VoteChoice::Abstain => 3,
        }
    }
}

impl TryFrom<u8> for VoteChoice {
    type Error = AttestationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteChoice::For),
            2 => Ok(VoteChoice::Against),
            3 => Ok(VoteChoice::Abstain),
            other => Err(AttestationError::Encoding(format!(
                "unknown vote choice: {other}"
            ))),
        }
    }
}

/// A completed governance vote, handed over by the vote-submission flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteOutcome {
    pub proposal_id: String,
    pub space_id: String,
    pub vote_choice: VoteChoice,
    pub voter_address: Address,
    pub delegate_address: Address,
    pub reasoning: String,
    /// Hash the governance platform reported for the vote, if any
    pub vote_tx_hash: Option<B256>,
    /// Unix timestamp of the vote
    pub timestamp: u64,
}

/// The schema-typed attestation payload recorded on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteAttestation {
    pub agent_address: Address,
    pub space_id: String,
    pub proposal_id: String,
    pub vote_choice: u8,
    /// Reference to the vote signature or vote transaction on the platform
    pub signature_reference: String,
    pub timestamp: u64,
    pub run_id: String,
    /// Decision confidence in percent, 0-100
    pub confidence: u8,
}

/// A vote awaiting a confirmed attestation, persisted across restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttestationQueueEntry {
    pub proposal_id: String,
    pub space_id: String,
    pub vote_choice: VoteChoice,
    pub voter_address: Address,
    pub delegate_address: Address,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub vote_tx_hash: Option<B256>,
    pub timestamp: u64,
    pub run_id: String,
    #[serde(default)]
    pub confidence: u8,
    /// Failed attempts so far; entries at [`MAX_ATTESTATION_RETRIES`] are dropped
    #[serde(default)]
    pub retry_count: u32,
}

impl AttestationQueueEntry {
    /// First-enqueue entry for a vote whose attestation has not yet landed.
    pub fn from_vote(vote: &VoteOutcome, run_id: &str, confidence: u8) -> Self {
        Self {
            proposal_id: vote.proposal_id.clone(),
            space_id: vote.space_id.clone(),
            vote_choice: vote.vote_choice,
            voter_address: vote.voter_address,
            delegate_address: vote.delegate_address,
            reasoning: vote.reasoning.clone(),
            vote_tx_hash: vote.vote_tx_hash,
            timestamp: vote.timestamp,
            run_id: run_id.to_string(),
            confidence,
            retry_count: 0,
        }
    }

    /// The attestation payload this entry produces on each attempt.
    pub fn to_attestation(&self, agent_address: Address) -> VoteAttestation {
        VoteAttestation {
            agent_address,
            space_id: self.space_id.clone(),
            proposal_id: self.proposal_id.clone(),
            vote_choice: self.vote_choice.as_u8(),
            signature_reference: self
                .vote_tx_hash
                .map(|h| h.to_string())
                .unwrap_or_default(),
            timestamp: self.timestamp,
            run_id: self.run_id.clone(),
            confidence: self.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_choice_numbering_round_trips() {
        for choice in [VoteChoice::For, VoteChoice::Against, VoteChoice::Abstain] {
            assert_eq!(VoteChoice::try_from(choice.as_u8()).unwrap(), choice);
        }
        assert_eq!(VoteChoice::For.as_u8(), 1);
        assert!(VoteChoice::try_from(0).is_err());
        assert!(VoteChoice::try_from(4).is_err());
    }

    #[test]
    fn queue_entry_starts_with_zero_retries() {
        let vote = VoteOutcome {
            proposal_id: "0xprop".to_string(),
            space_id: "aave.eth".to_string(),
            vote_choice: VoteChoice::Against,
            voter_address: Address::repeat_byte(0x11),
            delegate_address: Address::repeat_byte(0x22),
            reasoning: "quorum risk".to_string(),
            vote_tx_hash: Some(B256::repeat_byte(0xab)),
            timestamp: 1_700_000_000,
        };
        let entry = AttestationQueueEntry::from_vote(&vote, "run-7", 80);
        assert_eq!(entry.retry_count, 0);
        assert_eq!(entry.run_id, "run-7");

        let attestation = entry.to_attestation(Address::repeat_byte(0x33));
        assert_eq!(attestation.vote_choice, 2);
        assert!(attestation.signature_reference.starts_with("0x"));
        assert_eq!(attestation.confidence, 80);
    }
}
