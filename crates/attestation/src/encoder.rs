//! ABI encoding of the vote attestation payload.
//!
//! The on-chain schema is the flat tuple
//! `(address, string, string, uint8, string, uint256, string, uint8)` =
//! `(agent_address, space_id, proposal_id, vote_choice, signature_reference,
//! timestamp, run_id, confidence)`, encoded with standard `abi.encode`
//! layout so the registry's schema resolver can decode it.

use alloy_primitives::{Bytes, U256};
use alloy_sol_types::{sol_data, SolType};

use crate::{AttestationError, AttestationResult, VoteAttestation};

type SchemaTuple = (
    alloy_primitives::Address,
    String,
    String,
    u8,
    String,
    U256,
    String,
    u8,
);

type SchemaSolTuple = (
    sol_data::Address,
    sol_data::String,
    sol_data::String,
    sol_data::Uint<8>,
    sol_data::String,
    sol_data::Uint<256>,
    sol_data::String,
    sol_data::Uint<8>,
);

/// Encode a vote attestation against the registered schema.
///
/// Pure and deterministic; the same payload always yields the same bytes.
pub fn encode_vote_attestation(attestation: &VoteAttestation) -> Bytes {
    let tuple: SchemaTuple = (
        attestation.agent_address,
        attestation.space_id.clone(),
        attestation.proposal_id.clone(),
        attestation.vote_choice,
        attestation.signature_reference.clone(),
        U256::from(attestation.timestamp),
        attestation.run_id.clone(),
        attestation.confidence,
    );
    Bytes::from(SchemaSolTuple::abi_encode_params(&tuple))
}

/// Decode schema-encoded bytes back into the attestation payload.
pub fn decode_vote_attestation(data: &[u8]) -> AttestationResult<VoteAttestation> {
    let (agent_address, space_id, proposal_id, vote_choice, signature_reference, timestamp, run_id, confidence) =
        SchemaSolTuple::abi_decode_params(data, true)
            .map_err(|e| AttestationError::Encoding(e.to_string()))?;
    let timestamp = u64::try_from(timestamp)
        .map_err(|_| AttestationError::Encoding("timestamp exceeds u64".to_string()))?;
    Ok(VoteAttestation {
        agent_address,
        space_id,
        proposal_id,
        vote_choice,
        signature_reference,
        timestamp,
        run_id,
        confidence,
    })
}
