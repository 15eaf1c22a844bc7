//! Verdict records the votes of an autonomous governance agent on-chain.
//!
//! After the decision flow casts a vote on the governance platform, this
//! crate attests to it: the vote is ABI-encoded against a registered
//! schema, signed as a delegated attestation under the registry's EIP-712
//! domain, and executed through the agent's multisig wallet on the
//! cheapest fully-configured chain. Attestations that fail are parked in a
//! durable retry queue and drained on later runs; the vote itself is never
//! blocked on them.

pub use verdict_attestation as attestation;
pub use verdict_chain as chain;
pub use verdict_config as config;
pub use verdict_crypto as crypto;
pub use verdict_storage as storage;

mod agent;

pub use agent::{
    AgentError, AgentResult, AttestationOutcome, VerdictAgent, SIGNATURE_VALIDITY_WINDOW_SECS,
};
