//! Chain access for the Verdict agent.
//!
//! This crate covers everything between a decided payload and its on-chain
//! receipt: selecting the cheapest fully-configured network, talking JSON-RPC
//! to it, proposing multisig transactions to the relay service, and driving a
//! transaction through build, sign, simulate, execute and confirm.

use alloy_primitives::B256;
use thiserror::Error;

pub mod multisig;
pub mod provider;
pub mod relay;
pub mod rpc;
pub mod selector;
pub mod submitter;

pub use multisig::{BuiltMultisigTransaction, MultisigTransactionRequest, Operation};
pub use provider::{ChainProvider, ProviderError, TransactionReceipt};
pub use relay::{HttpRelayService, RelayError, RelayService, TransactionProposal};
pub use rpc::HttpProvider;
pub use selector::{select_optimal_chain, NoValidChainError};
pub use submitter::{
    ChainConnections, HttpConnections, MultisigSubmitter, SubmissionReceipt,
};

/// Errors from multisig transaction submission.
///
/// The variants form the retry taxonomy: only [`SubmissionError::Network`]
/// failures are worth retrying. Configuration problems are fatal,
/// simulation failures and on-chain reverts are terminal for the attempt.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Missing or inconsistent configuration; never retried
    #[error("configuration error: {0}")]
    Config(String),

    /// The owner signature could not be produced
    #[error("signing error: {0}")]
    Signing(String),

    /// The read-only simulation of the call reverted; nothing was broadcast
    #[error("simulation failed: {reason}")]
    Simulation { reason: String },

    /// The transaction was mined but reverted on-chain
    #[error("transaction reverted (tx_hash={tx_hash})")]
    Reverted { tx_hash: B256 },

    /// Transient transport, RPC or relay-service failure; retryable
    #[error("network error: {0}")]
    Network(String),
}

impl SubmissionError {
    /// Whether a later attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmissionError::Network(_))
    }

    /// Whether the failure was caught by the pre-broadcast simulation gate.
    pub fn is_simulation_failure(&self) -> bool {
        matches!(self, SubmissionError::Simulation { .. })
    }
}

/// Result type for submission operations
pub type SubmissionResult<T> = Result<T, SubmissionError>;
