//! Read/write access to a blockchain network.
//!
//! [`ChainProvider`] is the seam between the submission pipeline and the
//! network: reads (chain id, block timestamp, `eth_call`), the broadcast of
//! a transaction signed with the agent's key, and receipt polling. The
//! production implementation is [`crate::rpc::HttpProvider`]; tests inject
//! their own.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

/// Errors from provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connection, HTTP, serialization)
    #[error("transport error: {0}")]
    Transport(String),

    /// The node returned a JSON-RPC error (including call reverts)
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The node's response did not have the expected shape
    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),

    /// No receipt appeared within the polling window
    #[error("timed out waiting for receipt of {0}")]
    ReceiptTimeout(B256),
}

/// Result of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub gas_used: u64,
    /// `true` when the transaction succeeded
    pub status: bool,
}

#[async_trait]
pub trait ChainProvider: Send + Sync {
    /// The connected network's chain id.
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Timestamp of the latest block.
    async fn block_timestamp(&self) -> Result<u64, ProviderError>;

    /// Execute a read-only call (`eth_call`) against `to`.
    async fn call(
        &self,
        from: Option<Address>,
        to: Address,
        data: Bytes,
    ) -> Result<Bytes, ProviderError>;

    /// Sign a transaction with the agent's key and broadcast it, returning
    /// the transaction hash.
    async fn send_transaction(
        &self,
        to: Address,
        value: U256,
        data: Bytes,
        gas: Option<u64>,
    ) -> Result<B256, ProviderError>;

    /// Poll until the transaction is mined and return its receipt.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TransactionReceipt, ProviderError>;
}
