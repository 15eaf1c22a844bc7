//! Multisig wallet contract interface and transaction shapes.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use serde::{Deserialize, Serialize};

use verdict_config::Chain;
use verdict_crypto::safe::MultisigTxParams;

sol! {
    /// Subset of the multisig wallet contract the agent drives.
    interface IMultisigWallet {
        function nonce() external view returns (uint256);

        function execTransaction(
            address to,
            uint256 value,
            bytes calldata data,
            uint8 operation,
            uint256 safeTxGas,
            uint256 baseGas,
            uint256 gasPrice,
            address gasToken,
            address refundReceiver,
            bytes calldata signatures
        ) external payable returns (bool success);
    }
}

/// Multisig operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Call = 0,
    DelegateCall = 1,
}

impl Default for Operation {
    fn default() -> Self {
        Self::Call
    }
}

/// A request to execute a call through the multisig wallet.
///
/// `value` is a `U256`, so the non-negativity invariant holds by
/// construction.
#[derive(Debug, Clone)]
pub struct MultisigTransactionRequest {
    pub chain: Chain,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub operation: Operation,
    /// Explicit gas limit for the outer execution transaction; estimated
    /// when absent
    pub gas: Option<u64>,
}

impl MultisigTransactionRequest {
    /// A plain call with no value, the common case.
    pub fn call(chain: Chain, to: Address, data: Bytes) -> Self {
        Self {
            chain,
            to,
            value: U256::ZERO,
            data,
            operation: Operation::Call,
            gas: None,
        }
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }
}

/// A request resolved against the wallet's on-chain state and signed by the
/// owner. Lives only for the duration of one submission attempt.
#[derive(Debug, Clone)]
pub struct BuiltMultisigTransaction {
    pub wallet: Address,
    pub params: MultisigTxParams,
    /// The multisig-domain hash the owner signed
    pub tx_hash: B256,
    /// Owner signature bundle (`r || s || v`)
    pub signatures: Vec<u8>,
}

impl BuiltMultisigTransaction {
    /// Calldata of the wallet's `execTransaction` for this transaction.
    pub fn exec_calldata(&self) -> Bytes {
        IMultisigWallet::execTransactionCall {
            to: self.params.to,
            value: self.params.value,
            data: self.params.data.clone().into(),
            operation: self.params.operation,
            safeTxGas: self.params.safe_tx_gas,
            baseGas: self.params.base_gas,
            gasPrice: self.params.gas_price,
            gasToken: self.params.gas_token,
            refundReceiver: self.params.refund_receiver,
            signatures: self.signatures.clone().into(),
        }
        .abi_encode()
        .into()
    }
}

/// Calldata for reading the wallet's current nonce.
pub fn nonce_calldata() -> Bytes {
    IMultisigWallet::nonceCall {}.abi_encode().into()
}

/// Decode the return data of a `nonce()` call.
pub fn decode_nonce(data: &[u8]) -> Option<U256> {
    IMultisigWallet::nonceCall::abi_decode_returns(data, true)
        .ok()
        .map(|ret| ret._0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_selector_matches_known_value() {
        // nonce() selector: 0xaffed0e0
        assert_eq!(&nonce_calldata()[..4], &[0xaf, 0xfe, 0xd0, 0xe0]);
    }

    #[test]
    fn nonce_round_trips() {
        let encoded = U256::from(42u64).to_be_bytes::<32>();
        assert_eq!(decode_nonce(&encoded), Some(U256::from(42u64)));
        assert_eq!(decode_nonce(&[0u8; 4]), None);
    }

    #[test]
    fn exec_calldata_starts_with_selector() {
        let built = BuiltMultisigTransaction {
            wallet: "0x1111111111111111111111111111111111111111".parse().unwrap(),
            params: MultisigTxParams {
                to: "0x2222222222222222222222222222222222222222".parse().unwrap(),
                value: U256::ZERO,
                data: vec![],
                operation: Operation::Call as u8,
                safe_tx_gas: U256::from(100_000u64),
                base_gas: U256::ZERO,
                gas_price: U256::ZERO,
                gas_token: Address::ZERO,
                refund_receiver: Address::ZERO,
                nonce: U256::ZERO,
            },
            tx_hash: B256::ZERO,
            signatures: vec![0u8; 65],
        };
        let calldata = built.exec_calldata();
        // execTransaction selector: 0x6a761202
        assert_eq!(&calldata[..4], &[0x6a, 0x76, 0x12, 0x02]);
    }
}
