//! Multisig transaction domain hashing.
//!
//! The multisig contract verifies owner signatures over an EIP-712 digest of
//! the transaction parameters under a reduced domain of
//! `(chainId, verifyingContract)`. This module reproduces that digest so the
//! owner signature can be computed off-chain.

use alloy_primitives::{keccak256, Address, B256, U256};

use crate::eip712::{address_word, u64_word};

/// `keccak256("EIP712Domain(uint256 chainId,address verifyingContract)")`
fn multisig_domain_type_hash() -> B256 {
    keccak256(b"EIP712Domain(uint256 chainId,address verifyingContract)")
}

/// `keccak256("SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)")`
fn multisig_tx_type_hash() -> B256 {
    keccak256(
        b"SafeTx(address to,uint256 value,bytes data,uint8 operation,uint256 safeTxGas,uint256 baseGas,uint256 gasPrice,address gasToken,address refundReceiver,uint256 nonce)",
    )
}

/// Execution parameters of a multisig transaction, as hashed by the wallet
/// contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisigTxParams {
    pub to: Address,
    pub value: U256,
    pub data: Vec<u8>,
    pub operation: u8,
    pub safe_tx_gas: U256,
    pub base_gas: U256,
    pub gas_price: U256,
    pub gas_token: Address,
    pub refund_receiver: Address,
    pub nonce: U256,
}

/// The multisig-domain transaction hash an owner signs.
pub fn multisig_tx_hash(chain_id: u64, wallet: Address, params: &MultisigTxParams) -> B256 {
    let mut domain_buf = Vec::with_capacity(32 * 3);
    domain_buf.extend_from_slice(multisig_domain_type_hash().as_slice());
    domain_buf.extend_from_slice(&u64_word(chain_id));
    domain_buf.extend_from_slice(&address_word(wallet));
    let domain_separator = keccak256(&domain_buf);

    let mut struct_buf = Vec::with_capacity(32 * 11);
    struct_buf.extend_from_slice(multisig_tx_type_hash().as_slice());
    struct_buf.extend_from_slice(&address_word(params.to));
    struct_buf.extend_from_slice(&params.value.to_be_bytes::<32>());
    struct_buf.extend_from_slice(keccak256(&params.data).as_slice());
    struct_buf.extend_from_slice(&u64_word(params.operation as u64));
    struct_buf.extend_from_slice(&params.safe_tx_gas.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&params.base_gas.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&params.gas_price.to_be_bytes::<32>());
    struct_buf.extend_from_slice(&address_word(params.gas_token));
    struct_buf.extend_from_slice(&address_word(params.refund_receiver));
    struct_buf.extend_from_slice(&params.nonce.to_be_bytes::<32>());
    let struct_hash = keccak256(&struct_buf);

    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(domain_separator.as_slice());
    buf.extend_from_slice(struct_hash.as_slice());
    keccak256(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(nonce: u64) -> MultisigTxParams {
        MultisigTxParams {
            to: "0x1111111111111111111111111111111111111111".parse().unwrap(),
            value: U256::ZERO,
            data: vec![0xde, 0xad],
            operation: 0,
            safe_tx_gas: U256::from(100_000u64),
            base_gas: U256::ZERO,
            gas_price: U256::ZERO,
            gas_token: Address::ZERO,
            refund_receiver: Address::ZERO,
            nonce: U256::from(nonce),
        }
    }

    #[test]
    fn hash_changes_with_nonce_and_chain() {
        let wallet: Address = "0x2222222222222222222222222222222222222222".parse().unwrap();
        let base = multisig_tx_hash(100, wallet, &params(0));
        assert_eq!(base, multisig_tx_hash(100, wallet, &params(0)));
        assert_ne!(base, multisig_tx_hash(100, wallet, &params(1)));
        assert_ne!(base, multisig_tx_hash(1, wallet, &params(0)));
    }
}
