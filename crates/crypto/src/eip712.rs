//! Minimal EIP-712 typed-data hashing.
//!
//! Only the pieces the agent needs: a full domain (name, version, chain id,
//! verifying contract), the domain separator, and the final `\x19\x01`
//! digest over a caller-supplied struct hash.

use alloy_primitives::{keccak256, Address, B256, U256};

/// `keccak256("EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)")`
fn domain_type_hash() -> B256 {
    keccak256(b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)")
}

/// An EIP-712 signing domain.
///
/// Signatures are bound to the `(chain_id, verifying_contract)` pair; the
/// same payload signed for a different chain or contract produces a
/// different digest and fails verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedDomain {
    pub name: &'static str,
    pub version: &'static str,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl TypedDomain {
    pub fn new(
        name: &'static str,
        version: &'static str,
        chain_id: u64,
        verifying_contract: Address,
    ) -> Self {
        Self {
            name,
            version,
            chain_id,
            verifying_contract,
        }
    }

    /// The domain separator hash.
    pub fn separator(&self) -> B256 {
        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(domain_type_hash().as_slice());
        buf.extend_from_slice(keccak256(self.name.as_bytes()).as_slice());
        buf.extend_from_slice(keccak256(self.version.as_bytes()).as_slice());
        buf.extend_from_slice(&U256::from(self.chain_id).to_be_bytes::<32>());
        buf.extend_from_slice(&address_word(self.verifying_contract));
        keccak256(&buf)
    }

    /// The final signing digest for a struct hash under this domain.
    pub fn digest(&self, struct_hash: B256) -> B256 {
        let mut buf = Vec::with_capacity(2 + 32 + 32);
        buf.extend_from_slice(b"\x19\x01");
        buf.extend_from_slice(self.separator().as_slice());
        buf.extend_from_slice(struct_hash.as_slice());
        keccak256(&buf)
    }
}

/// Left-pad an address into a 32-byte ABI word.
pub fn address_word(address: Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_slice());
    word
}

/// Left-pad a u64 into a 32-byte ABI word.
pub fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Encode a bool as a 32-byte ABI word.
pub fn bool_word(value: bool) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[31] = value as u8;
    word
}
