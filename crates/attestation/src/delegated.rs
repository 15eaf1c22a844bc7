//! Delegated attestation requests and their EIP-712 signatures.
//!
//! The registry verifies delegated attestations against its own typed-data
//! proxy domain (`"EIP712Proxy"` version `"1.2.0"`), so the signature is
//! always computed against the registry address and the attestation chain's
//! id. Signing against the wrapper contract would always fail verification,
//! even when the call itself is routed through the wrapper.

use alloy_primitives::{keccak256, Address, Bytes, B256};
use verdict_crypto::eip712::{address_word, bool_word, u64_word, TypedDomain};
use verdict_crypto::{Signature65, Signer};

use crate::{AttestationError, AttestationResult};

const PROXY_DOMAIN_NAME: &str = "EIP712Proxy";
const PROXY_DOMAIN_VERSION: &str = "1.2.0";

/// `keccak256` of the proxy's `Attest` type string.
fn attest_type_hash() -> B256 {
    keccak256(
        b"Attest(bytes32 schema,address recipient,uint64 expirationTime,bool revocable,\
          bytes32 refUID,bytes data,uint256 value,uint64 deadline)",
    )
}

/// One delegated attestation attempt, built fresh per try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedAttestationRequest {
    pub schema_uid: B256,
    pub recipient: Address,
    /// 0 means the attestation never expires
    pub expiration_time: u64,
    pub revocable: bool,
    /// Zero when the attestation references nothing
    pub ref_uid: B256,
    /// Schema-encoded payload
    pub data: Bytes,
    pub value: alloy_primitives::U256,
    /// Unix timestamp after which the signature is no longer accepted
    pub deadline: u64,
}

impl DelegatedAttestationRequest {
    /// A vote attestation request: never expires, revocable, carries no
    /// ether and references nothing.
    pub fn for_vote(schema_uid: B256, recipient: Address, data: Bytes, deadline: u64) -> Self {
        Self {
            schema_uid,
            recipient,
            expiration_time: 0,
            revocable: true,
            ref_uid: B256::ZERO,
            data,
            value: alloy_primitives::U256::ZERO,
            deadline,
        }
    }

    /// Check the request before any signing or network work.
    ///
    /// `now` is the attestation chain's current block timestamp.
    pub fn validate(&self, now: u64) -> AttestationResult<()> {
        if self.schema_uid == B256::ZERO {
            return Err(AttestationError::InvalidRequest(
                "schema id must be non-zero".to_string(),
            ));
        }
        if self.deadline <= now {
            return Err(AttestationError::InvalidRequest(format!(
                "deadline {} is not in the future (chain time {})",
                self.deadline, now
            )));
        }
        Ok(())
    }

    /// EIP-712 struct hash of the `Attest` record.
    ///
    /// Dynamic fields (`data`) contribute their keccak hash, per EIP-712.
    pub fn struct_hash(&self) -> B256 {
        let mut buf = Vec::with_capacity(32 * 9);
        buf.extend_from_slice(attest_type_hash().as_slice());
        buf.extend_from_slice(self.schema_uid.as_slice());
        buf.extend_from_slice(&address_word(self.recipient));
        buf.extend_from_slice(&u64_word(self.expiration_time));
        buf.extend_from_slice(&bool_word(self.revocable));
        buf.extend_from_slice(self.ref_uid.as_slice());
        buf.extend_from_slice(keccak256(&self.data).as_slice());
        buf.extend_from_slice(&self.value.to_be_bytes::<32>());
        buf.extend_from_slice(&u64_word(self.deadline));
        keccak256(&buf)
    }

    /// The signing digest under the registry's proxy domain on `chain_id`.
    pub fn signing_digest(&self, chain_id: u64, registry: Address) -> B256 {
        TypedDomain::new(PROXY_DOMAIN_NAME, PROXY_DOMAIN_VERSION, chain_id, registry)
            .digest(self.struct_hash())
    }
}

/// Sign a delegated attestation request under the registry's domain.
pub fn sign_delegated_attestation(
    signer: &Signer,
    request: &DelegatedAttestationRequest,
    chain_id: u64,
    registry: Address,
) -> AttestationResult<Signature65> {
    if request.schema_uid == B256::ZERO {
        return Err(AttestationError::InvalidRequest(
            "schema id must be non-zero".to_string(),
        ));
    }
    let digest = request.signing_digest(chain_id, registry);
    Ok(signer.sign_hash(digest)?)
}

#[cfg(test)]
mod tests {
    use verdict_crypto::recover_address;

    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn registry() -> Address {
        "0x4200000000000000000000000000000000000021".parse().unwrap()
    }

    fn request() -> DelegatedAttestationRequest {
        DelegatedAttestationRequest::for_vote(
            B256::repeat_byte(0x01),
            Address::repeat_byte(0x42),
            Bytes::from_static(b"payload"),
            1_700_003_600,
        )
    }

    #[test]
    fn vote_request_defaults() {
        let req = request();
        assert_eq!(req.expiration_time, 0);
        assert!(req.revocable);
        assert_eq!(req.ref_uid, B256::ZERO);
        assert_eq!(req.value, alloy_primitives::U256::ZERO);
    }

    #[test]
    fn validation_rejects_zero_schema_and_past_deadline() {
        let mut req = request();
        req.schema_uid = B256::ZERO;
        assert!(matches!(
            req.validate(1_700_000_000),
            Err(AttestationError::InvalidRequest(_))
        ));

        let req = request();
        assert!(req.validate(1_700_000_000).is_ok());
        assert!(req.validate(1_700_003_600).is_err());
    }

    #[test]
    fn signature_is_bound_to_chain_and_registry() {
        let signer = Signer::from_hex(TEST_KEY).unwrap();
        let req = request();

        let base_digest = req.signing_digest(8453, registry());
        assert_ne!(base_digest, req.signing_digest(100, registry()));
        assert_ne!(
            base_digest,
            req.signing_digest(8453, Address::repeat_byte(0x99))
        );

        // A signature over the Base digest recovers the signer only there.
        let sig = sign_delegated_attestation(&signer, &req, 8453, registry()).unwrap();
        assert_eq!(recover_address(base_digest, &sig).unwrap(), signer.address());
        assert_ne!(
            recover_address(req.signing_digest(100, registry()), &sig).unwrap(),
            signer.address()
        );
    }

    #[test]
    fn signing_refuses_zero_schema() {
        let signer = Signer::from_hex(TEST_KEY).unwrap();
        let mut req = request();
        req.schema_uid = B256::ZERO;
        assert!(sign_delegated_attestation(&signer, &req, 8453, registry()).is_err());
    }
}
