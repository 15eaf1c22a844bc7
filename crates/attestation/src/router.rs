//! Routing a signed attestation to its call target.
//!
//! Two contracts accept delegated attestations and expose different call
//! shapes for the same protocol. The tracking wrapper takes a flat
//! 12-parameter call; the registry's typed-data proxy takes a nested
//! record. The target is resolved once per call from configuration and the
//! shape follows from the target, never from runtime branching downstream.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use verdict_config::AttestationConfig;
use verdict_crypto::Signature65;

use crate::{AttestationError, AttestationResult, DelegatedAttestationRequest};

sol! {
    struct AttestationRequestData {
        address recipient;
        uint64 expirationTime;
        bool revocable;
        bytes32 refUID;
        bytes data;
        uint256 value;
    }

    struct Eip712Signature {
        uint8 v;
        bytes32 r;
        bytes32 s;
    }

    struct DelegatedProxyAttestationRequest {
        bytes32 schema;
        AttestationRequestData data;
        Eip712Signature signature;
        address attester;
        uint64 deadline;
    }

    interface IAttestationProxy {
        function attestByDelegation(DelegatedProxyAttestationRequest delegatedRequest)
            external
            payable
            returns (bytes32);
    }

    interface IAttestationTracker {
        function attestByDelegation(
            bytes32 schema,
            address recipient,
            uint64 expirationTime,
            bool revocable,
            bytes32 refUID,
            bytes data,
            uint256 value,
            uint8 v,
            bytes32 r,
            bytes32 s,
            address attester,
            uint64 deadline
        ) external payable returns (bytes32);
    }
}

/// Where a signed attestation is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingTarget {
    /// Tracking wrapper that forwards to the registry (flat call shape)
    Wrapper(Address),
    /// Registry typed-data proxy (nested-record call shape)
    Direct(Address),
}

impl RoutingTarget {
    /// Resolve the target from configuration: the wrapper when one is
    /// configured, the registry proxy otherwise.
    pub fn from_config(config: &AttestationConfig) -> AttestationResult<Self> {
        if let Some(wrapper) = config.wrapper_address {
            return Ok(RoutingTarget::Wrapper(wrapper));
        }
        config
            .registry_address
            .map(RoutingTarget::Direct)
            .ok_or_else(|| {
                AttestationError::Config(
                    "no attestation registry or wrapper address configured".to_string(),
                )
            })
    }

    pub fn address(&self) -> Address {
        match self {
            RoutingTarget::Wrapper(addr) | RoutingTarget::Direct(addr) => *addr,
        }
    }
}

/// A fully shaped attestation call, ready for multisig submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedCall {
    pub to: Address,
    pub calldata: Bytes,
    pub value: U256,
    /// Fixed allowance; the wrapper path performs a nested call into the
    /// registry and needs materially more gas than direct calls.
    pub gas: u64,
}

/// Shape the calldata for `target` from a signed request.
///
/// Both shapes carry the identical signed payload; only the parameter
/// layout differs.
pub fn route(
    target: RoutingTarget,
    request: &DelegatedAttestationRequest,
    signature: &Signature65,
    attester: Address,
    gas: u64,
) -> RoutedCall {
    let calldata = match target {
        RoutingTarget::Wrapper(_) => IAttestationTracker::attestByDelegationCall {
            schema: request.schema_uid,
            recipient: request.recipient,
            expirationTime: request.expiration_time,
            revocable: request.revocable,
            refUID: request.ref_uid,
            data: request.data.clone(),
            value: request.value,
            v: signature.v,
            r: signature.r,
            s: signature.s,
            attester,
            deadline: request.deadline,
        }
        .abi_encode(),
        RoutingTarget::Direct(_) => IAttestationProxy::attestByDelegationCall {
            delegatedRequest: DelegatedProxyAttestationRequest {
                schema: request.schema_uid,
                data: AttestationRequestData {
                    recipient: request.recipient,
                    expirationTime: request.expiration_time,
                    revocable: request.revocable,
                    refUID: request.ref_uid,
                    data: request.data.clone(),
                    value: request.value,
                },
                signature: Eip712Signature {
                    v: signature.v,
                    r: signature.r,
                    s: signature.s,
                },
                attester,
                deadline: request.deadline,
            },
        }
        .abi_encode(),
    };

    RoutedCall {
        to: target.address(),
        calldata: Bytes::from(calldata),
        value: request.value,
        gas,
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;

    use super::*;

    fn request() -> DelegatedAttestationRequest {
        DelegatedAttestationRequest::for_vote(
            B256::repeat_byte(0x01),
            Address::repeat_byte(0x42),
            Bytes::from_static(b"vote payload"),
            1_700_003_600,
        )
    }

    fn signature() -> Signature65 {
        Signature65 {
            v: 28,
            r: B256::repeat_byte(0xaa),
            s: B256::repeat_byte(0xbb),
        }
    }

    #[test]
    fn wrapper_wins_when_both_are_configured() {
        let config = AttestationConfig {
            registry_address: Some(Address::repeat_byte(0x01)),
            wrapper_address: Some(Address::repeat_byte(0x02)),
            ..AttestationConfig::default()
        };
        assert_eq!(
            RoutingTarget::from_config(&config).unwrap(),
            RoutingTarget::Wrapper(Address::repeat_byte(0x02))
        );

        let direct_only = AttestationConfig {
            registry_address: Some(Address::repeat_byte(0x01)),
            ..AttestationConfig::default()
        };
        assert_eq!(
            RoutingTarget::from_config(&direct_only).unwrap(),
            RoutingTarget::Direct(Address::repeat_byte(0x01))
        );

        assert!(RoutingTarget::from_config(&AttestationConfig::default()).is_err());
    }

    #[test]
    fn shapes_diverge_but_carry_the_same_payload() {
        let req = request();
        let sig = signature();
        let attester = Address::repeat_byte(0x07);

        let flat = route(
            RoutingTarget::Wrapper(Address::repeat_byte(0x02)),
            &req,
            &sig,
            attester,
            1_000_000,
        );
        let nested = route(
            RoutingTarget::Direct(Address::repeat_byte(0x01)),
            &req,
            &sig,
            attester,
            1_000_000,
        );

        assert_ne!(flat.calldata[..4], nested.calldata[..4]);
        assert_ne!(flat.calldata, nested.calldata);

        let flat_call =
            IAttestationTracker::attestByDelegationCall::abi_decode(&flat.calldata, true).unwrap();
        let nested_call =
            IAttestationProxy::attestByDelegationCall::abi_decode(&nested.calldata, true).unwrap();

        assert_eq!(flat_call.recipient, nested_call.delegatedRequest.data.recipient);
        assert_eq!(flat_call.data, nested_call.delegatedRequest.data.data);
        assert_eq!(flat_call.deadline, nested_call.delegatedRequest.deadline);
        assert_eq!(flat_call.v, nested_call.delegatedRequest.signature.v);
    }

    #[test]
    fn routed_call_targets_the_resolved_contract() {
        let wrapper = Address::repeat_byte(0x02);
        let call = route(
            RoutingTarget::Wrapper(wrapper),
            &request(),
            &signature(),
            Address::repeat_byte(0x07),
            1_000_000,
        );
        assert_eq!(call.to, wrapper);
        assert_eq!(call.gas, 1_000_000);
        assert_eq!(call.value, U256::ZERO);
    }
}
