//! Cryptographic utilities for the Verdict agent.
//!
//! This crate owns the agent's signing key and everything that is hashed or
//! signed on its behalf: secp256k1 recoverable signatures, EIP-712 typed-data
//! digests, and the multisig transaction domain hash.

use std::env;
use std::fs;
use std::path::Path;

use alloy_primitives::{keccak256, Address, B256};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use thiserror::Error;
use tracing::{info, warn};

pub mod eip712;
pub mod safe;

/// Name of the key file inside the configured key directory.
pub const KEY_FILE_NAME: &str = "ethereum_private_key.txt";

/// Environment variable consulted when no key file is present.
pub const KEY_ENV_VAR: &str = "VERDICT_PRIVATE_KEY";

/// Errors for key handling and signing operations
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No signing key available from the key file or the environment
    #[error("signing key not found: no {KEY_FILE_NAME} and no {KEY_ENV_VAR} set")]
    KeyNotFound,

    /// A key was found but is not a valid secp256k1 private key
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    /// Failure while producing a signature
    #[error("signing failed: {0}")]
    Signing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// A 65-byte recoverable signature, decomposed as `v`, `r`, `s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature65 {
    /// Recovery byte, 27 or 28
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl Signature65 {
    /// Serialize as `r || s || v`, the layout contracts expect.
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(self.r.as_slice());
        out[32..64].copy_from_slice(self.s.as_slice());
        out[64] = self.v;
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != 65 {
            return Err(CryptoError::Signing(format!(
                "invalid signature length: {}, expected 65",
                bytes.len()
            )));
        }
        Ok(Self {
            v: bytes[64],
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..64]),
        })
    }
}

/// The agent's signing identity: a secp256k1 key and its derived address.
#[derive(Clone)]
pub struct Signer {
    key: SigningKey,
    address: Address,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Load the signing key from the key file in `key_dir`, falling back to
    /// the `VERDICT_PRIVATE_KEY` environment variable.
    pub fn load(key_dir: &Path) -> CryptoResult<Self> {
        let key_path = key_dir.join(KEY_FILE_NAME);
        if key_path.exists() {
            check_key_file_permissions(&key_path);
            let contents = fs::read_to_string(&key_path)?;
            let signer = Self::from_hex(contents.trim())?;
            info!(address = %signer.address, "loaded signing key from file");
            return Ok(signer);
        }
        if let Ok(value) = env::var(KEY_ENV_VAR) {
            let signer = Self::from_hex(value.trim())?;
            info!(address = %signer.address, "loaded signing key from environment");
            return Ok(signer);
        }
        Err(CryptoError::KeyNotFound)
    }

    /// Construct a signer from a hex-encoded private key, with or without a
    /// `0x` prefix.
    pub fn from_hex(key_hex: &str) -> CryptoResult<Self> {
        let stripped = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        if stripped.len() != 64 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(CryptoError::InvalidKey(
                "expected 64 hex characters, optionally 0x-prefixed".to_string(),
            ));
        }
        let bytes = hex::decode(stripped)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let address = address_from_key(key.verifying_key());
        Ok(Self { key, address })
    }

    /// The agent's own address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest, returning a recoverable signature with `s`
    /// normalized to the lower half-order as Ethereum requires.
    pub fn sign_hash(&self, digest: B256) -> CryptoResult<Signature65> {
        let (signature, recovery_id): (EcdsaSignature, RecoveryId) = self
            .key
            .sign_prehash(digest.as_slice())
            .map_err(|e| CryptoError::Signing(e.to_string()))?;

        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => {
                let flipped = RecoveryId::from_byte(recovery_id.to_byte() ^ 1)
                    .ok_or_else(|| CryptoError::Signing("invalid recovery id".to_string()))?;
                (normalized, flipped)
            }
            None => (signature, recovery_id),
        };

        let (r, s) = signature.split_bytes();
        Ok(Signature65 {
            v: 27 + recovery_id.to_byte(),
            r: B256::from_slice(r.as_slice()),
            s: B256::from_slice(s.as_slice()),
        })
    }
}

/// Recover the signing address from a digest and a 65-byte signature.
pub fn recover_address(digest: B256, signature: &Signature65) -> CryptoResult<Address> {
    let ecdsa = EcdsaSignature::from_slice(&signature.to_bytes()[..64])
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(signature.v.wrapping_sub(27))
        .ok_or_else(|| CryptoError::Signing(format!("invalid v byte: {}", signature.v)))?;
    let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &ecdsa, recovery_id)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    Ok(address_from_key(&key))
}

fn address_from_key(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(unix)]
fn check_key_file_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(metadata) = fs::metadata(path) {
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            warn!(
                path = %path.display(),
                mode = format!("{:o}", mode),
                "key file is readable by other users; expected 600"
            );
        }
    }
}

#[cfg(not(unix))]
fn check_key_file_permissions(_path: &Path) {}
