//! Proof schemes.
//!
//! Two schemes share one contract. [`SharedKeyMac`] is HMAC-SHA256 over a
//! secret every issuer holds, so the `issuer_id` it vouches for is only a
//! claimed identity. [`Ed25519Signer`] with [`IssuerKeyRing`] binds each
//! signature to the key registered for the claimed issuer; unknown issuers
//! always fail.

use std::collections::HashMap;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::credential::Proof;
use crate::error::{CredentialError, CredentialResult};

type HmacSha256 = Hmac<Sha256>;

pub const HMAC_PROOF_TYPE: &str = "HmacSignature2024";
pub const ED25519_PROOF_TYPE: &str = "Ed25519Signature2020";

/// Issuer-side half of a proof scheme.
pub trait ProofSigner: Send + Sync {
    /// Value written to `proof.type`.
    fn proof_type(&self) -> &str;

    /// Sign canonical credential bytes, returning the hex signature.
    fn sign(&self, canonical: &[u8]) -> CredentialResult<String>;
}

/// Holder-side half of a proof scheme.
pub trait ProofVerifier: Send + Sync {
    /// Check `proof` against `canonical` for the claimed issuer.
    ///
    /// Total: any malformed input yields `false`.
    fn verify_proof(&self, issuer_id: &str, canonical: &[u8], proof: &Proof) -> bool;
}

/// HMAC-SHA256 with one secret shared by every issuer.
pub struct SharedKeyMac {
    key: Zeroizing<Vec<u8>>,
}

impl SharedKeyMac {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            key: Zeroizing::new(secret.into()),
        }
    }

    fn mac(&self, payload: &[u8]) -> CredentialResult<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|err| CredentialError::Signing(format!("invalid hmac key: {err}")))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

impl ProofSigner for SharedKeyMac {
    fn proof_type(&self) -> &str {
        HMAC_PROOF_TYPE
    }

    fn sign(&self, canonical: &[u8]) -> CredentialResult<String> {
        Ok(hex::encode(self.mac(canonical)?))
    }
}

impl ProofVerifier for SharedKeyMac {
    fn verify_proof(&self, _issuer_id: &str, canonical: &[u8], proof: &Proof) -> bool {
        if proof.proof_type != HMAC_PROOF_TYPE {
            return false;
        }
        let Ok(stored) = hex::decode(&proof.signature) else {
            return false;
        };
        let Ok(expected) = self.mac(canonical) else {
            return false;
        };
        if stored.len() != expected.len() {
            return false;
        }
        expected.ct_eq(stored.as_slice()).into()
    }
}

/// Per-issuer Ed25519 signing key.
pub struct Ed25519Signer {
    signing_key: SigningKey,
}

impl Ed25519Signer {
    pub fn new(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    pub fn from_hex(issuer_id: &str, secret_hex: &str) -> CredentialResult<Self> {
        let bytes = Zeroizing::new(decode_fixed::<32>(issuer_id, secret_hex)?);
        Ok(Self::new(SigningKey::from_bytes(&bytes)))
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl ProofSigner for Ed25519Signer {
    fn proof_type(&self) -> &str {
        ED25519_PROOF_TYPE
    }

    fn sign(&self, canonical: &[u8]) -> CredentialResult<String> {
        let signature = self.signing_key.sign(canonical);
        Ok(hex::encode(signature.to_bytes()))
    }
}

/// Lookup from issuer id to its declared verification key.
#[derive(Clone, Debug, Default)]
pub struct IssuerKeyRing {
    keys: HashMap<String, VerifyingKey>,
}

impl IssuerKeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, issuer_id: impl Into<String>, key: VerifyingKey) {
        self.keys.insert(issuer_id.into(), key);
    }

    pub fn register_hex(&mut self, issuer_id: &str, public_hex: &str) -> CredentialResult<()> {
        let bytes = decode_fixed::<32>(issuer_id, public_hex)?;
        let key = VerifyingKey::from_bytes(&bytes).map_err(|err| CredentialError::InvalidKey {
            issuer: issuer_id.to_string(),
            reason: err.to_string(),
        })?;
        self.register(issuer_id, key);
        Ok(())
    }

    pub fn key_for(&self, issuer_id: &str) -> Option<&VerifyingKey> {
        self.keys.get(issuer_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl ProofVerifier for IssuerKeyRing {
    fn verify_proof(&self, issuer_id: &str, canonical: &[u8], proof: &Proof) -> bool {
        if proof.proof_type != ED25519_PROOF_TYPE {
            return false;
        }
        let Some(key) = self.keys.get(issuer_id) else {
            return false;
        };
        let Ok(raw) = hex::decode(&proof.signature) else {
            return false;
        };
        let Ok(bytes) = <[u8; 64]>::try_from(raw.as_slice()) else {
            return false;
        };
        key.verify(canonical, &Signature::from_bytes(&bytes)).is_ok()
    }
}

fn decode_fixed<const N: usize>(issuer_id: &str, text: &str) -> CredentialResult<[u8; N]> {
    let raw = Zeroizing::new(hex::decode(text.trim()).map_err(|err| {
        CredentialError::InvalidKey {
            issuer: issuer_id.to_string(),
            reason: err.to_string(),
        }
    })?);
    <[u8; N]>::try_from(raw.as_slice()).map_err(|_| CredentialError::InvalidKey {
        issuer: issuer_id.to_string(),
        reason: format!("expected {N} bytes, got {}", raw.len()),
    })
}
