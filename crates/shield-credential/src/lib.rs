//! # shield-credential
//!
//! Signed, typed claims about package releases.
//!
//! A [`Credential`] is minted by a [`CredentialIssuer`], which computes a proof
//! over the canonical JSON of every field except `proof`. Any holder of the
//! matching [`ProofVerifier`] can check it without contacting the issuer.
//!
//! ## Trust
//!
//! `Credential::verify` only says the bytes were not altered since signing.
//! Whether the issuer is one you accept is a separate question answered by
//! [`CredentialValidator`], which also enforces expiry.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod canonical;
pub mod credential;
pub mod error;
pub mod issuer;
pub mod proof;
pub mod trust;

pub use canonical::canonicalize;
pub use credential::{
    Credential, CredentialClaims, CredentialKind, CredentialSubject, FalsePositiveClaims, Proof,
    RiskFindingClaims, SafeToUseClaims, VerifiedIncidentClaims,
};
pub use error::{CredentialError, CredentialResult};
pub use issuer::CredentialIssuer;
pub use proof::{
    Ed25519Signer, IssuerKeyRing, ProofSigner, ProofVerifier, SharedKeyMac, ED25519_PROOF_TYPE,
    HMAC_PROOF_TYPE,
};
pub use trust::{CredentialValidator, TrustedIssuers, Validity};
