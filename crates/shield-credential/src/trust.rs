use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credential::{Credential, CredentialKind};
use crate::proof::ProofVerifier;

/// Allow-list of issuer identities an evaluator accepts claims from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustedIssuers(BTreeSet<String>);

impl TrustedIssuers {
    pub fn new<I, S>(issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(issuers.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, issuer_id: &str) -> bool {
        self.0.contains(issuer_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of validating one credential against a trust policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Validity {
    Valid,
    WrongKind {
        expected: CredentialKind,
        found: CredentialKind,
    },
    InvalidProof,
    UntrustedIssuer(String),
    Expired(DateTime<Utc>),
    /// Covers `covered`, not the release being evaluated
    SubjectMismatch { covered: String, requested: String },
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        matches!(self, Validity::Valid)
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validity::Valid => f.write_str("Valid"),
            Validity::WrongKind { expected, found } => {
                write!(f, "Expected {expected}, found {found}")
            }
            Validity::InvalidProof => f.write_str("Invalid signature"),
            Validity::UntrustedIssuer(issuer) => {
                write!(f, "Issuer {issuer} not in trusted list")
            }
            Validity::Expired(at) => write!(f, "Attestation expired at {}", at.to_rfc3339()),
            Validity::SubjectMismatch { covered, requested } => {
                write!(f, "Attestation covers {covered}, not {requested}")
            }
        }
    }
}

/// Combines proof verification, the trusted-issuer check and the expiry check.
///
/// A valid proof alone never makes a credential usable: the issuer must also
/// be on the allow-list.
#[derive(Clone)]
pub struct CredentialValidator {
    verifier: Arc<dyn ProofVerifier>,
    trusted: TrustedIssuers,
    accepted_kind: Option<CredentialKind>,
}

impl CredentialValidator {
    pub fn new(verifier: Arc<dyn ProofVerifier>, trusted: TrustedIssuers) -> Self {
        Self {
            verifier,
            trusted,
            accepted_kind: None,
        }
    }

    /// Only accept credentials of `kind`.
    pub fn accepting(mut self, kind: CredentialKind) -> Self {
        self.accepted_kind = Some(kind);
        self
    }

    pub fn trusted(&self) -> &TrustedIssuers {
        &self.trusted
    }

    pub fn verifier(&self) -> &dyn ProofVerifier {
        self.verifier.as_ref()
    }

    pub fn validate(&self, credential: &Credential) -> Validity {
        self.validate_at(credential, Utc::now())
    }

    pub fn validate_at(&self, credential: &Credential, now: DateTime<Utc>) -> Validity {
        if let Some(expected) = self.accepted_kind {
            if credential.kind() != expected {
                return Validity::WrongKind {
                    expected,
                    found: credential.kind(),
                };
            }
        }
        if !credential.verify(self.verifier.as_ref()) {
            return Validity::InvalidProof;
        }
        if !self.trusted.contains(&credential.issuer_id) {
            return Validity::UntrustedIssuer(credential.issuer_id.clone());
        }
        match credential.expiration_time {
            Some(exp) if exp <= now => Validity::Expired(exp),
            _ => Validity::Valid,
        }
    }
}
