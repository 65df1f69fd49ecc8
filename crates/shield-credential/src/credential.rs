use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::canonicalize;
use crate::error::{CredentialError, CredentialResult};
use crate::proof::ProofVerifier;

/// Discriminator for the four credential kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CredentialKind {
    #[serde(rename = "RiskFindingCredential")]
    RiskFinding,
    #[serde(rename = "VerifiedIncidentCredential")]
    VerifiedIncident,
    #[serde(rename = "FalsePositiveCredential")]
    FalsePositive,
    #[serde(rename = "SafeToUseAttestation")]
    SafeToUse,
}

impl CredentialKind {
    /// Wire name used in the `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKind::RiskFinding => "RiskFindingCredential",
            CredentialKind::VerifiedIncident => "VerifiedIncidentCredential",
            CredentialKind::FalsePositive => "FalsePositiveCredential",
            CredentialKind::SafeToUse => "SafeToUseAttestation",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a credential is about: a package version, optionally an incident, and
/// for verdict credentials the finding they answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSubject {
    pub package_name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_finding_id: Option<String>,
}

impl CredentialSubject {
    pub fn package(package_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            version: version.into(),
            incident_id: None,
            original_finding_id: None,
        }
    }

    pub fn with_incident(mut self, incident_id: impl Into<String>) -> Self {
        self.incident_id = Some(incident_id.into());
        self
    }

    pub fn answering(mut self, finding_id: impl Into<String>) -> Self {
        self.original_finding_id = Some(finding_id.into());
        self
    }

    /// Whether this subject names exactly `package_name@version`.
    pub fn names(&self, package_name: &str, version: &str) -> bool {
        self.package_name == package_name && self.version == version
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskFindingClaims {
    pub reasons: Vec<String>,
    pub confidence: f64,
    pub evidence_hashes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIncidentClaims {
    pub verification_status: String,
    pub notes: String,
}

impl VerifiedIncidentClaims {
    pub fn confirmed(notes: impl Into<String>) -> Self {
        Self {
            verification_status: "confirmed".into(),
            notes: notes.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FalsePositiveClaims {
    pub determination: String,
    pub reason: String,
}

impl FalsePositiveClaims {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            determination: "false_positive".into(),
            reason: reason.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeToUseClaims {
    pub attestation: String,
    pub scope: String,
}

impl Default for SafeToUseClaims {
    fn default() -> Self {
        Self {
            attestation: "safe_to_use".into(),
            scope: "version_specific".into(),
        }
    }
}

/// Kind-tagged claims payload.
///
/// Serialized adjacently as `"type": <kind>, "claims": {..}` so the kind and its
/// payload can never disagree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "claims")]
pub enum CredentialClaims {
    #[serde(rename = "RiskFindingCredential")]
    RiskFinding(RiskFindingClaims),
    #[serde(rename = "VerifiedIncidentCredential")]
    VerifiedIncident(VerifiedIncidentClaims),
    #[serde(rename = "FalsePositiveCredential")]
    FalsePositive(FalsePositiveClaims),
    #[serde(rename = "SafeToUseAttestation")]
    SafeToUse(SafeToUseClaims),
}

impl CredentialClaims {
    pub fn kind(&self) -> CredentialKind {
        match self {
            CredentialClaims::RiskFinding(_) => CredentialKind::RiskFinding,
            CredentialClaims::VerifiedIncident(_) => CredentialKind::VerifiedIncident,
            CredentialClaims::FalsePositive(_) => CredentialKind::FalsePositive,
            CredentialClaims::SafeToUse(_) => CredentialKind::SafeToUse,
        }
    }

    /// Name of the first float claim that has no JSON representation.
    fn non_finite_field(&self) -> Option<&'static str> {
        match self {
            CredentialClaims::RiskFinding(c) if !c.confidence.is_finite() => Some("confidence"),
            _ => None,
        }
    }
}

/// Proof attached to a minted credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    #[serde(rename = "type", default)]
    pub proof_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(rename = "verificationMethod", default)]
    pub verification_method: String,
    pub signature: String,
}

/// A signed, typed claim about a package version.
///
/// Immutable once minted: corrections are new credentials of a different kind
/// referencing this one through `subject.original_finding_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    #[serde(rename = "issuer_did", alias = "issuer_id")]
    pub issuer_id: String,
    pub subject: CredentialSubject,
    #[serde(rename = "issuance_date", alias = "issuance_time")]
    pub issuance_time: DateTime<Utc>,
    #[serde(
        rename = "expiration_date",
        alias = "expiration_time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_time: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub claims: CredentialClaims,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
}

impl Credential {
    pub fn kind(&self) -> CredentialKind {
        self.claims.kind()
    }

    /// Canonical bytes over every field except `proof`.
    ///
    /// Fails for NaN or infinite claim values, which JSON would silently turn
    /// into `null`.
    pub fn canonical_bytes(&self) -> CredentialResult<Vec<u8>> {
        if let Some(field) = self.claims.non_finite_field() {
            return Err(CredentialError::Serialization(format!(
                "claim `{field}` is not a finite number"
            )));
        }
        let mut value = serde_json::to_value(self)?;
        if let Some(map) = value.as_object_mut() {
            map.remove("proof");
        }
        Ok(canonicalize(&value).into_bytes())
    }

    /// Recompute the proof and compare it with the stored signature.
    ///
    /// Returns `false` when the proof is absent, malformed, or does not match.
    /// A `true` result says nothing about whether `issuer_id` is trusted.
    pub fn verify(&self, verifier: &dyn ProofVerifier) -> bool {
        let Some(proof) = self.proof.as_ref() else {
            return false;
        };
        if proof.signature.is_empty() {
            return false;
        }
        let Ok(canonical) = self.canonical_bytes() else {
            return false;
        };
        verifier.verify_proof(&self.issuer_id, &canonical, proof)
    }

    /// True when the credential carries an expiry at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.is_some_and(|exp| exp <= now)
    }

    pub fn risk_finding(&self) -> Option<&RiskFindingClaims> {
        match &self.claims {
            CredentialClaims::RiskFinding(claims) => Some(claims),
            _ => None,
        }
    }
}
