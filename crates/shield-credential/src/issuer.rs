use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::credential::{
    Credential, CredentialClaims, CredentialSubject, FalsePositiveClaims, Proof,
    RiskFindingClaims, SafeToUseClaims, VerifiedIncidentClaims,
};
use crate::error::{CredentialError, CredentialResult};
use crate::proof::ProofSigner;

/// Mints credentials under one issuer identity.
#[derive(Clone)]
pub struct CredentialIssuer {
    issuer_id: String,
    signer: Arc<dyn ProofSigner>,
}

impl CredentialIssuer {
    pub fn new(issuer_id: impl Into<String>, signer: Arc<dyn ProofSigner>) -> Self {
        Self {
            issuer_id: issuer_id.into(),
            signer,
        }
    }

    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    /// Mint a credential issued now.
    pub fn mint(
        &self,
        subject: CredentialSubject,
        claims: CredentialClaims,
        ttl: Option<Duration>,
    ) -> CredentialResult<Credential> {
        self.mint_at(subject, claims, ttl, Utc::now())
    }

    /// Mint a credential with an explicit issuance time.
    ///
    /// Assigns a fresh id, stamps `issuance_time = now` and
    /// `expiration_time = now + ttl`, then signs the canonical form.
    /// A non-positive `ttl`, or one that runs past the representable range,
    /// is rejected.
    pub fn mint_at(
        &self,
        subject: CredentialSubject,
        claims: CredentialClaims,
        ttl: Option<Duration>,
        now: DateTime<Utc>,
    ) -> CredentialResult<Credential> {
        let expiration_time = ttl.map(|ttl| expiry_after(now, ttl)).transpose()?;
        let mut credential = Credential {
            id: uuid::Uuid::new_v4().to_string(),
            issuer_id: self.issuer_id.clone(),
            subject,
            issuance_time: now,
            expiration_time,
            claims,
            proof: None,
        };

        let canonical = credential.canonical_bytes()?;
        let signature = self.signer.sign(&canonical)?;
        credential.proof = Some(Proof {
            proof_type: self.signer.proof_type().to_string(),
            created: Some(now),
            verification_method: format!("{}#key-1", self.issuer_id),
            signature,
        });

        debug!(
            credential_id = %credential.id,
            kind = %credential.kind(),
            issuer = %self.issuer_id,
            package = %credential.subject.package_name,
            version = %credential.subject.version,
            "Credential minted"
        );
        Ok(credential)
    }

    pub fn risk_finding(
        &self,
        subject: CredentialSubject,
        reasons: Vec<String>,
        confidence: f64,
        evidence_hashes: Vec<String>,
        now: DateTime<Utc>,
    ) -> CredentialResult<Credential> {
        let claims = CredentialClaims::RiskFinding(RiskFindingClaims {
            reasons,
            confidence,
            evidence_hashes,
        });
        self.mint_at(subject, claims, None, now)
    }

    pub fn verified_incident(
        &self,
        subject: CredentialSubject,
        notes: impl Into<String>,
        now: DateTime<Utc>,
    ) -> CredentialResult<Credential> {
        let claims = CredentialClaims::VerifiedIncident(VerifiedIncidentClaims::confirmed(notes));
        self.mint_at(subject, claims, None, now)
    }

    pub fn false_positive(
        &self,
        subject: CredentialSubject,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> CredentialResult<Credential> {
        let claims = CredentialClaims::FalsePositive(FalsePositiveClaims::new(reason));
        self.mint_at(subject, claims, None, now)
    }

    pub fn safe_to_use(
        &self,
        subject: CredentialSubject,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> CredentialResult<Credential> {
        let claims = CredentialClaims::SafeToUse(SafeToUseClaims::default());
        self.mint_at(subject, claims, Some(ttl), now)
    }
}

fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> CredentialResult<DateTime<Utc>> {
    if ttl <= Duration::zero() {
        return Err(CredentialError::InvalidLifetime(format!(
            "ttl must be positive, got {ttl}"
        )));
    }
    now.checked_add_signed(ttl).ok_or_else(|| {
        CredentialError::InvalidLifetime(format!("{ttl} after {now} is out of range"))
    })
}
