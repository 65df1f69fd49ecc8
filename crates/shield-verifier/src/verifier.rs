use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shield_credential::{
    Credential, CredentialIssuer, CredentialKind, CredentialSubject, CredentialValidator,
    ProofVerifier, TrustedIssuers,
};
use shield_detection::DetectionConfig;
use shield_incident::{Incident, IncidentStatus};
use tracing::{info, warn};

use crate::config::RecheckConfig;
use crate::error::{VerifierError, VerifierResult};
use crate::recheck::{recheck, RecheckVerdict};

/// Credentials produced by adjudicating one finding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub incident_id: String,
    pub verified: bool,
    pub notes: String,
    /// VerifiedIncident or FalsePositive, answering the finding
    pub verdict: Credential,
    /// SafeToUse for the previous release (verified) or the flagged release
    /// (false positive)
    pub attestation: Option<Credential>,
    pub new_status: IncidentStatus,
}

impl VerificationOutcome {
    /// Verdict first, then the attestation if any.
    pub fn credentials(&self) -> impl Iterator<Item = &Credential> {
        std::iter::once(&self.verdict).chain(self.attestation.iter())
    }

    pub fn credential_ids(&self) -> Vec<String> {
        self.credentials().map(|c| c.id.clone()).collect()
    }
}

/// Adjudicates findings from trusted scanners.
pub struct Verifier {
    issuer: CredentialIssuer,
    findings: CredentialValidator,
    detection: DetectionConfig,
    config: RecheckConfig,
}

impl Verifier {
    pub fn new(
        issuer: CredentialIssuer,
        verifier: Arc<dyn ProofVerifier>,
        trusted_scanners: TrustedIssuers,
        detection: DetectionConfig,
        config: RecheckConfig,
    ) -> Self {
        Self {
            issuer,
            findings: CredentialValidator::new(verifier, trusted_scanners)
                .accepting(CredentialKind::RiskFinding),
            detection,
            config,
        }
    }

    pub fn issuer_id(&self) -> &str {
        self.issuer.issuer_id()
    }

    pub fn config(&self) -> &RecheckConfig {
        &self.config
    }

    /// Re-check the incident's indicators without minting anything.
    pub fn recheck(&self, incident: &Incident) -> RecheckVerdict {
        recheck(
            &incident.indicators,
            &incident.package_name,
            &self.detection,
            &self.config,
        )
    }

    /// Validate `finding`, re-check `incident`, and mint the verdict.
    ///
    /// A confirmed incident gets a short-lived SafeToUse for `prev_version`
    /// when one is known. A false positive gets a longer-lived SafeToUse for
    /// the flagged version itself.
    pub fn adjudicate(
        &self,
        finding: &Credential,
        incident: &Incident,
        prev_version: Option<&str>,
        now: DateTime<Utc>,
    ) -> VerifierResult<VerificationOutcome> {
        let validity = self.findings.validate_at(finding, now);
        if !validity.is_valid() {
            warn!(
                credential_id = %finding.id,
                issuer = %finding.issuer_id,
                reason = %validity,
                "Finding rejected"
            );
            return Err(VerifierError::UntrustedFinding {
                credential_id: finding.id.clone(),
                reason: validity.to_string(),
            });
        }
        let bound_elsewhere = finding
            .subject
            .incident_id
            .as_deref()
            .is_some_and(|id| id != incident.id);
        if !finding.subject.names(&incident.package_name, &incident.version) || bound_elsewhere {
            return Err(VerifierError::SubjectMismatch {
                credential_id: finding.id.clone(),
                incident_id: incident.id.clone(),
            });
        }
        if incident.status != IncidentStatus::Detected {
            return Err(VerifierError::AlreadyAdjudicated {
                incident_id: incident.id.clone(),
                status: incident.status,
            });
        }

        let verdict = self.recheck(incident);
        let subject = CredentialSubject::package(&incident.package_name, &incident.version)
            .with_incident(&incident.id)
            .answering(&finding.id);

        let outcome = if verdict.verified {
            let credential = self.issuer.verified_incident(subject, &verdict.notes, now)?;
            let attestation = match prev_version {
                Some(prev) => Some(self.issuer.safe_to_use(
                    CredentialSubject::package(&incident.package_name, prev)
                        .with_incident(&incident.id),
                    self.config.verified_attestation_ttl()?,
                    now,
                )?),
                None => None,
            };
            VerificationOutcome {
                incident_id: incident.id.clone(),
                verified: true,
                notes: verdict.notes,
                verdict: credential,
                attestation,
                new_status: IncidentStatus::Verified,
            }
        } else {
            let credential = self.issuer.false_positive(subject, &verdict.notes, now)?;
            let attestation = self.issuer.safe_to_use(
                CredentialSubject::package(&incident.package_name, &incident.version)
                    .with_incident(&incident.id),
                self.config.false_positive_attestation_ttl()?,
                now,
            )?;
            VerificationOutcome {
                incident_id: incident.id.clone(),
                verified: false,
                notes: verdict.notes,
                verdict: credential,
                attestation: Some(attestation),
                new_status: IncidentStatus::FalsePositive,
            }
        };

        info!(
            incident_id = %incident.id,
            package = %incident.package_name,
            version = %incident.version,
            verified = outcome.verified,
            credentials = outcome.credential_ids().len(),
            "Finding adjudicated"
        );
        Ok(outcome)
    }
}
