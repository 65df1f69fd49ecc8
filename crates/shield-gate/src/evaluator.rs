use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shield_credential::{
    Credential, CredentialKind, CredentialValidator, ProofVerifier, Validity,
};
use shield_incident::Incident;
use tracing::{debug, info, warn};

use crate::policy::{DefaultPolicy, GatePolicy};

/// Ids of incidents blocking exactly `package_name@version`.
///
/// Only `Detected` and `Verified` incidents block.
pub fn blocking_incidents(incidents: &[Incident], package_name: &str, version: &str) -> Vec<String> {
    incidents
        .iter()
        .filter(|incident| incident.blocks(package_name, version))
        .map(|incident| incident.id.clone())
        .collect()
}

/// Per-candidate verdict, reported back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationAssessment {
    pub id: String,
    pub issuer: String,
    pub valid: bool,
    pub reason: String,
    pub expires: Option<DateTime<Utc>>,
}

/// Which rule produced the decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum GateOutcome {
    /// Blocking incident and no valid attestation
    Blocked,
    /// A valid attestation from `issuer`
    Approved { issuer: String },
    /// Nothing known about the release
    AllowedByDefault,
    /// Nothing proves the release safe and the policy will not assume it
    Undetermined,
}

/// Allow/deny verdict plus the evidence behind it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub allowed: bool,
    pub reason: String,
    pub outcome: GateOutcome,
    pub valid_attestations: Vec<Credential>,
    pub assessments: Vec<AttestationAssessment>,
}

impl GateDecision {
    fn new(
        outcome: GateOutcome,
        valid_attestations: Vec<Credential>,
        assessments: Vec<AttestationAssessment>,
    ) -> Self {
        let (allowed, reason) = match &outcome {
            GateOutcome::Blocked => (
                false,
                "Release blocked pending trusted attestation: awaiting SafeToUseAttestation \
                 from a trusted verifier"
                    .to_string(),
            ),
            GateOutcome::Approved { issuer } => (
                true,
                format!("Package approved via SafeToUseAttestation from {issuer}"),
            ),
            GateOutcome::AllowedByDefault => (
                true,
                "No security incidents or attestations found. Package allowed by default policy."
                    .to_string(),
            ),
            GateOutcome::Undetermined => (
                false,
                "Unable to determine safety: no valid SafeToUseAttestation".to_string(),
            ),
        };
        Self {
            allowed,
            reason,
            outcome,
            valid_attestations,
            assessments,
        }
    }
}

/// Turns blocking state and candidate attestations into a gate decision.
///
/// A candidate counts only if it is a SafeToUse attestation, its proof
/// verifies, its issuer is a trusted verifier, and it has not expired.
#[derive(Clone)]
pub struct TrustEvaluator {
    validator: CredentialValidator,
    default_policy: DefaultPolicy,
}

impl TrustEvaluator {
    pub fn new(verifier: Arc<dyn ProofVerifier>, policy: GatePolicy) -> Self {
        Self {
            validator: CredentialValidator::new(verifier, policy.trusted_verifiers)
                .accepting(CredentialKind::SafeToUse),
            default_policy: policy.default_policy,
        }
    }

    pub fn default_policy(&self) -> DefaultPolicy {
        self.default_policy
    }

    pub fn validator(&self) -> &CredentialValidator {
        &self.validator
    }

    pub fn decide(&self, has_blocking_incident: bool, candidates: &[Credential]) -> GateDecision {
        self.decide_at(has_blocking_incident, candidates, Utc::now())
    }

    /// Evaluate against an explicit clock.
    ///
    /// Candidates are taken to cover the release being gated; use
    /// [`decide_for_at`](Self::decide_for_at) when they come from a source
    /// that does not guarantee it.
    pub fn decide_at(
        &self,
        has_blocking_incident: bool,
        candidates: &[Credential],
        now: DateTime<Utc>,
    ) -> GateDecision {
        self.evaluate(None, has_blocking_incident, candidates, now)
    }

    /// Decide for `package_name@version`, rejecting candidates whose subject
    /// names a different release.
    pub fn decide_for(
        &self,
        package_name: &str,
        version: &str,
        has_blocking_incident: bool,
        candidates: &[Credential],
    ) -> GateDecision {
        self.decide_for_at(package_name, version, has_blocking_incident, candidates, Utc::now())
    }

    pub fn decide_for_at(
        &self,
        package_name: &str,
        version: &str,
        has_blocking_incident: bool,
        candidates: &[Credential],
        now: DateTime<Utc>,
    ) -> GateDecision {
        self.evaluate(
            Some((package_name, version)),
            has_blocking_incident,
            candidates,
            now,
        )
    }

    fn evaluate(
        &self,
        release: Option<(&str, &str)>,
        has_blocking_incident: bool,
        candidates: &[Credential],
        now: DateTime<Utc>,
    ) -> GateDecision {
        let mut valid_attestations = Vec::new();
        let mut assessments = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let validity = match release {
                Some((name, version)) if !candidate.subject.names(name, version) => {
                    Validity::SubjectMismatch {
                        covered: format!(
                            "{}@{}",
                            candidate.subject.package_name, candidate.subject.version
                        ),
                        requested: format!("{name}@{version}"),
                    }
                }
                _ => self.validator.validate_at(candidate, now),
            };
            if !validity.is_valid() {
                debug!(
                    credential_id = %candidate.id,
                    issuer = %candidate.issuer_id,
                    reason = %validity,
                    "Attestation rejected"
                );
            }
            assessments.push(assess(candidate, &validity));
            if validity.is_valid() {
                valid_attestations.push(candidate.clone());
            }
        }

        let first_valid_issuer = valid_attestations.first().map(|c| c.issuer_id.clone());
        let outcome = if has_blocking_incident && first_valid_issuer.is_none() {
            GateOutcome::Blocked
        } else if let Some(issuer) = first_valid_issuer {
            GateOutcome::Approved { issuer }
        } else if !has_blocking_incident && self.default_policy == DefaultPolicy::AllowUnknown {
            GateOutcome::AllowedByDefault
        } else {
            GateOutcome::Undetermined
        };

        let decision = GateDecision::new(outcome, valid_attestations, assessments);
        if decision.allowed {
            info!(
                blocking = has_blocking_incident,
                candidates = candidates.len(),
                outcome = ?decision.outcome,
                "Gate allowed release"
            );
        } else {
            warn!(
                blocking = has_blocking_incident,
                candidates = candidates.len(),
                outcome = ?decision.outcome,
                "Gate denied release"
            );
        }
        decision
    }
}

fn assess(candidate: &Credential, validity: &Validity) -> AttestationAssessment {
    AttestationAssessment {
        id: candidate.id.clone(),
        issuer: candidate.issuer_id.clone(),
        valid: validity.is_valid(),
        reason: validity.to_string(),
        expires: candidate.expiration_time,
    }
}
