//! Incident transitions driven by attached credentials.
//!
//! Planning is pure: [`IncidentLifecycle`] inspects an incident snapshot and a
//! credential and returns an [`IncidentUpdate`]. The store applies the update
//! atomically, rejecting it if the incident's status moved in the meantime.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shield_credential::{Credential, CredentialKind, CredentialValidator};
use tracing::{debug, info};

use crate::error::{LifecycleError, LifecycleResult};
use crate::incident::{Incident, IncidentStatus};

/// A planned change to one incident: credentials to append and a status move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentUpdate {
    pub incident_id: String,
    pub credential_ids: Vec<String>,
    /// Status the incident must still have when the update lands
    pub expected_status: IncidentStatus,
    pub new_status: IncidentStatus,
    pub at: DateTime<Utc>,
}

impl IncidentUpdate {
    pub fn changes_status(&self) -> bool {
        self.expected_status != self.new_status
    }

    /// Apply to `incident`, compare-and-set on its status.
    ///
    /// Leaves `incident` untouched on error.
    pub fn apply(&self, incident: &mut Incident) -> LifecycleResult<()> {
        if incident.id != self.incident_id {
            return Err(LifecycleError::WrongIncident {
                expected: self.incident_id.clone(),
                found: incident.id.clone(),
            });
        }
        if incident.status != self.expected_status {
            return Err(LifecycleError::StatusConflict {
                expected: self.expected_status,
                found: incident.status,
            });
        }
        if let Some(dup) = self
            .credential_ids
            .iter()
            .find(|id| incident.has_credential(id))
        {
            return Err(LifecycleError::DuplicateCredential(dup.clone()));
        }

        incident
            .credential_ids
            .extend(self.credential_ids.iter().cloned());
        incident.status = self.new_status;
        incident.updated_at = self.at;
        Ok(())
    }
}

/// Transition rules for incidents.
///
/// Verdict credentials (VerifiedIncident, FalsePositive) move the status and
/// must pass `verdicts`: valid proof, trusted issuer, not expired. Other kinds
/// only need a valid proof and never move the status.
#[derive(Clone)]
pub struct IncidentLifecycle {
    verdicts: CredentialValidator,
}

impl IncidentLifecycle {
    pub fn new(verdicts: CredentialValidator) -> Self {
        Self { verdicts }
    }

    /// Plan attaching `credential` to `incident`.
    pub fn plan_attach(
        &self,
        incident: &Incident,
        credential: &Credential,
        now: DateTime<Utc>,
    ) -> LifecycleResult<IncidentUpdate> {
        check_subject(incident, credential)?;
        if incident.has_credential(&credential.id) {
            return Err(LifecycleError::DuplicateCredential(credential.id.clone()));
        }

        let kind = credential.kind();
        let new_status = match kind {
            CredentialKind::VerifiedIncident => {
                self.require_trusted(credential, now)?;
                transition(kind, incident.status, IncidentStatus::Verified)?
            }
            CredentialKind::FalsePositive => {
                self.require_trusted(credential, now)?;
                transition(kind, incident.status, IncidentStatus::FalsePositive)?
            }
            CredentialKind::RiskFinding | CredentialKind::SafeToUse => {
                if !credential.verify(self.verdicts.verifier()) {
                    return Err(LifecycleError::Untrusted {
                        credential_id: credential.id.clone(),
                        reason: "Invalid signature".into(),
                    });
                }
                incident.status
            }
        };

        debug!(
            incident_id = %incident.id,
            credential_id = %credential.id,
            kind = %kind,
            from = %incident.status,
            to = %new_status,
            "Credential attach planned"
        );

        Ok(IncidentUpdate {
            incident_id: incident.id.clone(),
            credential_ids: vec![credential.id.clone()],
            expected_status: incident.status,
            new_status,
            at: now,
        })
    }

    /// Plan `Verified -> Mitigated` after a remediation was recorded.
    pub fn plan_mitigation(
        &self,
        incident: &Incident,
        now: DateTime<Utc>,
    ) -> LifecycleResult<IncidentUpdate> {
        if incident.status != IncidentStatus::Verified {
            return Err(LifecycleError::NotMitigable(incident.status));
        }
        info!(incident_id = %incident.id, "Incident mitigation planned");
        Ok(IncidentUpdate {
            incident_id: incident.id.clone(),
            credential_ids: Vec::new(),
            expected_status: IncidentStatus::Verified,
            new_status: IncidentStatus::Mitigated,
            at: now,
        })
    }

    fn require_trusted(&self, credential: &Credential, now: DateTime<Utc>) -> LifecycleResult<()> {
        let validity = self.verdicts.validate_at(credential, now);
        if validity.is_valid() {
            Ok(())
        } else {
            Err(LifecycleError::Untrusted {
                credential_id: credential.id.clone(),
                reason: validity.to_string(),
            })
        }
    }
}

fn transition(
    kind: CredentialKind,
    from: IncidentStatus,
    to: IncidentStatus,
) -> LifecycleResult<IncidentStatus> {
    if from == IncidentStatus::Detected {
        Ok(to)
    } else {
        Err(LifecycleError::InvalidTransition { kind, from })
    }
}

/// Package must match; a bound incident id must match; the version must match
/// except for SafeToUse, which may vouch for the last known-good release.
fn check_subject(incident: &Incident, credential: &Credential) -> LifecycleResult<()> {
    let subject = &credential.subject;
    let mismatch = |reason: String| LifecycleError::SubjectMismatch {
        credential_id: credential.id.clone(),
        incident_id: incident.id.clone(),
        reason,
    };

    if subject.package_name != incident.package_name {
        return Err(mismatch(format!("package {}", subject.package_name)));
    }
    if let Some(bound) = subject.incident_id.as_deref() {
        if bound != incident.id {
            return Err(mismatch(format!("bound to incident {bound}")));
        }
    }
    if credential.kind() != CredentialKind::SafeToUse && subject.version != incident.version {
        return Err(mismatch(format!("version {}", subject.version)));
    }
    Ok(())
}
