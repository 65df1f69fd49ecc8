use thiserror::Error;

use shield_credential::CredentialKind;

use crate::incident::IncidentStatus;

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Reasons an incident update is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("credential {credential_id} does not describe incident {incident_id}: {reason}")]
    SubjectMismatch {
        credential_id: String,
        incident_id: String,
        reason: String,
    },

    #[error("credential {0} is already attached")]
    DuplicateCredential(String),

    #[error("{kind} cannot move incident from {from}")]
    InvalidTransition {
        kind: CredentialKind,
        from: IncidentStatus,
    },

    #[error("cannot mitigate incident in status {0}")]
    NotMitigable(IncidentStatus),

    #[error("credential {credential_id} rejected: {reason}")]
    Untrusted {
        credential_id: String,
        reason: String,
    },

    #[error("status conflict: expected {expected}, found {found}")]
    StatusConflict {
        expected: IncidentStatus,
        found: IncidentStatus,
    },

    #[error("update targets incident {expected}, got {found}")]
    WrongIncident { expected: String, found: String },
}
