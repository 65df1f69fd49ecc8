use thiserror::Error;

use shield_credential::CredentialError;
use shield_incident::IncidentStatus;

/// Result type for verification.
pub type VerifierResult<T> = Result<T, VerifierError>;

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("finding {credential_id} rejected: {reason}")]
    UntrustedFinding {
        credential_id: String,
        reason: String,
    },

    #[error("finding {credential_id} does not describe incident {incident_id}")]
    SubjectMismatch {
        credential_id: String,
        incident_id: String,
    },

    #[error("incident {incident_id} already adjudicated ({status})")]
    AlreadyAdjudicated {
        incident_id: String,
        status: IncidentStatus,
    },

    #[error("invalid verifier configuration: {0}")]
    InvalidConfig(String),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),
}
