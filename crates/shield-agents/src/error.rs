use shield_credential::CredentialError;
use shield_incident::LifecycleError;
use shield_storage::StorageError;
use shield_transport::TransportError;
use shield_verifier::VerifierError;
use thiserror::Error;

/// Result type for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;

/// Errors surfaced by the agents.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no signing key configured for issuer {0}")]
    MissingSigningKey(String),

    #[error("incident not found: {0}")]
    IncidentNotFound(String),

    #[error("credential not found: {0}")]
    CredentialNotFound(String),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("verification error: {0}")]
    Verifier(#[from] VerifierError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<config::ConfigError> for AgentError {
    fn from(e: config::ConfigError) -> Self {
        AgentError::Config(e.to_string())
    }
}
