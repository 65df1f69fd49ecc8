use thiserror::Error;

/// Result type for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Errors raised while minting or decoding credentials.
///
/// Verification never produces one of these: `Credential::verify` folds every
/// failure into `false`.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid credential lifetime: {0}")]
    InvalidLifetime(String),

    #[error("invalid key material for issuer {issuer}: {reason}")]
    InvalidKey { issuer: String, reason: String },
}

impl From<serde_json::Error> for CredentialError {
    fn from(err: serde_json::Error) -> Self {
        CredentialError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CredentialError::InvalidKey {
            issuer: "did:simulator:verifier".into(),
            reason: "wrong length".into(),
        };
        assert!(err.to_string().contains("did:simulator:verifier"));
    }

    #[test]
    fn lifetime_error_display() {
        let err = CredentialError::InvalidLifetime("ttl must be positive".into());
        assert_eq!(
            err.to_string(),
            "invalid credential lifetime: ttl must be positive"
        );
    }
}
