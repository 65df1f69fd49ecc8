use shield_incident::LifecycleError;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<LifecycleError> for StorageError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::StatusConflict { .. } | LifecycleError::DuplicateCredential(_) => {
                StorageError::Conflict(err.to_string())
            }
            other => StorageError::InvalidInput(other.to_string()),
        }
    }
}
