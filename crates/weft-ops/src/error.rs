//! Error types for the operation layer.

use thiserror::Error;
use weft_core::ChangeError;

/// Errors surfaced by [`Store`](crate::Store) implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store closed")]
    Closed,

    #[error("Store call canceled")]
    Canceled,

    /// A logged operation could not be transformed.
    #[error("Invalid operation in log: {0}")]
    Invalid(#[from] ChangeError),
}

impl StoreError {
    /// Transport trouble is worth retrying; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Errors surfaced to the host by sessions and the sync task.
#[derive(Error, Debug)]
pub enum OpsError {
    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Change error: {0}")]
    Change(#[from] ChangeError),

    /// The log skipped or repeated a version. The session must be re-seeded.
    #[error("Version mismatch: got {got}, expected {expected}")]
    VersionMismatch { got: i64, expected: i64 },

    #[error("Operation canceled")]
    Canceled,

    #[error("Session closed")]
    Closed,

    #[error("Decode error: {0}")]
    Decode(String),
}

impl OpsError {
    pub fn is_retryable(&self) -> bool {
        match self {
            OpsError::Store(e) => e.is_retryable(),
            OpsError::Canceled => true,
            OpsError::Change(_)
            | OpsError::VersionMismatch { .. }
            | OpsError::Closed
            | OpsError::Decode(_) => false,
        }
    }
}

impl From<StoreError> for OpsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Canceled => OpsError::Canceled,
            StoreError::Closed => OpsError::Closed,
            other => OpsError::Store(other),
        }
    }
}

impl From<serde_json::Error> for OpsError {
    fn from(err: serde_json::Error) -> Self {
        OpsError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(OpsError::from(StoreError::Unavailable("reset".into())).is_retryable());
        assert!(OpsError::Canceled.is_retryable());
        assert!(!OpsError::VersionMismatch { got: 3, expected: 2 }.is_retryable());
        assert!(!OpsError::from(ChangeError::IllegalChange("x".into())).is_retryable());
    }

    #[test]
    fn test_store_error_conversion() {
        assert!(matches!(OpsError::from(StoreError::Closed), OpsError::Closed));
        assert!(matches!(OpsError::from(StoreError::Canceled), OpsError::Canceled));
        let invalid = StoreError::from(ChangeError::Decode("bad".into()));
        assert!(matches!(OpsError::from(invalid), OpsError::Store(_)));
    }
}
