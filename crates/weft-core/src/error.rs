//! Error types for the value and change algebra.

use thiserror::Error;

/// Errors raised while applying, merging or decoding changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangeError {
    /// A change was applied to a value of the wrong shape.
    #[error("Illegal change: {0}")]
    IllegalChange(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// A custom change kind that the codec has no decoder for.
    #[error("Unknown custom change kind: {0}")]
    UnknownCustom(String),
}

impl ChangeError {
    pub fn illegal(msg: impl Into<String>) -> Self {
        ChangeError::IllegalChange(msg.into())
    }
}

impl From<serde_json::Error> for ChangeError {
    fn from(err: serde_json::Error) -> Self {
        ChangeError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChangeError>;
