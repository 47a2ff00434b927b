//! Driver error types
//!
//! These are the backend-specific failures. Profiles propagate them
//! unwrapped; receivers wrap them with the sub-resource that failed.

use thiserror::Error;

/// Backend call failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("{kind} '{id}' could not be found")]
    NotFound { kind: String, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request rejected by backend: {0}")]
    Rejected(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Internal backend error: {0}")]
    Internal(String),
}

impl DriverError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        DriverError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DriverError::NotFound { .. })
    }
}

/// Result type for driver calls
pub type DriverResult<T> = std::result::Result<T, DriverError>;
