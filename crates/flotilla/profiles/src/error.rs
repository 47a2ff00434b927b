//! Profile error types

use flotilla_drivers::DriverError;
use flotilla_schema::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Spec validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("The {kind} '{reference}' could not be found")]
    ResourceNotFound { kind: String, reference: String },

    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    #[error("Cannot {operation} a node in state {state}")]
    InvalidState { operation: String, state: String },

    #[error("Profile type not found: {0}")]
    UnknownType(String),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl ProfileError {
    pub fn invalid_state(operation: &str, state: &str) -> Self {
        ProfileError::InvalidState {
            operation: operation.to_string(),
            state: state.to_string(),
        }
    }
}

/// Result type for profile operations
pub type Result<T> = std::result::Result<T, ProfileError>;
