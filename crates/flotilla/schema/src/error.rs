//! Validation error types

use crate::AttributeKind;
use thiserror::Error;

/// Schema violation; every variant names the offending attribute path
/// (`networks[0].port`, `metadata.owner`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required spec item '{path}' not provided")]
    MissingRequired { path: String },

    #[error("Spec item '{path}' expects {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: AttributeKind,
        actual: &'static str,
    },

    #[error("Unrecognizable spec item '{path}'")]
    UnknownKey { path: String },

    #[error("Invalid value for spec item '{path}': {reason}")]
    InvalidValue { path: String, reason: String },
}

impl ValidationError {
    /// Path of the attribute that failed
    pub fn path(&self) -> &str {
        match self {
            ValidationError::MissingRequired { path }
            | ValidationError::TypeMismatch { path, .. }
            | ValidationError::UnknownKey { path }
            | ValidationError::InvalidValue { path, .. } => path,
        }
    }

    pub fn invalid_value(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for validation
pub type Result<T> = std::result::Result<T, ValidationError>;
