//! Error types for depman

use thiserror::Error;

/// Result type alias for dependency manager operations
pub type DmResult<T> = Result<T, DmError>;

/// Error type for dependency manager operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DmError {
    /// Component or dependency is not in a valid state for the requested operation
    #[error("invalid lifecycle state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Registration handle was poisoned by a failed registration or is no longer valid
    #[error("illegal registration state: {0}")]
    IllegalRegistrationState(String),

    /// Service properties were rejected by the registry
    #[error("invalid service properties: {0}")]
    InvalidProperties(String),

    /// Filter expression could not be parsed
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Dependency could not be started or stopped
    #[error("dependency error: {0}")]
    DependencyError(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl DmError {
    /// Shorthand for an [`DmError::InvalidState`] error
    pub fn invalid_state(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        DmError::InvalidState {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether this error signals use of an object in an illegal state
    pub fn is_illegal_state(&self) -> bool {
        matches!(
            self,
            DmError::InvalidState { .. } | DmError::IllegalRegistrationState(_)
        )
    }
}

impl From<serde_json::Error> for DmError {
    fn from(err: serde_json::Error) -> Self {
        DmError::SerializationError(err.to_string())
    }
}

/// Error returned by a user callback (lifecycle, factory, dependency callbacks)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("callback failed: {0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Raised by a configuration consumer that rejects the settings it was given
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("configuration rejected{}: {reason}", .property.as_ref().map(|p| format!(" (property {p})")).unwrap_or_default())]
pub struct ConfigurationError {
    /// Offending property, if the consumer named one
    pub property: Option<String>,
    pub reason: String,
}

impl ConfigurationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            property: None,
            reason: reason.into(),
        }
    }

    pub fn for_property(property: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            property: Some(property.into()),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
#[path = "error/error_tests.rs"]
mod error_tests;
