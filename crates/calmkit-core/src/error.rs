//! Core error types for calmkit-core.
//!
//! This module defines the error hierarchy using thiserror. Session errors
//! are local and synchronous: nothing in the engine fails transiently, so
//! there is no retry machinery anywhere in the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for calmkit-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Session engine errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Catalog lookup errors
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Errors raised by the session engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Malformed exercise definition. The engine refuses to start and
    /// leaves any existing session untouched.
    #[error("Invalid definition '{id}': {message}")]
    InvalidDefinition { id: String, message: String },

    /// Phase or step detail was requested while no matching session runs.
    #[error("No active session")]
    NoActiveSession,
}

impl SessionError {
    pub(crate) fn invalid(id: &str, message: impl Into<String>) -> Self {
        SessionError::InvalidDefinition {
            id: id.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised when resolving exercises from the catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No exercise with this id
    #[error("No {kind} exercise with id '{id}'")]
    ExerciseNotFound { kind: &'static str, id: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_definition_message_names_exercise() {
        let err = SessionError::invalid("box", "cycles must be at least 1");
        assert_eq!(
            err.to_string(),
            "Invalid definition 'box': cycles must be at least 1"
        );
    }

    #[test]
    fn session_error_converts_into_core_error() {
        let err: CoreError = SessionError::NoActiveSession.into();
        assert!(matches!(err, CoreError::Session(SessionError::NoActiveSession)));
    }
}
