//! Error types for glossa.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Result type alias using glossa's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned when a `(locale_id, key)` pair is already taken.
pub const DUPLICATE_KEY_MESSAGE: &str = "Translation key already exists for this locale.";

/// Core error type for glossa operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more request fields failed validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// A cross-row uniqueness invariant was violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Export cache backend failed
    #[error("Cache error: {0}")]
    Cache(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a validation error on a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add(field, message);
        Error::Validation(errors)
    }

    /// Conflict raised for a duplicate `(locale_id, key)` pair.
    pub fn duplicate_key() -> Self {
        Error::Conflict(DUPLICATE_KEY_MESSAGE.to_string())
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
