//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input (unbalanced entries, empty description, bad reference).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown id or code.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Attempt to edit a record that is no longer editable.
    #[error("Immutable state: {0}")]
    ImmutableState(String),

    /// Illegal state transition.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Conflict with existing ledger state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A required control account is missing or inactive.
    #[error("Missing control account: {0}")]
    MissingControlAccount(String),

    /// Database or transport error.
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::ImmutableState(_) | Self::InvalidState(_) | Self::Conflict(_) => 409,
            Self::MissingControlAccount(_) => 422,
            Self::Database(_) | Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ImmutableState(_) => "IMMUTABLE_STATE",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::Conflict(_) => "CONFLICT",
            Self::MissingControlAccount(_) => "MISSING_CONTROL_ACCOUNT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the caller may retry the operation unchanged.
    ///
    /// Only transport failures qualify; domain errors never do.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(AppError::Validation(String::new()).status_code(), 400);
        assert_eq!(AppError::NotFound(String::new()).status_code(), 404);
        assert_eq!(AppError::ImmutableState(String::new()).status_code(), 409);
        assert_eq!(AppError::InvalidState(String::new()).status_code(), 409);
        assert_eq!(AppError::Conflict(String::new()).status_code(), 409);
        assert_eq!(
            AppError::MissingControlAccount(String::new()).status_code(),
            422
        );
        assert_eq!(AppError::Database(String::new()).status_code(), 500);
        assert_eq!(AppError::Configuration(String::new()).status_code(), 500);
        assert_eq!(AppError::Internal(String::new()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::Validation(String::new()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(AppError::NotFound(String::new()).error_code(), "NOT_FOUND");
        assert_eq!(
            AppError::ImmutableState(String::new()).error_code(),
            "IMMUTABLE_STATE"
        );
        assert_eq!(
            AppError::InvalidState(String::new()).error_code(),
            "INVALID_STATE"
        );
        assert_eq!(AppError::Conflict(String::new()).error_code(), "CONFLICT");
        assert_eq!(
            AppError::MissingControlAccount(String::new()).error_code(),
            "MISSING_CONTROL_ACCOUNT"
        );
        assert_eq!(
            AppError::Database(String::new()).error_code(),
            "DATABASE_ERROR"
        );
    }

    #[test]
    fn test_only_database_errors_are_retryable() {
        assert!(AppError::Database("connection reset".into()).is_retryable());
        assert!(!AppError::Validation("msg".into()).is_retryable());
        assert!(!AppError::Conflict("msg".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::Validation("msg".into()).to_string(),
            "Validation error: msg"
        );
        assert_eq!(
            AppError::NotFound("msg".into()).to_string(),
            "Not found: msg"
        );
        assert_eq!(
            AppError::ImmutableState("msg".into()).to_string(),
            "Immutable state: msg"
        );
        assert_eq!(
            AppError::MissingControlAccount("5000".into()).to_string(),
            "Missing control account: 5000"
        );
    }
}
