//! Domain errors for the Taskhub server.

use thiserror::Error;

/// Domain-level errors that can occur anywhere between the tool boundary and
/// the storage gateway. Each variant maps to exactly one stable wire code via
/// [`DomainError::code`].
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid {field}: {value}")]
    InvalidFormat { field: String, value: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Request deadline exceeded")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// Stable error code surfaced in the standard response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidFormat { .. } => "INVALID_FORMAT",
            Self::MissingField { .. } => "MISSING_FIELD",
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::PreconditionFailed(_) => "PRECONDITION_FAILED",
            Self::Timeout => "TIMEOUT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Database(_) | Self::Serialization(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the failure is internal (storage, serialization). Internal
    /// failures are logged with a correlation id and never leak their cause
    /// to callers.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Serialization(_))
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound { entity, id: id.to_string() }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    pub fn invalid_format(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidFormat { field: field.into(), value: value.into() }
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        // Unique-constraint violations are caller errors, not server faults.
        if let sqlx::Error::Database(db) = &err {
            if db.message().contains("UNIQUE constraint failed") {
                return DomainError::Conflict(db.message().to_string());
            }
        }
        DomainError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(DomainError::Validation("x".into()).code(), "VALIDATION_ERROR");
        assert_eq!(DomainError::invalid_format("id", "zzz").code(), "INVALID_FORMAT");
        assert_eq!(DomainError::missing_field("action").code(), "MISSING_FIELD");
        assert_eq!(DomainError::not_found("Task", "abc").code(), "NOT_FOUND");
        assert_eq!(DomainError::Timeout.code(), "TIMEOUT");
        assert_eq!(DomainError::Database("boom".into()).code(), "INTERNAL_ERROR");
    }

    #[test]
    fn internal_errors_are_flagged() {
        assert!(DomainError::Database("x".into()).is_internal());
        assert!(DomainError::Serialization("x".into()).is_internal());
        assert!(!DomainError::Conflict("x".into()).is_internal());
    }
}
