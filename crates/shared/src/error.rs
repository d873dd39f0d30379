//! Application-wide error types.
//!
//! Domain crates keep their own precise error enums and convert into
//! `AppError` at the boundary handed to route handlers and schedulers.

use thiserror::Error;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Access denied. Never says whether the resource exists.
    #[error("Access denied: {0}")]
    Forbidden(String),

    /// Malformed input; the caller must fix it before retrying.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Business rule violation (illegal transition, immutable document).
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Conflicting concurrent change.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Caller exceeded the shared request budget.
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// Persistence collaborator failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden(_) => 403,
            Self::Validation(_) => 400,
            Self::BusinessRule(_) => 422,
            Self::Conflict(_) => 409,
            Self::TooManyRequests(_) => 429,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Conflict(_) => "CONFLICT",
            Self::TooManyRequests(_) => "TOO_MANY_REQUESTS",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::TooManyRequests(_))
    }
}
