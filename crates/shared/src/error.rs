//! Application-wide error types.

use thiserror::Error;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Input or budget state failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced entity not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Exclusive access to a resource was not obtained in time.
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// Run was cancelled before completion.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::NotFound(_) => 2,
            Self::LockTimeout(_) => 3,
            Self::Cancelled(_) => 4,
            Self::Configuration(_) => 78,
            Self::Internal(_) => 1,
        }
    }

    /// Returns the error code used in run summaries.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::LockTimeout(_) => "LOCK_TIMEOUT",
            Self::Cancelled(_) => "CANCELLED",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}
