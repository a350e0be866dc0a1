//! Error types for tenancy operations
//!
//! This module defines the error taxonomy every tenantry operation returns:
//! authentication, authorization, lookup, conflict, validation and internal
//! failures.

use tenantry_rbac::AccessError;
use thiserror::Error;

/// Tenancy error types.
///
/// Error kinds, not transport statuses; [`status_code`](Self::status_code)
/// gives the conventional HTTP mapping for the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenancyError {
    /// Missing, invalid or expired credential
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated, but role or scope is insufficient
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Names the minimum required role or scope
        reason: String,
    },

    /// Target does not exist, or is hidden by scope
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness violation, capacity exceeded or invalid state transition
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed domain, email, role or payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Misconfigured process or actor record
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for tenancy operations.
pub type TenancyResult<T> = Result<T, TenancyError>;

impl TenancyError {
    /// Build a `Forbidden` error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        TenancyError::Forbidden {
            reason: reason.into(),
        }
    }

    /// Check if this error should be logged at error level.
    ///
    /// Denials and conflicts are expected outcomes, not server faults.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            TenancyError::Internal(_) | TenancyError::Configuration(_)
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            TenancyError::Unauthenticated(_) => 401,
            TenancyError::Forbidden { .. } => 403,
            TenancyError::NotFound(_) => 404,
            TenancyError::Conflict(_) => 409,
            TenancyError::Validation(_) => 422,
            TenancyError::Configuration(_) | TenancyError::Internal(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            TenancyError::Unauthenticated(_) => "UNAUTHENTICATED",
            TenancyError::Forbidden { .. } => "FORBIDDEN",
            TenancyError::NotFound(_) => "NOT_FOUND",
            TenancyError::Conflict(_) => "CONFLICT",
            TenancyError::Validation(_) => "VALIDATION_ERROR",
            TenancyError::Configuration(_) => "CONFIG_ERROR",
            TenancyError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<AccessError> for TenancyError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::Forbidden { reason } => TenancyError::Forbidden { reason },
            AccessError::MisconfiguredActor(detail) => TenancyError::Configuration(detail),
        }
    }
}

impl From<serde_json::Error> for TenancyError {
    fn from(err: serde_json::Error) -> Self {
        TenancyError::Validation(format!("Invalid payload: {}", err))
    }
}
