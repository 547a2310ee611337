//! Error types for request lifecycle operations.

use crate::types::{RequestId, RequestStatus, Role};
use thiserror::Error;

/// Result type alias for request lifecycle operations.
pub type Result<T> = std::result::Result<T, RequestError>;

/// Error taxonomy for the request store.
///
/// Every variant is returned synchronously to the immediate caller. A failed
/// operation never leaves a partial write behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    // ═══════════════════════════════════════════════════════════
    // Input Errors
    // ═══════════════════════════════════════════════════════════

    /// A required field is missing, blank, or malformed.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Field that failed validation (wire name)
        field: &'static str,
        /// Human-readable reason
        message: String,
    },

    /// An active request already exists for this owner and device serial.
    ///
    /// Carries the conflicting request so the caller can redirect to it.
    #[error("Request {id} is already {status} for this device")]
    DuplicateActiveRequest {
        /// Id of the conflicting active request
        id: RequestId,
        /// Its current status
        status: RequestStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════

    /// The role has no transition rights at all.
    #[error("Role {role} may not move requests to {to}")]
    AccessDenied {
        /// Acting role
        role: Role,
        /// Requested target status
        to: RequestStatus,
    },

    /// The role's rights do not cover this particular step.
    #[error("Role {role} cannot move a request from {from} to {to}")]
    InvalidTransition {
        /// Acting role
        role: Role,
        /// Current status of the record
        from: RequestStatus,
        /// Requested target status
        to: RequestStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // Lookup / System Errors
    // ═══════════════════════════════════════════════════════════

    /// No request with this id exists.
    #[error("Request {0} not found")]
    NotFound(RequestId),

    /// Backend failure (connection, query, serialization).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RequestError {
    /// Shorthand for a [`RequestError::Validation`] error.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Returns `true` if the caller can fix the error by changing its input.
    ///
    /// # Examples
    ///
    /// ```
    /// # use removal_desk_core::RequestError;
    /// assert!(RequestError::validation("serial", "is required").is_user_error());
    /// assert!(!RequestError::Storage("down".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::DuplicateActiveRequest { .. }
                | Self::AccessDenied { .. }
                | Self::InvalidTransition { .. }
                | Self::NotFound(_)
        )
    }

    /// Returns `true` for errors caused by the current state of stored data.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateActiveRequest { .. } | Self::InvalidTransition { .. }
        )
    }
}

/// Errors raised by audit log backends.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Failed to store or read entries.
    #[error("Audit storage error: {0}")]
    Storage(String),

    /// Failed to encode or decode an entry.
    #[error("Audit serialization error: {0}")]
    Serialization(String),
}

impl From<AuditError> for RequestError {
    fn from(err: AuditError) -> Self {
        Self::Storage(err.to_string())
    }
}
