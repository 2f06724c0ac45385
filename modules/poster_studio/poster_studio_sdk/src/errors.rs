//! Error types for the poster-studio SDK.

use thiserror::Error;

use crate::query::Table;

/// Failure of a single call against the remote data/auth service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Endpoint unconfigured, unreachable, timed out, or failing server-side.
    #[error("Service unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Record not found")]
    NotFound,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The service answered but refused the request.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A row could not be decoded into its record type.
    #[error("Invalid {table} record: {message}")]
    InvalidRecord { table: Table, message: String },
}

impl ServiceError {
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_record(table: Table, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            table,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Failure reported by a store operation to its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("No credits remaining")]
    InsufficientCredits,

    #[error("Validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl StoreError {
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}
