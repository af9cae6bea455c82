//! Ledger Error Types
//!
//! One error enum for the whole consistency core, with an explicit
//! classification into a closed set of kinds. Callers branch on
//! [`LedgerError::kind`], never on message text.

use std::fmt;

use thiserror::Error;

use crate::cancel::CancelCause;

/// Closed classification of every [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced entity does not exist (yet, or ever)
    NotFound,
    /// Store or cache unavailable, driver failure, corrupt row
    Infrastructure,
    /// Caller input or configuration rejected
    Validation,
    /// Cancellation token fired or deadline elapsed
    Canceled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Infrastructure => "INFRASTRUCTURE",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    // === Not Found ===
    #[error("{entity} not found: {detail}")]
    NotFound { entity: &'static str, detail: String },

    // === Infrastructure ===
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    // === Validation ===
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // === Cancellation ===
    #[error("Operation canceled: {0}")]
    Canceled(CancelCause),
}

impl LedgerError {
    pub fn not_found(entity: &'static str, detail: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity,
            detail: detail.into(),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::DatabaseError(_)
            | LedgerError::CacheError(_)
            | LedgerError::CorruptRecord(_) => ErrorKind::Infrastructure,
            LedgerError::Validation(_) | LedgerError::Config(_) => ErrorKind::Validation,
            LedgerError::Canceled(_) => ErrorKind::Canceled,
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    #[inline]
    pub fn is_canceled(&self) -> bool {
        self.kind() == ErrorKind::Canceled
    }

    /// Stable error code for logs and API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "NOT_FOUND",
            LedgerError::DatabaseError(_) => "DATABASE_ERROR",
            LedgerError::CacheError(_) => "CACHE_ERROR",
            LedgerError::CorruptRecord(_) => "CORRUPT_RECORD",
            LedgerError::Validation(_) => "VALIDATION_ERROR",
            LedgerError::Config(_) => "CONFIG_ERROR",
            LedgerError::Canceled(CancelCause::DeadlineExceeded) => "DEADLINE_EXCEEDED",
            LedgerError::Canceled(_) => "CANCELED",
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => LedgerError::not_found("row", "query returned no rows"),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
                LedgerError::CorruptRecord(e.to_string())
            }
            other => LedgerError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_yaml::Error> for LedgerError {
    fn from(e: serde_yaml::Error) -> Self {
        LedgerError::Config(e.to_string())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Config(e.to_string())
    }
}
