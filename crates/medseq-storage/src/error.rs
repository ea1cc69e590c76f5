//! Storage error types for the counter storage abstraction layer.
//!
//! This module defines all error types that can occur during storage operations.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A stored counter row could not be interpreted.
    #[error("Invalid counter record for {name}: {message}")]
    InvalidRecord {
        /// The sequence whose record is invalid.
        name: String,
        /// Description of why the record is invalid.
        message: String,
    },

    /// The counter cannot move past its maximum value.
    #[error("Counter overflow: {name}")]
    Overflow {
        /// The sequence that overflowed.
        name: String,
    },

    /// Failed to reach the storage backend, or the operation timed out.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `InvalidRecord` error.
    #[must_use]
    pub fn invalid_record(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Overflow` error.
    #[must_use]
    pub fn overflow(name: impl Into<String>) -> Self {
        Self::Overflow { name: name.into() }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is an overflow error.
    #[must_use]
    pub fn is_overflow(&self) -> bool {
        matches!(self, Self::Overflow { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidRecord { .. } => ErrorCategory::Corruption,
            Self::Overflow { .. } => ErrorCategory::Capacity,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Stored data is unreadable.
    Corruption,
    /// Counter exhausted.
    Capacity,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corruption => write!(f, "corruption"),
            Self::Capacity => write!(f, "capacity"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
