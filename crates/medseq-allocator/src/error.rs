//! Allocation error types.
//!
//! Callers map [`AllocationError::Validation`] and [`AllocationError::Conflict`]
//! to 4xx responses and [`AllocationError::StorageUnavailable`] to 5xx.

use std::fmt;

use medseq_core::CoreError;
use medseq_storage::StorageError;
use serde::{Deserialize, Serialize};

/// Errors returned by [`SequenceAllocator`](crate::SequenceAllocator) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    /// Malformed input: bad sequence name, negative or non-integer value.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The explicit number is already issued or reserved.
    #[error("Number {value} is already in use for sequence {name}")]
    Conflict { name: String, value: u64 },

    /// The backing store could not complete the operation. State is unchanged.
    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },
}

impl AllocationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(name: impl Into<String>, value: u64) -> Self {
        Self::Conflict {
            name: name.into(),
            value,
        }
    }

    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns the error category reported to callers.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::StorageUnavailable { .. } => ErrorCategory::Unavailable,
        }
    }

    /// HTTP-equivalent status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation => 400,
            ErrorCategory::Conflict => 409,
            ErrorCategory::Unavailable => 503,
        }
    }
}

impl From<CoreError> for AllocationError {
    fn from(err: CoreError) -> Self {
        if err.is_client_error() {
            Self::validation(err.to_string())
        } else {
            Self::storage_unavailable(err.to_string())
        }
    }
}

impl From<StorageError> for AllocationError {
    fn from(err: StorageError) -> Self {
        match err {
            // Only reachable with values the backend cannot represent
            StorageError::Overflow { name } => {
                Self::validation(format!("Value out of range for sequence {name}"))
            }
            other => Self::storage_unavailable(other.to_string()),
        }
    }
}

/// Caller-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Validation,
    Conflict,
    Unavailable,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Conflict => write!(f, "conflict"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// Result type for allocator operations.
pub type Result<T> = std::result::Result<T, AllocationError>;
