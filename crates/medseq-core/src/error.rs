use thiserror::Error;

/// Core error types for sequence counter operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid sequence name: {0}")]
    InvalidSequenceName(String),

    #[error("Invalid counter value: {0}")]
    InvalidValue(String),

    #[error("Invalid reset period: {0}")]
    InvalidResetPeriod(String),

    #[error("Time component error: {0}")]
    TimeError(#[from] time::error::ComponentRange),
}

impl CoreError {
    /// Create a new InvalidSequenceName error
    pub fn invalid_sequence_name(message: impl Into<String>) -> Self {
        Self::InvalidSequenceName(message.into())
    }

    /// Create a new InvalidValue error
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue(message.into())
    }

    /// Create a new InvalidResetPeriod error
    pub fn invalid_reset_period(period: impl Into<String>) -> Self {
        Self::InvalidResetPeriod(period.into())
    }

    /// Check if this error is a client error (4xx category)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSequenceName(_) | Self::InvalidValue(_) | Self::InvalidResetPeriod(_)
        )
    }

    /// Check if this error is a server error (5xx category)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::TimeError(_))
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSequenceName(_) | Self::InvalidValue(_) | Self::InvalidResetPeriod(_) => {
                ErrorCategory::Validation
            }
            Self::TimeError(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    System,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
