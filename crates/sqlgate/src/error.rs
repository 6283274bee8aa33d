//! Error types for sqlgate

use thiserror::Error;

/// Result type alias for sqlgate operations
pub type GateResult<T> = Result<T, GateError>;

/// Every failure a caller can observe.
///
/// The first group (`InvalidIdentifier`, `WhereShape`, `Validation`) is raised
/// while a statement is being built and never reaches the connection. The
/// execution group (`Execution`, `Connectivity`) comes back from the gate.
#[derive(Debug, Clone, Error)]
pub enum GateError {
    /// Identifier failed the `^[A-Za-z0-9_]+$` check
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// WHERE input of the wrong shape
    #[error("Invalid WHERE shape: {0}")]
    WhereShape(String),

    /// Any other construction-time error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Driver error during execute/commit/fetch
    #[error("Execution error: {message}")]
    Execution { message: String },

    /// Interface lost; a reconnect was attempted before returning
    #[error("Connectivity error: {message} (reconnected: {reconnected})")]
    Connectivity { message: String, reconnected: bool },

    /// Result coercion error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Bad connection options
    #[error("Config error: {0}")]
    Config(String),
}

impl GateError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a WHERE shape error
    pub fn where_shape(message: impl Into<String>) -> Self {
        Self::WhereShape(message.into())
    }

    /// Caller bug detected before execution. Retrying will not help.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier(_) | Self::WhereShape(_) | Self::Validation(_)
        )
    }

    /// Failure that happened at execution time and may be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Execution { .. } | Self::Connectivity { .. })
    }

    /// Check if the connection was lost
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }
}
