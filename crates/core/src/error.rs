//! Errors raised while building deferred-function metadata.

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while resolving configuration or schedules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A configuration value had a shape or range that is not accepted.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A relative duration string could not be parsed.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration {
        /// The rejected input
        value: String,
        /// Parser message
        reason: String,
    },
}

impl CoreError {
    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
