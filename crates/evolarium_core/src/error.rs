//! Error types for the simulation core.
//!
//! Per-tick faults are values, never panics: the world reports them and the
//! scheduler keeps its cadence.

use thiserror::Error;

/// Faults raised by a decision policy or its training handle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// A training round was requested while the previous one is still running.
    #[error("policy is already training")]
    Busy,

    /// Sensed input contained a non-finite feature.
    #[error("malformed policy input: {0}")]
    MalformedInput(String),

    /// Imported parameters do not fit this policy.
    #[error("parameter mismatch: {0}")]
    Parameters(String),
}

/// Main error type for simulation operations.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid world state: {0}")]
    InvalidState(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<SimError>,
    },
}

/// Result type alias for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;

impl SimError {
    #[must_use]
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    #[must_use]
    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }

    #[must_use]
    pub fn snapshot<S: Into<String>>(msg: S) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Wraps an error with additional context.
    #[must_use]
    pub fn with_context<S: Into<String>>(self, context: S) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::invalid_state("NaN position");
        assert_eq!(err.to_string(), "Invalid world state: NaN position");
    }

    #[test]
    fn test_error_context() {
        let err = SimError::from(PolicyError::Busy).with_context("tick 12");
        assert!(err.to_string().contains("tick 12"));
        assert!(err.to_string().contains("already training"));
    }
}
