//! Error types for rl-env

use thiserror::Error;

/// Result type for rl-env operations
pub type Result<T> = std::result::Result<T, EnvError>;

/// rl-env error types
#[derive(Debug, Error)]
pub enum EnvError {
    /// Action does not match the declared action space
    #[error("Action arity mismatch: expected {expected}, got {got}")]
    ActionArity { expected: String, got: String },

    /// A protocol precondition was violated (e.g. command sent to an idle controller)
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// One-time actuation controller load failed
    #[error("Failed to load controller {controller}: {reason}")]
    ControllerLoad { controller: String, reason: String },

    /// Controller never reported running
    #[error("Controller {controller} did not engage within {waited_ms} ms ({polls} polls)")]
    EngagementTimeout {
        controller: String,
        waited_ms: u64,
        polls: u32,
    },

    /// A retryable round trip kept failing
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    /// Simulator or agent transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EnvError {
    /// Whether the hosting process must stop.
    ///
    /// Only malformed agent input (`Serialization`, `Protocol`) can be skipped;
    /// everything else leaves the robot in an unknown state.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, EnvError::Serialization(_) | EnvError::Protocol(_))
    }
}

impl From<serde_json::Error> for EnvError {
    fn from(err: serde_json::Error) -> Self {
        EnvError::Serialization(err.to_string())
    }
}
