//! Error types for the simulator link

use rl_env_core::EnvError;
use thiserror::Error;

/// Result type for simulator round trips
pub type LinkResult<T> = std::result::Result<T, LinkError>;

/// Simulator link errors
#[derive(Debug, Error)]
pub enum LinkError {
    /// Transport-level failure
    #[error("IPC error: {0}")]
    Ipc(String),

    /// No response within the request timeout
    #[error("{request} timed out after {timeout_ms} ms")]
    Timeout { request: String, timeout_ms: u64 },

    /// Simulator answered with an error
    #[error("Simulator error {code}: {message}")]
    Remote { code: i32, message: String },

    /// Simulator answered with the wrong message
    #[error("Unexpected response to {request}: {response}")]
    UnexpectedResponse { request: String, response: String },

    /// Malformed message
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Link was shut down or never connected
    #[error("Not connected")]
    NotConnected,

    /// Reader task is gone
    #[error("Connection closed")]
    Closed,
}

impl LinkError {
    /// Whether repeating the same round trip can succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LinkError::Ipc(_) | LinkError::Timeout { .. } | LinkError::Remote { .. }
        )
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        LinkError::Serialization(err.to_string())
    }
}

impl From<LinkError> for EnvError {
    fn from(err: LinkError) -> Self {
        EnvError::Transport(err.to_string())
    }
}
