//! Control-plane error types

use thiserror::Error;

/// Errors returned by control-plane clients
#[derive(Debug, Clone, Error)]
pub enum ControlError {
    #[error("Control API unavailable: {0}")]
    Unavailable(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Instance unreachable at {addr}: {reason}")]
    Unreachable { addr: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type for control-plane operations
pub type Result<T> = std::result::Result<T, ControlError>;
