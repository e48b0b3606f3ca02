//! Network error types

use thiserror::Error;

/// Network errors
#[derive(Debug, Error)]
pub enum NetError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown message kind byte
    #[error("unknown message kind: {0}")]
    UnknownKind(u8),

    /// Frame larger than the protocol allows
    #[error("frame of {0} bytes exceeds the maximum")]
    FrameTooLarge(usize),

    /// Truncated or malformed frame
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Payload did not decode as the expected message
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Service already running
    #[error("network service already running")]
    AlreadyRunning,
}

/// Result type for network operations
pub type NetResult<T> = Result<T, NetError>;
