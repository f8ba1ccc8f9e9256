//! Error types for relaychat-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum ChatError {
    /// The payload cannot be represented in the frame's decimal length prefix.
    #[error("Message too large: {len} bytes (max: {max})")]
    MessageTooLarge { len: usize, max: usize },

    /// The peer closed the connection, the stream ended mid-frame, or the
    /// frame was undecodable. Deliberately a single variant: callers treat
    /// "disconnected" and "sent garbage" identically.
    #[error("Connection lost")]
    ConnectionLost,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ChatError>;
