//! Relaychat Core - Shared protocol logic for the chat server and client
//!
//! This crate provides:
//! - The length-prefixed framing codec
//! - Protocol text (handshake prompts, notices, exit command)
//! - Error types

/// Default endpoint shared by the server and client binaries.
pub const DEFAULT_ENDPOINT: &str = "localhost:8010";

pub mod error;
pub mod protocol;

// Re-export common types
pub use error::{ChatError, Result};
pub use protocol::codec::{FrameCodec, DEFAULT_PREFIX_WIDTH};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoint_is_host_port() {
        let (host, port) = DEFAULT_ENDPOINT.split_once(':').unwrap();
        assert!(!host.is_empty());
        assert!(port.parse::<u16>().is_ok());
    }
}
