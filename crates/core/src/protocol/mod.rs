//! Chat protocol text and message formatting
//!
//! Every string here goes over the wire verbatim; the client matches on
//! [`WELCOME`] to detect the end of the name handshake, so these constants
//! must stay in sync between server and client.

pub mod codec;

/// First handshake prompt sent to a freshly accepted connection.
pub const NAME_PROMPT: &str = "What is your name?";

/// Re-prompt sent when the candidate name is already registered.
pub const NAME_TAKEN: &str = "Name already taken. Please choose another name.";

/// Admission message; ends the handshake on the client side.
pub const WELCOME: &str = "Welcome to the chat!";

/// Control command terminating a session. Never relayed as chat content.
pub const EXIT_COMMAND: &str = "/exit";

/// A relayed chat line as every other participant sees it.
pub fn chat_line(name: &str, text: &str) -> String {
    format!("{name}: {text}")
}

/// Join notice broadcast when a client completes the handshake.
pub fn joined(name: &str) -> String {
    format!("{name} has joined the chat.")
}

/// Leave notice broadcast after a registered client's session ends.
pub fn left(name: &str) -> String {
    format!("{name} has left the chat.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_line_format() {
        assert_eq!(chat_line("alice", "hello"), "alice: hello");
    }

    #[test]
    fn test_notices() {
        assert_eq!(joined("bob"), "bob has joined the chat.");
        assert_eq!(left("bob"), "bob has left the chat.");
    }

    #[test]
    fn test_exit_command_is_not_a_chat_line() {
        // The exit command is matched on the raw payload before formatting.
        assert_ne!(chat_line("alice", EXIT_COMMAND), EXIT_COMMAND);
    }
}
