//! Connection registry: the single source of truth for claimed names
//!
//! Maps each registered display name to that connection's outbound frame
//! queue. One lock guards every read-modify-write sequence (claim, broadcast
//! iteration, removal), so a name can never be observed as free while its
//! session is still tearing down.

use bytes::Bytes;
use relaychat_core::{FrameCodec, DEFAULT_PREFIX_WIDTH};
use std::collections::HashMap;
use tokio::sync::{mpsc, Mutex};

/// Handle for queueing encoded frames to one connection's writer task.
pub type OutboundSender = mpsc::Sender<Bytes>;

/// Shared map from display name to live connection.
///
/// The registry holds queue handles, never sockets: each connection's write
/// half is owned by its writer task, so a broadcast only enqueues and a slow
/// recipient cannot stall delivery to the rest.
#[derive(Debug)]
pub struct Registry {
    clients: Mutex<HashMap<String, OutboundSender>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically claim `name` for a connection.
    ///
    /// Returns false (and mutates nothing) if the name is already taken.
    /// Names are case-sensitive and immutable for the connection's lifetime.
    pub async fn try_claim(&self, name: &str, sender: OutboundSender) -> bool {
        let mut clients = self.clients.lock().await;
        if clients.contains_key(name) {
            return false;
        }
        clients.insert(name.to_string(), sender);
        tracing::debug!("registered {name} ({} clients)", clients.len());
        true
    }

    /// Atomically remove `name`, returning its queue handle if present.
    pub async fn remove(&self, name: &str) -> Option<OutboundSender> {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(name);
        if removed.is_some() {
            tracing::debug!("unregistered {name} ({} clients)", clients.len());
        }
        removed
    }

    /// Fan one message out to every registered connection not in `exclude`.
    ///
    /// A recipient whose queue is full or whose writer has died is logged and
    /// skipped; it is never removed here. That connection's own session
    /// handler notices the failure on its side and unregisters itself.
    pub async fn broadcast(&self, message: &str, exclude: &[&str]) {
        let frame = match FrameCodec::encode(message, DEFAULT_PREFIX_WIDTH) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!("dropping oversized broadcast: {e}");
                return;
            }
        };

        let clients = self.clients.lock().await;
        for (name, sender) in clients.iter() {
            if exclude.contains(&name.as_str()) {
                continue;
            }
            if let Err(e) = sender.try_send(frame.clone()) {
                tracing::debug!("failed to queue message for {name}: {e}");
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
