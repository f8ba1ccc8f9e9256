//! Per-connection session handling
//!
//! Each accepted connection runs two tasks: the session itself (handshake,
//! then the relay read loop) and a writer task that owns the socket's write
//! half and drains the connection's outbound frame queue. All writes to one
//! socket funnel through that queue, so they never interleave.
//!
//! Session lifecycle: Connecting (name handshake) -> Registered (relaying)
//! -> Closed. Clean exit, peer disconnect, and undecodable frames all end in
//! the same teardown: remove from the registry, then announce the departure.

use crate::registry::{OutboundSender, Registry};
use bytes::Bytes;
use relaychat_core::{protocol, ChatError, FrameCodec, Result, DEFAULT_PREFIX_WIDTH};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Frames queued per connection before broadcasts start dropping for it.
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// How a registered session came to an end. Both variants funnel into the
/// same teardown; they differ only in what gets logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The client sent the exit command.
    CleanExit,
    /// The peer closed the connection or sent an undecodable frame.
    ConnectionLost,
}

/// Spawn the writer task owning a connection's write half.
///
/// The task drains the returned queue into framed writes and stops on the
/// first write error or once every sender handle has been dropped.
pub fn spawn_writer<W>(mut writer: W) -> (OutboundSender, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Bytes>(OUTBOUND_QUEUE_DEPTH);
    let task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(e) = writer.write_all(&frame).await {
                tracing::debug!("writer task stopping: {e}");
                break;
            }
        }
    });
    (tx, task)
}

/// Run one connection's session to completion.
///
/// Owns the read half; the matching write half lives in the writer task
/// behind `outbound`. Errors never escape to the acceptor: a connection that
/// fails at any point is logged and torn down locally.
pub async fn run_session<R>(mut reader: R, outbound: OutboundSender, registry: Arc<Registry>)
where
    R: AsyncRead + Unpin,
{
    let name = match negotiate_name(&mut reader, &outbound, &registry).await {
        Ok(name) => name,
        Err(_) => {
            // Never registered, so nothing to clean up or announce.
            tracing::debug!("connection dropped during name handshake");
            return;
        }
    };

    tracing::info!("{name} has joined the chat");
    registry.broadcast(&protocol::joined(&name), &[&name]).await;

    match relay_loop(&mut reader, &registry, &name).await {
        SessionEnd::CleanExit => tracing::info!("{name} exited"),
        SessionEnd::ConnectionLost => tracing::info!("{name} disconnected"),
    }

    // Remove strictly before the departure notice: the name becomes free
    // only once its queue handle has left the map, and the notice can no
    // longer be queued to the departed connection.
    registry.remove(&name).await;
    tracing::info!("{name} has left the chat");
    registry.broadcast(&protocol::left(&name), &[]).await;
}

/// Name handshake: prompt, read a candidate, claim it or re-prompt.
///
/// Retries are unbounded; the client keeps the connection as long as it
/// keeps answering. Any read or write failure ends the handshake.
async fn negotiate_name<R>(
    reader: &mut R,
    outbound: &OutboundSender,
    registry: &Registry,
) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    send(outbound, protocol::NAME_PROMPT).await?;
    loop {
        let name = FrameCodec::read(reader).await?;
        if registry.try_claim(&name, outbound.clone()).await {
            if let Err(e) = send(outbound, protocol::WELCOME).await {
                // Claimed but never admitted; undo before bailing out.
                registry.remove(&name).await;
                return Err(e);
            }
            return Ok(name);
        }
        send(outbound, protocol::NAME_TAKEN).await?;
    }
}

/// Registered state: decode one frame per iteration and relay it.
async fn relay_loop<R>(reader: &mut R, registry: &Registry, name: &str) -> SessionEnd
where
    R: AsyncRead + Unpin,
{
    loop {
        let text = match FrameCodec::read(reader).await {
            Ok(text) => text,
            Err(_) => return SessionEnd::ConnectionLost,
        };
        if text == protocol::EXIT_COMMAND {
            return SessionEnd::CleanExit;
        }
        registry
            .broadcast(&protocol::chat_line(name, &text), &[name])
            .await;
    }
}

/// Queue a direct (non-broadcast) frame to this connection.
async fn send(outbound: &OutboundSender, message: &str) -> Result<()> {
    let frame = FrameCodec::encode(message, DEFAULT_PREFIX_WIDTH)?;
    outbound
        .send(frame)
        .await
        .map_err(|_| ChatError::ConnectionLost)
}
