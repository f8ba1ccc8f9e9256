//! TCP acceptor for chat connections
//!
//! One long-lived accept loop; every accepted stream gets an unconditionally
//! spawned session task. No connection cap or backpressure is applied, which
//! is a known scalability limitation of this design.

use crate::registry::Registry;
use crate::session;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Chat server: listener plus the shared connection registry.
#[derive(Debug)]
pub struct ChatServer {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl ChatServer {
    /// Bind the listening socket. A bind failure here is the one error that
    /// is allowed to abort the whole process.
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the shutdown signal fires.
    ///
    /// Per-connection failures are contained in their session task; nothing
    /// a client does can terminate this loop.
    pub async fn run(&self, mut shutdown: oneshot::Receiver<()>) -> Result<()> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            tracing::info!("new connection from {addr}");
                            let registry = Arc::clone(&self.registry);
                            tokio::spawn(handle_connection(stream, addr, registry));
                        }
                        Err(e) => {
                            tracing::error!("accept failed: {e}");
                        }
                    }
                }
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Drive one connection from accept to socket close.
async fn handle_connection(stream: TcpStream, addr: SocketAddr, registry: Arc<Registry>) {
    let (read_half, write_half) = stream.into_split();
    let (outbound, writer) = session::spawn_writer(write_half);

    session::run_session(read_half, outbound, registry).await;

    // The session dropped its queue handle and its registry entry is gone,
    // so the writer drains any remaining frames and exits on its own.
    let _ = writer.await;
    tracing::info!("connection from {addr} closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaychat_core::{protocol, FrameCodec};
    use std::time::Duration;

    async fn start_server() -> (SocketAddr, oneshot::Sender<()>) {
        let server = ChatServer::bind("127.0.0.1:0").await.unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move { server.run(shutdown_rx).await });
        (addr, shutdown_tx)
    }

    /// Connect and complete the handshake as `name`.
    async fn join(addr: SocketAddr, name: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        assert_eq!(
            FrameCodec::read(&mut stream).await.unwrap(),
            protocol::NAME_PROMPT
        );
        FrameCodec::write(&mut stream, name).await.unwrap();
        assert_eq!(
            FrameCodec::read(&mut stream).await.unwrap(),
            protocol::WELCOME
        );
        stream
    }

    #[tokio::test]
    async fn test_end_to_end_chat_scenario() {
        let (addr, _shutdown) = start_server().await;

        let mut alice = join(addr, "alice").await;
        let mut bob = join(addr, "bob").await;

        // Alice, already present, sees bob join; bob hears nothing about
        // alice's earlier join.
        assert_eq!(
            FrameCodec::read(&mut alice).await.unwrap(),
            "bob has joined the chat."
        );

        FrameCodec::write(&mut alice, "hello").await.unwrap();
        assert_eq!(FrameCodec::read(&mut bob).await.unwrap(), "alice: hello");

        FrameCodec::write(&mut bob, protocol::EXIT_COMMAND).await.unwrap();
        assert_eq!(
            FrameCodec::read(&mut alice).await.unwrap(),
            "bob has left the chat."
        );
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected_until_fresh() {
        let (addr, _shutdown) = start_server().await;

        let _alice = join(addr, "alice").await;

        let mut imposter = TcpStream::connect(addr).await.unwrap();
        assert_eq!(
            FrameCodec::read(&mut imposter).await.unwrap(),
            protocol::NAME_PROMPT
        );
        FrameCodec::write(&mut imposter, "alice").await.unwrap();
        assert_eq!(
            FrameCodec::read(&mut imposter).await.unwrap(),
            protocol::NAME_TAKEN
        );
        FrameCodec::write(&mut imposter, "charlie").await.unwrap();
        assert_eq!(
            FrameCodec::read(&mut imposter).await.unwrap(),
            protocol::WELCOME
        );
    }

    #[tokio::test]
    async fn test_name_reusable_after_departure() {
        let (addr, _shutdown) = start_server().await;

        let mut first = join(addr, "alice").await;
        FrameCodec::write(&mut first, protocol::EXIT_COMMAND).await.unwrap();

        // The old session tears down asynchronously; the name must become
        // claimable once it does.
        let mut stream = TcpStream::connect(addr).await.unwrap();
        FrameCodec::read(&mut stream).await.unwrap();
        loop {
            FrameCodec::write(&mut stream, "alice").await.unwrap();
            let reply = FrameCodec::read(&mut stream).await.unwrap();
            if reply == protocol::WELCOME {
                break;
            }
            assert_eq!(reply, protocol::NAME_TAKEN);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_one_clients_error_does_not_disturb_others() {
        use tokio::io::AsyncWriteExt;

        let (addr, _shutdown) = start_server().await;

        let mut alice = join(addr, "alice").await;
        let mut broken = join(addr, "broken").await;
        assert_eq!(
            FrameCodec::read(&mut alice).await.unwrap(),
            "broken has joined the chat."
        );

        // A garbage prefix kills only the sender's session.
        broken.write_all(b"not-a-frame").await.unwrap();
        assert_eq!(
            FrameCodec::read(&mut alice).await.unwrap(),
            "broken has left the chat."
        );

        // The server is still accepting and relaying.
        let mut carol = join(addr, "carol").await;
        FrameCodec::write(&mut carol, "still here").await.unwrap();
        assert_eq!(
            FrameCodec::read(&mut alice).await.unwrap(),
            "carol has joined the chat."
        );
        assert_eq!(
            FrameCodec::read(&mut alice).await.unwrap(),
            "carol: still here"
        );
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let (addr, _shutdown) = start_server().await;
        let err = ChatServer::bind(&addr.to_string()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to bind"));
    }
}
