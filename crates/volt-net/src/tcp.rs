//! TCP delivery of peer frames

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::codec::MAX_FRAME_SIZE;
use crate::error::{NetError, NetResult};
use crate::message::PeerMessage;
use crate::transport::{MessageHandler, PeerTransport};

/// Inbound side: accepts peer connections and dispatches decoded frames.
pub struct NetService {
    handler: Arc<dyn MessageHandler>,
    running: Arc<AtomicBool>,
}

impl NetService {
    /// Create a service dispatching into the given handler
    pub fn new(handler: Arc<dyn MessageHandler>) -> Self {
        Self {
            handler,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the listener and start accepting in the background.
    ///
    /// Returns the bound address (useful when binding port 0).
    pub async fn start(&self, listen_addr: SocketAddr) -> NetResult<SocketAddr> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(NetError::AlreadyRunning);
        }

        let listener = TcpListener::bind(listen_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("listening for peer messages on {}", local_addr);

        let handler = self.handler.clone();
        let running = self.running.clone();
        tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        debug!("peer connection from {}", peer);
                        let handler = handler.clone();
                        tokio::spawn(async move {
                            if let Err(e) = read_frames(stream, handler).await {
                                debug!("connection from {} ended: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => warn!("accept error: {}", e),
                }
            }
        });

        Ok(local_addr)
    }

    /// Stop accepting new connections
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Whether the service is accepting connections
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

async fn read_frames(mut stream: TcpStream, handler: Arc<dyn MessageHandler>) -> NetResult<()> {
    loop {
        let mut len_buf = [0u8; 4];
        if stream.read_exact(&mut len_buf).await.is_err() {
            // peer closed the connection
            return Ok(());
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        if len < 1 || len > MAX_FRAME_SIZE {
            return Err(NetError::MalformedFrame(format!("length prefix {}", len)));
        }

        let mut body = vec![0u8; len];
        stream.read_exact(&mut body).await?;

        let mut frame = BytesMut::with_capacity(4 + len);
        frame.put_slice(&len_buf);
        frame.put_slice(&body);

        // A frame that fails to decode poisons only itself
        match PeerMessage::decode(frame.freeze()) {
            Ok(msg) => handler.handle(msg),
            Err(e) => debug!("dropping undecodable frame: {}", e),
        }
    }
}

/// Outbound side: one connection per message, fire-and-forget.
pub struct TcpTransport {
    runtime: tokio::runtime::Handle,
}

impl TcpTransport {
    /// Capture the current tokio runtime for background sends.
    ///
    /// Panics when called outside a runtime, like [`tokio::runtime::Handle::current`].
    pub fn current() -> Self {
        Self {
            runtime: tokio::runtime::Handle::current(),
        }
    }

    /// Build on an explicit runtime handle
    pub fn with_handle(runtime: tokio::runtime::Handle) -> Self {
        Self { runtime }
    }
}

impl PeerTransport for TcpTransport {
    fn send(&self, to: SocketAddr, msg: PeerMessage) {
        let frame = match msg.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("not sending undecodable message to {}: {}", to, e);
                return;
            }
        };
        self.runtime.spawn(async move {
            match TcpStream::connect(to).await {
                Ok(mut stream) => {
                    if let Err(e) = stream.write_all(&frame).await {
                        warn!("failed to deliver to {}: {}", to, e);
                    }
                    let _ = stream.shutdown().await;
                }
                Err(e) => warn!("failed to connect to {}: {}", to, e),
            }
        });
    }
}
