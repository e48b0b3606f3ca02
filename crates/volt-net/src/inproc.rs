//! In-process message routing

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::message::PeerMessage;
use crate::transport::{MessageHandler, PeerTransport};

/// Routes messages between nodes living in the same process.
///
/// Register each node under its network location; `send` then delivers
/// synchronously to the registered handler. Messages to unregistered
/// locations vanish, which matches the best-effort contract.
#[derive(Default)]
pub struct InProcNet {
    routes: DashMap<SocketAddr, Arc<dyn MessageHandler>>,
}

impl InProcNet {
    /// Create an empty router
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node's handler under its location
    pub fn register(&self, location: SocketAddr, handler: Arc<dyn MessageHandler>) {
        self.routes.insert(location, handler);
    }

    /// Remove a node from the routing table
    pub fn unregister(&self, location: &SocketAddr) {
        self.routes.remove(location);
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether any node is registered
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl PeerTransport for InProcNet {
    fn send(&self, to: SocketAddr, msg: PeerMessage) {
        // Clone the handler out so the routing shard is not held during
        // delivery (handlers may send replies through this same router).
        let handler = self.routes.get(&to).map(|entry| entry.value().clone());
        match handler {
            Some(handler) => handler.handle(msg),
            None => debug!("no node registered at {}, dropping message", to),
        }
    }
}
