//! Transport capability traits

use std::net::SocketAddr;

use crate::message::PeerMessage;

/// One-way, best-effort delivery of peer messages.
///
/// `send` is fire-and-forget: there is no delivery guarantee and no
/// response channel, so failures are logged rather than surfaced.
/// Implementations may deliver synchronously in the caller's thread;
/// callers therefore must not hold per-channel guards across a send.
pub trait PeerTransport: Send + Sync {
    /// Send a message to the node at `to`
    fn send(&self, to: SocketAddr, msg: PeerMessage);
}

/// Recipient side of the transport: routes inbound messages into a node.
///
/// Implementations must treat every message as untrusted input: a
/// malformed or adversarial message is dropped internally, never raised.
pub trait MessageHandler: Send + Sync {
    /// Handle one inbound message
    fn handle(&self, msg: PeerMessage);
}
