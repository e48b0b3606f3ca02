//! # volt-net
//!
//! Peer transport for volt channel messages.
//!
//! Delivery is one-way and best-effort: a node fires a message at a peer's
//! network location and never learns whether it arrived. Acknowledgments
//! are themselves separate messages, not replies. Three message kinds
//! exist (channel notification, funds transfer, transfer acknowledgment),
//! framed as `[length][kind][json payload]` on the wire.
//!
//! [`InProcNet`] routes messages between nodes in the same process (the
//! form every test uses); [`NetService`]/[`TcpTransport`] carry the same
//! frames over TCP.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod codec;
mod error;
mod inproc;
mod message;
mod tcp;
mod transport;

pub use codec::{Frame, MAX_FRAME_SIZE};
pub use error::{NetError, NetResult};
pub use inproc::InProcNet;
pub use message::{MsgKind, NotifyChannelMsg, PeerMessage};
pub use tcp::{NetService, TcpTransport};
pub use transport::{MessageHandler, PeerTransport};
