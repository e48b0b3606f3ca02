//! # volt-node
//!
//! The channel state machine at the heart of a volt node.
//!
//! A [`LightningNode`] owns a collection of channel records and is the
//! sole authority over them. Local operations (establish, send, close,
//! appeal, withdraw) surface typed [`NodeError`]s to the caller; inbound
//! peer messages go through validating handlers that silently drop
//! anything invalid: an untrusted peer must never be able to raise an
//! error inside this node, let alone desynchronize it.
//!
//! Each record is guarded by its own lock: traffic on unrelated channels
//! never serializes, while a local close racing an inbound acknowledgment
//! on the same channel cannot break serial-number monotonicity.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod channel;
mod config;
mod error;
mod node;

pub use channel::{ChannelPhase, ChannelRecord};
pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use node::LightningNode;
