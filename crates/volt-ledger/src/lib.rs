//! # volt-ledger
//!
//! The ledger boundary of the volt payment-channel node.
//!
//! The node never talks to a chain directly; it consumes the
//! [`LedgerClient`] capability, which covers channel deployment, status
//! and balance queries, and the close/appeal/withdraw transactions. A
//! deterministic in-memory implementation, [`SimLedger`], provides the
//! contract semantics for tests and local development.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
pub mod sim;

pub use client::{ChannelStatus, LedgerClient, LedgerError, LedgerResult};
pub use sim::{SimLedger, SimLedgerClient};
